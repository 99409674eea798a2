//! Role-scoped dashboard caches, each fed by REST calls through the shared gateway.

pub mod admin;
pub mod professional;
pub mod customer;

pub use admin::{AdminDashboard, ServiceDraft, ServicesState, UserPage, UserQuery, MAX_USERS_PER_PAGE};
pub use professional::{BookingBucket, ProfessionalDashboard, ProfessionalStatus, ServiceAction};
pub use customer::CustomerDashboard;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppResult;

/// Accept either a bare JSON array or an object wrapping the array under `key`.
pub(crate) fn list_from<T: DeserializeOwned>(body: Value, key: &str) -> AppResult<Vec<T>> {
    let arr = match body {
        Value::Array(_) => body,
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => other,
    };
    Ok(serde_json::from_value(arr)?)
}
