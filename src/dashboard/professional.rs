use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::gateway::{ApiRequest, HttpGateway};
use crate::models::{ChartData, DashboardData, DashboardStats};

use super::list_from;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingBucket {
    PendingRequest,
    AcceptedRequest,
    PastRequest,
}

impl BookingBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingBucket::PendingRequest => "pending_request",
            BookingBucket::AcceptedRequest => "accepted_request",
            BookingBucket::PastRequest => "past_request",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAction {
    Accept,
    Reject,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalStatus {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub experience: Option<u32>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub total_services: Option<u64>,
}

// The professional dashboard endpoint returns chart series flat beside the stats.
#[derive(Debug, Default, Deserialize)]
struct FlatDashboard {
    #[serde(default)]
    stats: DashboardStats,
    #[serde(default, alias = "serviceData")]
    service_data: Vec<Value>,
    #[serde(default, alias = "revenueData")]
    revenue_data: Vec<Value>,
    #[serde(default)]
    days: Vec<String>,
}

#[derive(Debug, Default)]
struct ProfessionalState {
    is_approved: bool,
    profile: Option<Value>,
    dashboard: DashboardData,
    bookings: HashMap<BookingBucket, Vec<Value>>,
}

pub struct ProfessionalDashboard {
    gateway: Arc<HttpGateway>,
    state: RwLock<ProfessionalState>,
}

impl ProfessionalDashboard {
    pub fn new(gateway: Arc<HttpGateway>) -> Self { Self { gateway, state: RwLock::new(ProfessionalState::default()) } }

    pub fn is_approved(&self) -> bool { self.state.read().is_approved }
    pub fn profile(&self) -> Option<Value> { self.state.read().profile.clone() }
    pub fn dashboard(&self) -> DashboardData { self.state.read().dashboard.clone() }

    pub fn bookings(&self, bucket: BookingBucket) -> Vec<Value> {
        self.state.read().bookings.get(&bucket).cloned().unwrap_or_default()
    }

    /// Approval flag. Any failure (no profile yet, network) reads as "not approved".
    pub async fn fetch_status(&self) -> bool {
        match self.gateway.send_json::<ProfessionalStatus>(ApiRequest::get("/api/professionals/status")).await {
            Ok(status) => {
                self.state.write().is_approved = status.is_approved;
                status.is_approved
            }
            Err(e) => {
                warn!(target: "dashboard", "error checking professional status: {}", e);
                false
            }
        }
    }

    pub async fn fetch_profile(&self) -> AppResult<Value> {
        let profile: Value = self.gateway.send_json(ApiRequest::get("/api/professionals/profile")).await?;
        self.state.write().profile = Some(profile.clone());
        Ok(profile)
    }

    pub async fn fetch_dashboard(&self) -> AppResult<DashboardData> {
        let flat: FlatDashboard = self.gateway.send_json(ApiRequest::get("/api/professionals/dashboard")).await?;
        let data = DashboardData {
            stats: flat.stats,
            chart_data: ChartData { service_data: flat.service_data, revenue_data: flat.revenue_data, days: flat.days },
        };
        self.state.write().dashboard = data.clone();
        Ok(data)
    }

    pub async fn fetch_bookings(&self, bucket: BookingBucket) -> AppResult<Vec<Value>> {
        let body: Value = self
            .gateway
            .send_json(ApiRequest::get("/api/professionals/bookings").query("type", bucket.as_str()))
            .await?;
        let list: Vec<Value> = list_from(body, bucket.as_str())?;
        debug!(target: "dashboard", bucket = bucket.as_str(), count = list.len(), "bookings fetched");
        self.state.write().bookings.insert(bucket, list.clone());
        Ok(list)
    }

    pub async fn service_action(&self, service_request_id: i64, action: ServiceAction) -> AppResult<String> {
        let req = ApiRequest::post("/api/professionals/service_actions")
            .json(json!({ "service_request_id": service_request_id, "action": action }));
        let resp = self.gateway.send(req).await?;
        Ok(resp.message().unwrap_or_default())
    }
}
