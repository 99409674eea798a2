//! Unified client error model and mapping helpers.
//! Every store, the gateway and the route guard report failures through `AppError`,
//! so callers (CLI, UI shells) can render a human-readable message and branch on the kind.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    Validation { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    NotFound { code: String, message: String },
    Server { code: String, message: String },
    Transport { code: String, message: String },
    Storage { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Server { code, .. }
            | AppError::Transport { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Server { message, .. }
            | AppError::Transport { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn unauthorized<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Unauthorized { code: code.into(), message: msg.into() } }
    pub fn forbidden<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn not_found<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn server<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Server { code: code.into(), message: msg.into() } }
    pub fn transport<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Transport { code: code.into(), message: msg.into() } }
    pub fn storage<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn internal<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Classify a non-success HTTP response. `message` is the backend's `message` field when present.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let code = format!("http_{}", status);
        let msg = message.unwrap_or_else(|| format!("request failed with HTTP {}", status));
        match status {
            400 | 422 => AppError::Validation { code, message: msg },
            401 => AppError::Unauthorized { code, message: msg },
            403 => AppError::Forbidden { code, message: msg },
            404 => AppError::NotFound { code, message: msg },
            _ => AppError::Server { code, message: msg },
        }
    }

    /// Map back to the HTTP status code this error corresponds to.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::Unauthorized { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Server { .. } => 500,
            AppError::Transport { .. } => 503,
            AppError::Storage { .. } => 507,
            AppError::Internal { .. } => 500,
        }
    }

    pub fn is_unauthorized(&self) -> bool { matches!(self, AppError::Unauthorized { .. }) }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return AppError::from_status(status.as_u16(), Some(err.to_string()));
        }
        if err.is_timeout() {
            return AppError::transport("timeout", err.to_string());
        }
        AppError::transport("transport", err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::internal("decode_error", err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::storage("storage_error", err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}
