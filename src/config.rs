use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OTP_COOLDOWN_SECS: u64 = 30;

/// Client configuration. Every field has a default so an empty environment still yields
/// a usable config pointing at a local backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_otp_cooldown")]
    pub otp_resend_cooldown_secs: u64,
    /// When set, the session is persisted in this JSON file instead of process memory.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

fn default_timeout() -> u64 { DEFAULT_TIMEOUT_SECS }
fn default_otp_cooldown() -> u64 { DEFAULT_OTP_COOLDOWN_SECS }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            otp_resend_cooldown_secs: DEFAULT_OTP_COOLDOWN_SECS,
            session_file: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// HOMESERV_API_URL, HOMESERV_TIMEOUT_SECS, HOMESERV_OTP_COOLDOWN_SECS, HOMESERV_SESSION_FILE.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let d = Self::default();
        let non_empty = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            base_url: non_empty("HOMESERV_API_URL").unwrap_or(d.base_url),
            timeout_secs: non_empty("HOMESERV_TIMEOUT_SECS").and_then(|v| v.parse().ok()).unwrap_or(d.timeout_secs),
            otp_resend_cooldown_secs: non_empty("HOMESERV_OTP_COOLDOWN_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.otp_resend_cooldown_secs),
            session_file: non_empty("HOMESERV_SESSION_FILE").map(PathBuf::from),
        }
    }

    pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

    pub fn otp_resend_cooldown(&self) -> Duration { Duration::from_secs(self.otp_resend_cooldown_secs) }
}
