use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::gateway::{ApiRequest, FormData, HttpGateway};
use crate::models::ServiceAddress;

use super::principal::UserProfile;
use super::session::SessionStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Credential handed over by the third-party OAuth widget; passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleLoginRequest {
    pub credential: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Body returned by every session-establishing endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

const RESUME_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl ResumeUpload {
    fn validate(&self) -> AppResult<()> {
        let ext = self.file_name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
        match ext {
            Some(e) if RESUME_EXTENSIONS.contains(&e.as_str()) => Ok(()),
            _ => Err(AppError::validation("invalid_resume_type", "resume must be a PDF, DOC or DOCX file")),
        }
    }
}

/// Application to become a professional. The backend reads camelCase and dotted field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessionalSignup {
    pub full_name: String,
    pub phone_number: String,
    pub service_category_id: i64,
    pub experience_years: u32,
    pub address: ServiceAddress,
    pub resume: ResumeUpload,
}

impl ProfessionalSignup {
    pub fn to_form(&self) -> FormData {
        FormData::new()
            .text("fullName", &self.full_name)
            .text("phoneNumber", &self.phone_number)
            .text("serviceCategory", self.service_category_id)
            .text("yearsOfExperience", self.experience_years)
            .text("address.locality", &self.address.locality)
            .text("address.city", &self.address.city)
            .text("address.state", &self.address.state)
            .text("address.pincode", &self.address.pincode)
            .file("resume", self.resume.file_name.clone(), self.resume.bytes.clone(), self.resume.mime.clone())
    }
}

#[derive(Debug, Default)]
struct OtpState {
    last_sent: HashMap<(String, OtpPurpose), Instant>,
    reset_verified: HashSet<String>,
}

/// Session-establishing and account operations. Owns no session state itself; it drives
/// the `SessionStore` through the gateway's responses.
pub struct AuthService {
    gateway: Arc<HttpGateway>,
    session: Arc<SessionStore>,
    otp: Mutex<OtpState>,
    resend_cooldown: Duration,
}

impl AuthService {
    pub fn new(gateway: Arc<HttpGateway>, session: Arc<SessionStore>, resend_cooldown: Duration) -> Self {
        Self { gateway, session, otp: Mutex::new(OtpState::default()), resend_cooldown }
    }

    pub fn session(&self) -> &Arc<SessionStore> { &self.session }

    pub async fn login(&self, credentials: &LoginRequest) -> AppResult<UserProfile> {
        let req = ApiRequest::post("/api/auth/login").json(serde_json::to_value(credentials)?);
        self.establish("login", req).await
    }

    pub async fn signup(&self, profile: &SignupRequest) -> AppResult<UserProfile> {
        let req = ApiRequest::post("/api/auth/register").json(serde_json::to_value(profile)?);
        self.establish("signup", req).await
    }

    pub async fn google_login(&self, payload: &GoogleLoginRequest) -> AppResult<UserProfile> {
        let req = ApiRequest::post("/api/auth/google-login").json(serde_json::to_value(payload)?);
        self.establish("google_login", req).await
    }

    pub async fn refresh_access_token(&self) -> AppResult<String> {
        self.gateway.refresh_access_token().await
    }

    /// Fetch the current profile and store it. Accepts either a bare profile or `{"user": {...}}`.
    pub async fn fetch_user_profile(&self) -> AppResult<UserProfile> {
        let body: Value = self.gateway.send_json(ApiRequest::get("/api/auth/profile")).await?;
        let profile_value = match body.get("user") {
            Some(u) if u.is_object() => u.clone(),
            _ => body,
        };
        let profile: UserProfile = serde_json::from_value(profile_value)?;
        self.session.set_user(profile.clone())?;
        Ok(profile)
    }

    /// End the session locally. Storage keys for tokens, user and cart are removed.
    pub fn logout(&self) {
        self.session.logout();
        info!(target: "session", "logged out");
    }

    pub async fn verify_otp(&self, email: &str, code: &str, purpose: OtpPurpose) -> AppResult<String> {
        let req = ApiRequest::post("/api/auth/verify-otp").json(json!({ "email": email, "otp": code, "purpose": purpose }));
        let resp = self.gateway.send(req).await?;
        match purpose {
            OtpPurpose::EmailVerification => self.session.mark_email_verified()?,
            OtpPurpose::PasswordReset => {
                self.otp.lock().reset_verified.insert(normalize_email(email));
            }
        }
        Ok(resp.message().unwrap_or_else(|| "OTP verified".to_string()))
    }

    /// The cooldown slot is claimed before the request goes out and released if it fails,
    /// so concurrent callers send at most one code per window.
    pub async fn resend_otp(&self, email: &str, purpose: OtpPurpose) -> AppResult<String> {
        let key = (normalize_email(email), purpose);
        let previous = {
            let mut otp = self.otp.lock();
            if let Some(sent) = otp.last_sent.get(&key) {
                let elapsed = sent.elapsed();
                if elapsed < self.resend_cooldown {
                    let wait = (self.resend_cooldown - elapsed).as_secs().max(1);
                    return Err(AppError::validation("otp_cooldown", format!("please wait {}s before requesting another code", wait)));
                }
            }
            otp.last_sent.insert(key.clone(), Instant::now())
        };
        let req = ApiRequest::post("/api/auth/resend-otp").json(json!({ "email": email, "purpose": purpose }));
        match self.gateway.send(req).await {
            Ok(resp) => Ok(resp.message().unwrap_or_else(|| "OTP sent".to_string())),
            Err(e) => {
                let mut otp = self.otp.lock();
                match previous {
                    Some(at) => otp.last_sent.insert(key, at),
                    None => otp.last_sent.remove(&key),
                };
                Err(e)
            }
        }
    }

    /// Requires a successful `verify_otp(.., PasswordReset)` for the same email first.
    pub async fn reset_password(&self, data: &ResetPasswordRequest) -> AppResult<String> {
        let email = normalize_email(&data.email);
        if !self.otp.lock().reset_verified.contains(&email) {
            return Err(AppError::validation("otp_not_verified", "verify the password-reset code before choosing a new password"));
        }
        let resp = self.gateway.send(ApiRequest::post("/api/auth/reset-password").json(serde_json::to_value(data)?)).await?;
        self.otp.lock().reset_verified.remove(&email);
        Ok(resp.message().unwrap_or_else(|| "Password reset".to_string()))
    }

    pub fn is_reset_password_verified(&self, email: &str) -> bool {
        self.otp.lock().reset_verified.contains(&normalize_email(email))
    }

    /// Submit the professional application, then refetch the profile since the role changes.
    pub async fn register_professional(&self, data: &ProfessionalSignup) -> AppResult<String> {
        if !self.session.is_authenticated() {
            return Err(AppError::unauthorized("not_authenticated", "log in before registering as a professional"));
        }
        data.resume.validate()?;
        let resp = self.gateway.send(ApiRequest::post("/api/professionals/signup").form(data.to_form())).await?;
        let profile = self.fetch_user_profile().await?;
        info!(target: "session", role = %profile.role, "professional registration submitted");
        Ok(resp.message().unwrap_or_else(|| "Professional registration submitted".to_string()))
    }

    // Fail closed: any error leaves no partial session behind. The guest cart survives.
    async fn establish(&self, op: &'static str, req: ApiRequest) -> AppResult<UserProfile> {
        match self.try_establish(req).await {
            Ok(user) => {
                info!(target: "session", op, role = %user.role, "authenticated");
                Ok(user)
            }
            Err(e) => {
                warn!(target: "session", op, "authentication failed: {}", e);
                self.session.clear_auth();
                Err(e)
            }
        }
    }

    async fn try_establish(&self, req: ApiRequest) -> AppResult<UserProfile> {
        let resp: LoginResponse = self.gateway.send_json(req).await?;
        let missing = || AppError::server("missing_tokens", "authentication response did not include a token pair");
        let access = resp.access_token.filter(|t| !t.is_empty()).ok_or_else(missing)?;
        let refresh = resp.refresh_token.filter(|t| !t.is_empty()).ok_or_else(missing)?;
        self.session.establish(access, refresh, resp.user.clone())?;
        match resp.user {
            Some(user) => Ok(user),
            None => self.fetch_user_profile().await,
        }
    }
}

fn normalize_email(email: &str) -> String { email.trim().to_ascii_lowercase() }
