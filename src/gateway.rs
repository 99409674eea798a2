//!
//! HTTP gateway
//! ------------
//! Shared `reqwest` client wrapper used by every store. It attaches the bearer credential
//! to outgoing requests and recovers from an expired access token by refreshing once and
//! resubmitting the original request once.
//!
//! Requests are described by [`ApiRequest`] rather than built directly, so the same
//! request (multipart bodies included) can be rebuilt for the retry.

use std::sync::Arc;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};
use crate::identity::SessionStore;
use crate::router::{Location, Navigator};

pub const REFRESH_PATH: &str = "/api/auth/refresh";

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Text(String),
    File { file_name: String, bytes: Vec<u8>, mime: Option<String> },
}

/// Ordered multipart form fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    fields: Vec<(String, FormField)>,
}

impl FormData {
    pub fn new() -> Self { Self::default() }

    pub fn text(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((name.into(), FormField::Text(value.to_string())));
        self
    }

    pub fn file(mut self, name: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>, mime: Option<String>) -> Self {
        self.fields.push((name.into(), FormField::File { file_name: file_name.into(), bytes, mime }));
        self
    }

    pub fn fields(&self) -> &[(String, FormField)] { &self.fields }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(n, f)| match f {
            FormField::Text(v) if n == name => Some(v.as_str()),
            _ => None,
        })
    }

    fn to_multipart(&self) -> AppResult<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, field) in &self.fields {
            form = match field {
                FormField::Text(v) => form.text(name.clone(), v.clone()),
                FormField::File { file_name, bytes, mime } => {
                    let mut part = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(m) = mime {
                        part = part.mime_str(m)?;
                    }
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(FormData),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: RequestBody::Empty, bearer: None }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::GET, path) }
    pub fn post(path: impl Into<String>) -> Self { Self::new(Method::POST, path) }
    pub fn put(path: impl Into<String>) -> Self { Self::new(Method::PUT, path) }
    pub fn patch(path: impl Into<String>) -> Self { Self::new(Method::PATCH, path) }
    pub fn delete(path: impl Into<String>) -> Self { Self::new(Method::DELETE, path) }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, form: FormData) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    /// Use an explicit bearer instead of the session's access token.
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn is_refresh(&self) -> bool { self.path.split('?').next() == Some(REFRESH_PATH) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    /// The backend's human-readable `message` (or `msg`) field, if any.
    pub fn message(&self) -> Option<String> {
        ["message", "msg", "error"]
            .iter()
            .find_map(|k| self.body.get(*k).and_then(|v| v.as_str()))
            .map(str::to_string)
            .or_else(|| self.body.as_str().filter(|s| !s.is_empty()).map(str::to_string))
    }

    pub fn into_result(self) -> AppResult<ApiResponse> {
        if self.is_success() {
            Ok(self)
        } else {
            let msg = self.message();
            Err(AppError::from_status(self.status, msg))
        }
    }

    pub fn json<T: DeserializeOwned>(self) -> AppResult<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

pub struct HttpGateway {
    base: Url,
    client: reqwest::Client,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    // Held for the whole refresh so concurrent 401s share one refresh call.
    refresh_lock: AsyncMutex<()>,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>, navigator: Arc<dyn Navigator>) -> AppResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| AppError::validation("invalid_base_url", format!("invalid base URL '{}': {}", config.base_url, e)))?;
        let client = reqwest::Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { base, client, session, navigator, refresh_lock: AsyncMutex::new(()) })
    }

    pub fn base(&self) -> &Url { &self.base }

    pub fn session(&self) -> &Arc<SessionStore> { &self.session }

    /// Send a request, recovering once from a 401 by refreshing the access token.
    /// Non-success responses come back as `Err`.
    pub async fn send(&self, req: ApiRequest) -> AppResult<ApiResponse> {
        let used = self.bearer_for(&req);
        let resp = self.dispatch(&req, used.as_deref()).await?;
        if resp.status != 401 || req.is_refresh() || req.bearer.is_some() {
            return resp.into_result();
        }
        let original = AppError::from_status(resp.status, resp.message());
        if self.session.access_token().is_none() {
            debug!(target: "gateway", path = %req.path, "401 without an access token; nothing to refresh");
            return Err(original);
        }

        // Single retry: the resubmitted request is never refreshed again.
        match self.refresh_after_unauthorized(used.as_deref()).await {
            Ok(token) => {
                debug!(target: "gateway", path = %req.path, "retrying after token refresh");
                self.dispatch(&req, Some(&token)).await?.into_result()
            }
            Err(e) => {
                warn!(target: "gateway", path = %req.path, "token refresh failed ({}); logging out", e);
                self.session.logout();
                self.navigator.redirect(Location::login_prompt());
                Err(original)
            }
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, req: ApiRequest) -> AppResult<T> {
        self.send(req).await?.json()
    }

    /// Exchange the refresh token for a new access token. Any failure clears the session.
    pub async fn refresh_access_token(&self) -> AppResult<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_after_unauthorized(&self, failed_with: Option<&str>) -> AppResult<String> {
        let _guard = self.refresh_lock.lock().await;
        match (self.session.access_token(), failed_with) {
            // Another caller rotated the token while this request was in flight.
            (Some(current), Some(failed)) if current != failed => Ok(current),
            (Some(_), _) => self.refresh_locked().await,
            (None, _) => Err(AppError::unauthorized("session_cleared", "session was cleared during refresh")),
        }
    }

    async fn refresh_locked(&self) -> AppResult<String> {
        let result = self.exchange_refresh_token().await;
        match &result {
            Ok(_) => info!(target: "gateway", "access token refreshed"),
            Err(e) => {
                warn!(target: "gateway", "refresh rejected: {}", e);
                self.session.logout();
            }
        }
        result
    }

    async fn exchange_refresh_token(&self) -> AppResult<String> {
        let refresh = self
            .session
            .refresh_token()
            .ok_or_else(|| AppError::unauthorized("no_refresh_token", "no refresh token available"))?;
        let req = ApiRequest::get(REFRESH_PATH);
        let resp = self.dispatch(&req, Some(&refresh)).await?.into_result()?;
        let token = resp
            .body
            .get("access_token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::server("refresh_missing_token", "refresh response carried no access token"))?;
        self.session.set_access_token(token.clone())?;
        Ok(token)
    }

    fn bearer_for(&self, req: &ApiRequest) -> Option<String> {
        if let Some(b) = &req.bearer {
            return Some(b.clone());
        }
        if req.is_refresh() {
            return None;
        }
        self.session.access_token()
    }

    async fn dispatch(&self, req: &ApiRequest, bearer: Option<&str>) -> AppResult<ApiResponse> {
        let url = self
            .base
            .join(&req.path)
            .map_err(|e| AppError::validation("invalid_path", format!("invalid request path '{}': {}", req.path, e)))?;
        let mut builder = self.client.request(req.method.clone(), url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            builder = builder.bearer_auth(token);
        }
        builder = match &req.body {
            RequestBody::Empty => builder,
            RequestBody::Json(v) => builder.json(v),
            RequestBody::Form(f) => builder.multipart(f.to_multipart()?),
        };
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text))
        };
        debug!(target: "gateway", method = %req.method, path = %req.path, status, "response");
        Ok(ApiResponse { status, body })
    }
}
