#![allow(dead_code)]

//! In-process mock of the home-services REST backend, served by axum on an ephemeral port.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use homeserv::config::ClientConfig;
use homeserv::storage::{MemoryStorage, SharedStorage};
use homeserv::AppContext;

pub const PASSWORD: &str = "x";
pub const OTP_CODE: &str = "123456";
pub const REFRESH_TOKEN: &str = "refresh-1";

type Reply = (StatusCode, Json<Value>);
type Shared = State<Arc<MockState>>;

#[derive(Default)]
pub struct MockState {
    valid_access: Mutex<String>,
    current_user: Mutex<Value>,
    tokens: AtomicUsize,
    refresh_ok: AtomicBool,
    reject_access: AtomicBool,
    hits: Mutex<HashMap<String, usize>>,
    forms: Mutex<HashMap<String, Vec<(String, String)>>>,
    bodies: Mutex<HashMap<String, Value>>,
    refresh_auth: Mutex<Vec<String>>,
}

impl MockState {
    fn hit(&self, key: &str) { *self.hits.lock().entry(key.to_string()).or_default() += 1; }

    pub fn hits(&self, key: &str) -> usize { self.hits.lock().get(key).copied().unwrap_or(0) }

    pub fn form(&self, key: &str) -> Vec<(String, String)> { self.forms.lock().get(key).cloned().unwrap_or_default() }

    pub fn form_value(&self, key: &str, field: &str) -> Option<String> {
        self.form(key).into_iter().find(|(n, _)| n == field).map(|(_, v)| v)
    }

    pub fn body(&self, key: &str) -> Option<Value> { self.bodies.lock().get(key).cloned() }

    /// Bearer values the refresh endpoint was called with.
    pub fn refresh_auth_headers(&self) -> Vec<String> { self.refresh_auth.lock().clone() }

    /// Invalidate whatever access token the client currently holds.
    pub fn expire_access_token(&self) { *self.valid_access.lock() = "expired-elsewhere".to_string(); }

    pub fn set_refresh_ok(&self, ok: bool) { self.refresh_ok.store(ok, Ordering::SeqCst); }

    /// Reject every access token, including ones minted by a later refresh.
    pub fn set_reject_access(&self, reject: bool) { self.reject_access.store(reject, Ordering::SeqCst); }

    fn issue_token(&self) -> String {
        let token = format!("access-{}", self.tokens.fetch_add(1, Ordering::SeqCst) + 1);
        *self.valid_access.lock() = token.clone();
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if self.reject_access.load(Ordering::SeqCst) {
            return false;
        }
        let expected = format!("Bearer {}", self.valid_access.lock());
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(expected.as_str())
    }

    fn role(&self) -> String { self.current_user.lock()["role"].as_str().unwrap_or("user").to_string() }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> MockBackend {
        let state = Arc::new(MockState::default());
        state.set_refresh_ok(true);
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/google-login", post(google_login))
            .route("/api/auth/refresh", get(refresh))
            .route("/api/auth/profile", get(profile))
            .route("/api/auth/verify-otp", post(verify_otp))
            .route("/api/auth/resend-otp", post(resend_otp))
            .route("/api/auth/reset-password", post(reset_password))
            .route("/api/professionals/signup", post(professional_signup))
            .route("/api/professionals/status", get(professional_status))
            .route("/api/professionals/profile", get(professional_profile))
            .route("/api/professionals/dashboard", get(professional_dashboard))
            .route("/api/professionals/bookings", get(professional_bookings))
            .route("/api/professionals/service_actions", post(service_actions))
            .route("/api/bookings/create_booking", post(create_booking))
            .route("/api/bookings/check-serviceability", get(check_serviceability))
            .route("/api/bookings/get_bookings", get(get_bookings))
            .route("/api/bookings/submit_review", post(submit_review))
            .route("/api/services", get(list_services).post(create_service).put(update_service))
            .route("/api/services/categories", get(categories))
            .route("/api/services/{id}", axum::routing::delete(delete_service))
            .route("/api/admin/dashboard", get(admin_dashboard))
            .route("/api/admin/users", get(admin_users))
            .route("/api/admin/verification", patch(verify_professional))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("mock backend error: {e:?}");
            }
        });
        MockBackend { base_url: format!("http://{}", addr), state }
    }

    pub fn config(&self) -> ClientConfig { ClientConfig::with_base_url(self.base_url.clone()) }

    pub fn context(&self) -> AppContext { self.context_with(MemoryStorage::shared()) }

    pub fn context_with(&self, storage: SharedStorage) -> AppContext {
        AppContext::new(self.config(), storage).expect("build context")
    }
}

fn ok(body: Value) -> Reply { (StatusCode::OK, Json(body)) }

fn unauthorized() -> Reply { (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Token has expired" }))) }

fn user_for(email: &str) -> Value {
    let role = if email.starts_with("admin") {
        "admin"
    } else if email.starts_with("pro") {
        "professional"
    } else {
        "user"
    };
    json!({ "id": 7, "email": email, "name": "Test User", "role": role, "is_email_verified": false })
}

async fn read_form(mut multipart: Multipart) -> Vec<(String, String)> {
    let mut out = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap_or_default();
        let value = match file_name {
            Some(f) => format!("file:{}:{}", f, bytes.len()),
            None => String::from_utf8_lossy(&bytes).to_string(),
        };
        out.push((name, value));
    }
    out
}

async fn login(State(s): Shared, Json(body): Json<Value>) -> Reply {
    s.hit("login");
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if body["password"].as_str() != Some(PASSWORD) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" })));
    }
    *s.current_user.lock() = user_for(&email);
    if email.starts_with("notoken") {
        return ok(json!({ "message": "Login successful" }));
    }
    let access = s.issue_token();
    ok(json!({ "access_token": access, "refresh_token": REFRESH_TOKEN, "user": user_for(&email) }))
}

async fn register(State(s): Shared, Json(body): Json<Value>) -> Reply {
    s.hit("register");
    let email = body["email"].as_str().unwrap_or_default().to_string();
    *s.current_user.lock() = user_for(&email);
    let access = s.issue_token();
    (StatusCode::CREATED, Json(json!({ "access_token": access, "refresh_token": REFRESH_TOKEN, "message": "Registered" })))
}

async fn google_login(State(s): Shared, Json(body): Json<Value>) -> Reply {
    s.hit("google_login");
    if body["credential"].as_str().unwrap_or_default().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Missing credential" })));
    }
    *s.current_user.lock() = user_for("google@example.test");
    let access = s.issue_token();
    ok(json!({ "access_token": access, "refresh_token": REFRESH_TOKEN, "user": user_for("google@example.test") }))
}

async fn refresh(State(s): Shared, headers: HeaderMap) -> Reply {
    s.hit("refresh");
    let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    s.refresh_auth.lock().push(auth.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;
    if !s.refresh_ok.load(Ordering::SeqCst) || auth != format!("Bearer {}", REFRESH_TOKEN) {
        return unauthorized();
    }
    ok(json!({ "access_token": s.issue_token() }))
}

async fn profile(State(s): Shared, headers: HeaderMap) -> Reply {
    s.hit("profile");
    if !s.authorized(&headers) {
        return unauthorized();
    }
    let user = s.current_user.lock().clone();
    ok(json!({ "user": user }))
}

async fn verify_otp(State(s): Shared, Json(body): Json<Value>) -> Reply {
    s.hit("verify_otp");
    s.bodies.lock().insert("verify_otp".into(), body.clone());
    if body["otp"].as_str() != Some(OTP_CODE) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid OTP" })));
    }
    if body["purpose"].as_str() == Some("email_verification") {
        s.current_user.lock()["is_email_verified"] = json!(true);
    }
    ok(json!({ "message": "OTP verified" }))
}

async fn resend_otp(State(s): Shared, Json(body): Json<Value>) -> Reply {
    s.hit("resend_otp");
    s.bodies.lock().insert("resend_otp".into(), body);
    ok(json!({ "message": "OTP sent" }))
}

async fn reset_password(State(s): Shared, Json(body): Json<Value>) -> Reply {
    s.hit("reset_password");
    s.bodies.lock().insert("reset_password".into(), body);
    ok(json!({ "message": "Password reset successful" }))
}

async fn professional_signup(State(s): Shared, headers: HeaderMap, multipart: Multipart) -> Reply {
    s.hit("professional_signup");
    if !s.authorized(&headers) {
        return unauthorized();
    }
    if s.current_user.lock()["is_email_verified"].as_bool() != Some(true) {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "Please verify your email first" })));
    }
    let fields = read_form(multipart).await;
    let field = |name: &str| fields.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone());
    let resume = field("resume");
    let category = field("serviceCategory");
    s.forms.lock().insert("professional_signup".into(), fields.clone());
    if !resume.is_some_and(|r| r.starts_with("file:")) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Resume file is required" })));
    }
    if !matches!(category.as_deref(), Some("1") | Some("2")) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid service category" })));
    }
    s.current_user.lock()["role"] = json!("professional");
    (StatusCode::CREATED, Json(json!({ "message": "Professional profile created successfully" })))
}

async fn professional_status(State(s): Shared, headers: HeaderMap) -> Reply {
    s.hit("professional_status");
    if !s.authorized(&headers) {
        return unauthorized();
    }
    if s.role() != "professional" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Professional profile not found" })));
    }
    ok(json!({ "id": 3, "is_approved": true, "category": "Repairs", "experience": 5 }))
}

async fn professional_profile(State(s): Shared, headers: HeaderMap) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    ok(json!({ "id": 3, "category": "Repairs", "experience": 5, "rating": 4.5 }))
}

async fn professional_dashboard(State(s): Shared, headers: HeaderMap) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    ok(json!({
        "stats": { "totalRequests": 12, "activeServices": 2, "completionRate": 0.75 },
        "serviceData": [3, 4],
        "revenueData": [300.0, 450.0],
        "days": ["Mon", "Tue"]
    }))
}

async fn professional_bookings(State(s): Shared, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    let bucket = q.get("type").cloned().unwrap_or_default();
    let rows = match bucket.as_str() {
        "pending_request" => json!([{ "id": 1, "status": "requested" }, { "id": 2, "status": "requested" }]),
        "accepted_request" => json!([{ "id": 3, "status": "accepted" }]),
        _ => json!([]),
    };
    let mut body = serde_json::Map::new();
    body.insert(bucket, rows);
    ok(Value::Object(body))
}

async fn service_actions(State(s): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    s.hit("service_actions");
    s.bodies.lock().insert("service_actions".into(), body);
    ok(json!({ "message": "Service request updated" }))
}

async fn create_booking(State(s): Shared, headers: HeaderMap, multipart: Multipart) -> Reply {
    s.hit("create_booking");
    if !s.authorized(&headers) {
        return unauthorized();
    }
    let fields = read_form(multipart).await;
    let count = fields.iter().filter(|(n, _)| n.ends_with("[service_id]")).count();
    let ids: Vec<i64> = (0..count as i64).map(|i| 101 + i).collect();
    s.forms.lock().insert("create_booking".into(), fields);
    (StatusCode::CREATED, Json(json!({ "message": "Booking created", "booking_ids": ids })))
}

/// Pincode 411001 is covered for services 1 and 2; everything else is refused.
async fn check_serviceability(State(s): Shared, Query(q): Query<HashMap<String, String>>) -> Reply {
    s.hit("check_serviceability");
    s.bodies.lock().insert("check_serviceability".into(), json!(q));
    let pincode = q.get("pincode").cloned().unwrap_or_default();
    let ids: Vec<i64> = q.get("serviceIds").map(|v| v.split(',').filter_map(|id| id.trim().parse().ok()).collect()).unwrap_or_default();
    if pincode.is_empty() || ids.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "serviceable": false, "message": "Invalid pincode or services" })));
    }
    for id in &ids {
        if pincode != "411001" || !(1..=2).contains(id) {
            let message = format!("No professionals available for service {} in pincode {}", id, pincode);
            return (StatusCode::BAD_REQUEST, Json(json!({ "serviceable": false, "message": message })));
        }
    }
    ok(json!({ "serviceable": true, "serviceable_services": ids, "message": "Services are available in this area" }))
}

async fn get_bookings(State(s): Shared, headers: HeaderMap) -> Reply {
    s.hit("get_bookings");
    if !s.authorized(&headers) {
        return unauthorized();
    }
    ok(json!([
        { "id": 1, "status": "requested", "service": { "id": 1, "name": "Plumbing", "base_price": 300.0 } },
        { "id": 2, "status": "accepted" },
        { "id": 3, "status": "completed", "review_details": { "rating": 4, "review": "Tidy work" } },
        { "id": 4, "status": "canceled by customer" }
    ]))
}

async fn submit_review(State(s): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    s.hit("submit_review");
    if !s.authorized(&headers) {
        return unauthorized();
    }
    s.bodies.lock().insert("submit_review".into(), body);
    ok(json!({ "message": "Review submitted" }))
}

async fn list_services(State(s): Shared) -> Reply {
    s.hit("services");
    ok(json!([
        { "id": 1, "name": "Plumbing", "description": "Pipes and taps", "base_price": 300.0, "time_required": 2, "category": "Repairs" },
        { "id": 2, "name": "Cleaning", "price": 150.0 }
    ]))
}

async fn create_service(State(s): Shared, headers: HeaderMap, multipart: Multipart) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    s.hit("create_service");
    let fields = read_form(multipart).await;
    let name = fields.iter().find(|(n, _)| n == "name").map(|(_, v)| v.clone()).unwrap_or_default();
    s.forms.lock().insert("create_service".into(), fields);
    (StatusCode::CREATED, Json(json!({ "id": 3, "name": name, "base_price": 99.0 })))
}

async fn update_service(State(s): Shared, headers: HeaderMap, Query(q): Query<HashMap<String, String>>, multipart: Multipart) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    s.hit("update_service");
    let id: i64 = q.get("service_id").and_then(|v| v.parse().ok()).unwrap_or_default();
    let fields = read_form(multipart).await;
    s.forms.lock().insert("update_service".into(), fields);
    ok(json!({ "id": id, "name": "Updated", "base_price": 120.0 }))
}

async fn delete_service(State(s): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    s.hit("delete_service");
    s.bodies.lock().insert("delete_service".into(), json!(id));
    ok(json!({ "message": "Service deleted" }))
}

async fn categories(State(s): Shared) -> Reply {
    s.hit("categories");
    ok(json!([{ "id": 1, "name": "Repairs" }, { "id": 2, "name": "Cleaning" }]))
}

async fn admin_dashboard(State(s): Shared, headers: HeaderMap) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    ok(json!({
        "stats": { "totalRequests": 10, "activeServices": 3, "completionRate": 0.8 },
        "chartData": { "serviceData": [1, 2], "revenueData": [10.0, 20.0], "days": ["Mon", "Tue"] }
    }))
}

fn directory() -> Vec<Value> {
    let mut users = vec![
        json!({ "id": 7, "email": "pro@example.test", "name": "Ravi Kumar", "role": "professional", "is_approved": false }),
        json!({ "id": 8, "email": "jo@example.test", "name": "Jo Park", "role": "user" }),
    ];
    users.extend((9..=30).map(|id| json!({ "id": id, "email": format!("user{}@example.test", id), "name": format!("User {}", id), "role": "user" })));
    users
}

async fn admin_users(State(s): Shared, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    s.hit("admin_users");
    s.bodies.lock().insert("admin_users".into(), json!(q));
    let page: usize = q.get("page").and_then(|v| v.parse().ok()).unwrap_or(1).max(1);
    let per_page: usize = q.get("per_page").and_then(|v| v.parse().ok()).unwrap_or(10).min(100);
    let search = q.get("q").cloned().unwrap_or_default();
    let needle = search.to_lowercase();
    let matching: Vec<Value> = directory()
        .into_iter()
        .filter(|u| {
            needle.is_empty()
                || ["name", "email"].iter().any(|k| u[*k].as_str().unwrap_or_default().to_lowercase().contains(&needle))
        })
        .collect();
    let total = matching.len();
    let pages = if per_page == 0 { 0 } else { total.div_ceil(per_page) };
    let users: Vec<Value> = matching.into_iter().skip((page - 1) * per_page).take(per_page).collect();
    ok(json!({
        "users": users,
        "total": total,
        "pages": pages,
        "current_page": page,
        "per_page": per_page,
        "search_query": search
    }))
}

async fn verify_professional(State(s): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    if !s.authorized(&headers) {
        return unauthorized();
    }
    s.hit("verify_professional");
    s.bodies.lock().insert("verify_professional".into(), body.clone());
    if body["user_id"].as_i64().is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "User ID is required" })));
    }
    ok(json!({ "message": "Professional verified" }))
}
