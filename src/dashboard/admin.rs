use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::AppResult;
use crate::gateway::{ApiRequest, FormData, HttpGateway};
use crate::models::{DashboardData, ManagedUser, ServiceCategory, ServiceOffering};

use super::list_from;

/// New or edited catalogue entry, submitted as multipart.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDraft {
    pub name: String,
    pub description: String,
    pub base_price: f64,
    pub time_required: u32,
    pub category_id: i64,
    pub image: Option<(String, Vec<u8>)>,
}

impl ServiceDraft {
    fn to_form(&self) -> FormData {
        let mut form = FormData::new()
            .text("name", &self.name)
            .text("description", &self.description)
            .text("base_price", self.base_price)
            .text("time_required", self.time_required)
            .text("category_id", self.category_id);
        if let Some((file_name, bytes)) = &self.image {
            form = form.file("image", file_name.clone(), bytes.clone(), None);
        }
        form
    }
}

/// Backend caps `per_page` at this value.
pub const MAX_USERS_PER_PAGE: u32 = 100;

/// Paging and search for the admin user list. `q` matches name or email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub page: u32,
    pub per_page: u32,
    pub q: Option<String>,
}

impl Default for UserQuery {
    fn default() -> Self { Self { page: 1, per_page: 10, q: None } }
}

impl UserQuery {
    pub fn search(q: impl Into<String>) -> Self { Self { q: Some(q.into()), ..Self::default() } }

    fn to_request(&self) -> ApiRequest {
        let mut req = ApiRequest::get("/api/admin/users")
            .query("page", self.page.max(1))
            .query("per_page", self.per_page.clamp(1, MAX_USERS_PER_PAGE));
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            req = req.query("q", q);
        }
        req
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<ManagedUser>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub search_query: String,
}

#[derive(Debug, Clone, Default)]
pub struct ServicesState {
    pub list: Vec<ServiceOffering>,
    pub categories: Vec<ServiceCategory>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct AdminState {
    services: ServicesState,
    dashboard: DashboardData,
    users: UserPage,
}

pub struct AdminDashboard {
    gateway: Arc<HttpGateway>,
    state: RwLock<AdminState>,
}

impl AdminDashboard {
    pub fn new(gateway: Arc<HttpGateway>) -> Self { Self { gateway, state: RwLock::new(AdminState::default()) } }

    pub fn services(&self) -> ServicesState { self.state.read().services.clone() }
    pub fn dashboard(&self) -> DashboardData { self.state.read().dashboard.clone() }
    pub fn users(&self) -> Vec<ManagedUser> { self.state.read().users.users.clone() }
    pub fn user_page(&self) -> UserPage { self.state.read().users.clone() }

    pub async fn fetch_services(&self) -> AppResult<Vec<ServiceOffering>> {
        self.state.write().services.is_loading = true;
        let result = self.gateway.send_json::<Vec<ServiceOffering>>(ApiRequest::get("/api/services")).await;
        let mut st = self.state.write();
        st.services.is_loading = false;
        match result {
            Ok(list) => {
                st.services.list = list.clone();
                st.services.error = None;
                Ok(list)
            }
            Err(e) => {
                st.services.error = Some(e.message().to_string());
                Err(e)
            }
        }
    }

    pub async fn fetch_categories(&self) -> AppResult<Vec<ServiceCategory>> {
        let categories: Vec<ServiceCategory> = self.gateway.send_json(ApiRequest::get("/api/services/categories")).await?;
        self.state.write().services.categories = categories.clone();
        Ok(categories)
    }

    /// Create (`service_id == None`) or update a service, then reload the list.
    pub async fn upsert_service(&self, draft: &ServiceDraft, service_id: Option<i64>) -> AppResult<ServiceOffering> {
        let req = match service_id {
            Some(id) => ApiRequest::put("/api/services").query("service_id", id),
            None => ApiRequest::post("/api/services"),
        };
        let saved: ServiceOffering = self.gateway.send_json(req.form(draft.to_form())).await.inspect_err(|e| {
            error!(target: "dashboard", "error upserting service: {}", e);
        })?;
        info!(target: "dashboard", service_id = saved.id, updated = service_id.is_some(), "service saved");
        self.fetch_services().await?;
        Ok(saved)
    }

    pub async fn delete_service(&self, service_id: i64) -> AppResult<()> {
        self.gateway.send(ApiRequest::delete(format!("/api/services/{}", service_id))).await?;
        self.fetch_services().await?;
        Ok(())
    }

    pub async fn fetch_dashboard(&self) -> AppResult<DashboardData> {
        let data: DashboardData = self.gateway.send_json(ApiRequest::get("/api/admin/dashboard")).await?;
        self.state.write().dashboard = data.clone();
        Ok(data)
    }

    /// One page of users. A bare array body is read as a single unpaged page.
    pub async fn fetch_users(&self, query: &UserQuery) -> AppResult<UserPage> {
        let body: Value = self.gateway.send_json(query.to_request()).await?;
        let page = match body {
            Value::Object(_) => serde_json::from_value::<UserPage>(body)?,
            other => {
                let users: Vec<ManagedUser> = list_from(other, "users")?;
                UserPage { total: users.len() as u64, pages: 1, current_page: 1, per_page: users.len() as u32, users, ..Default::default() }
            }
        };
        info!(target: "dashboard", total = page.total, page = page.current_page, "users loaded");
        self.state.write().users = page.clone();
        Ok(page)
    }

    /// Approve a pending professional.
    pub async fn verify_professional(&self, user_id: i64) -> AppResult<String> {
        let resp = self.gateway.send(ApiRequest::patch("/api/admin/verification").json(json!({ "user_id": user_id }))).await?;
        if let Some(u) = self.state.write().users.users.iter_mut().find(|u| u.id == user_id) {
            u.is_approved = Some(true);
        }
        Ok(resp.message().unwrap_or_else(|| format!("Professional {} approved", user_id)))
    }
}
