//!
//! Application context
//! -------------------
//! Wires the stores and services together once, so every component shares the same
//! session, gateway and navigator. Nothing here is global; callers own the context.

use std::sync::Arc;

use tracing::info;

use crate::booking::BookingService;
use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::dashboard::{AdminDashboard, CustomerDashboard, ProfessionalDashboard};
use crate::error::AppResult;
use crate::gateway::HttpGateway;
use crate::identity::{AuthService, SessionStore};
use crate::router::{RedirectQueue, RouteGuard, RouteTable, Router};
use crate::storage::{FileStorage, MemoryStorage, SharedStorage};

pub struct AppContext {
    pub config: ClientConfig,
    pub storage: SharedStorage,
    pub session: Arc<SessionStore>,
    pub navigator: Arc<RedirectQueue>,
    pub gateway: Arc<HttpGateway>,
    pub auth: Arc<AuthService>,
    pub cart: Arc<CartStore>,
    pub bookings: BookingService,
    pub router: Router,
    pub admin: AdminDashboard,
    pub professional: ProfessionalDashboard,
    pub customer: CustomerDashboard,
}

impl AppContext {
    pub fn new(config: ClientConfig, storage: SharedStorage) -> AppResult<Self> {
        let session = Arc::new(SessionStore::open(storage.clone()));
        let cart = Arc::new(CartStore::open(storage.clone()));
        {
            let cart = cart.clone();
            session.on_logout(move || cart.clear());
        }
        let navigator = Arc::new(RedirectQueue::new());
        let gateway = Arc::new(HttpGateway::new(&config, session.clone(), navigator.clone())?);
        let auth = Arc::new(AuthService::new(gateway.clone(), session.clone(), config.otp_resend_cooldown()));
        let router = Router::new(RouteGuard::new(RouteTable::default(), session.clone(), auth.clone()));
        info!(target: "context", base_url = %config.base_url, rehydrating = session.has_pending(), "application context ready");
        Ok(Self {
            bookings: BookingService::new(gateway.clone(), cart.clone()),
            admin: AdminDashboard::new(gateway.clone()),
            professional: ProfessionalDashboard::new(gateway.clone()),
            customer: CustomerDashboard::new(gateway.clone()),
            config,
            storage,
            session,
            navigator,
            gateway,
            auth,
            cart,
            router,
        })
    }

    /// Build a context whose durable storage is the configured session file, or memory when unset.
    pub fn from_config(config: ClientConfig) -> AppResult<Self> {
        let storage: SharedStorage = match &config.session_file {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => MemoryStorage::shared(),
        };
        Self::new(config, storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceOffering;

    #[test]
    fn logout_empties_the_cart() {
        let ctx = AppContext::new(ClientConfig::default(), MemoryStorage::shared()).unwrap();
        ctx.cart.add_item(&ServiceOffering { id: 1, name: "Painting".into(), base_price: 500.0, ..Default::default() });
        assert!(!ctx.cart.is_empty());
        ctx.session.logout();
        assert!(ctx.cart.is_empty());
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let err = AppContext::new(ClientConfig::with_base_url("not a url"), MemoryStorage::shared()).err().unwrap();
        assert_eq!(err.code_str(), "invalid_base_url");
    }
}
