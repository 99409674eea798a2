use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::identity::{landing_route, role_allows, AuthService, SessionStore};

use super::location::Location;
use super::routes::RouteTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Proceed,
    Redirect(Location),
}

/// Per-navigation gate: rehydrate, authenticate, check role, apply the landing override.
pub struct RouteGuard {
    routes: RouteTable,
    session: Arc<SessionStore>,
    auth: Arc<AuthService>,
}

impl RouteGuard {
    pub fn new(routes: RouteTable, session: Arc<SessionStore>, auth: Arc<AuthService>) -> Self {
        Self { routes, session, auth }
    }

    pub fn routes(&self) -> &RouteTable { &self.routes }

    pub async fn before_each(&self, to: &Location) -> NavigationOutcome {
        if let Some(redirect) = self.rehydrate_if_needed().await {
            return NavigationOutcome::Redirect(redirect);
        }

        let is_authenticated = self.session.is_authenticated();
        let user_role = self.session.user_role();
        let meta = self.routes.meta_for(&to.path);

        if meta.requires_auth && !is_authenticated {
            debug!(target: "guard", to = %to, "unauthenticated; prompting login");
            return NavigationOutcome::Redirect(Location::login_prompt());
        }

        if !role_allows(meta.role, user_role) {
            let home = Location::new(landing_route(user_role));
            debug!(target: "guard", to = %to, role = ?user_role, home = %home, "role mismatch");
            return NavigationOutcome::Redirect(home);
        }

        if is_authenticated && to.is_entry() {
            let home = Location::new(landing_route(user_role));
            if home != *to {
                return NavigationOutcome::Redirect(home);
            }
        }

        NavigationOutcome::Proceed
    }

    // Promote the session persisted at startup, validating it against the backend once.
    async fn rehydrate_if_needed(&self) -> Option<Location> {
        if self.session.is_authenticated() {
            return None;
        }
        let persisted = self.session.take_pending()?;
        if !persisted.is_authenticated() {
            return None;
        }
        self.session.install(persisted);
        match self.auth.fetch_user_profile().await {
            Ok(user) => {
                info!(target: "guard", role = %user.role, "session rehydrated");
                None
            }
            Err(e) => {
                warn!(target: "guard", "persisted session rejected: {}", e);
                self.auth.logout();
                Some(Location::login_prompt())
            }
        }
    }
}
