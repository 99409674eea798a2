//! Client-side navigation: locations, the static route table, the per-navigation guard,
//! and the `Navigator` sink used for out-of-band redirects (e.g. a failed token refresh).

mod location;
mod routes;
mod guard;

pub use location::Location;
pub use routes::{RouteDef, RouteMeta, RouteTable, BOOKINGS_ROUTE};
pub use guard::{NavigationOutcome, RouteGuard};

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Guard redirects followed before a navigation is declared a loop.
pub const MAX_REDIRECTS: usize = 8;

/// Receives redirects issued outside a navigation, such as the gateway's logout-on-refresh-failure.
pub trait Navigator: Send + Sync {
    fn redirect(&self, to: Location);
}

/// Navigator that queues redirects for the shell to pick up.
#[derive(Debug, Default)]
pub struct RedirectQueue {
    pending: Mutex<Vec<Location>>,
}

impl RedirectQueue {
    pub fn new() -> Self { Self::default() }

    pub fn take(&self) -> Vec<Location> { std::mem::take(&mut *self.pending.lock()) }

    pub fn last(&self) -> Option<Location> { self.pending.lock().last().cloned() }

    pub fn len(&self) -> usize { self.pending.lock().len() }

    pub fn is_empty(&self) -> bool { self.pending.lock().is_empty() }
}

impl Navigator for RedirectQueue {
    fn redirect(&self, to: Location) {
        info!(target: "router", to = %to, "redirect requested");
        self.pending.lock().push(to);
    }
}

/// Applies the guard to each navigation and tracks where the user ended up.
pub struct Router {
    guard: RouteGuard,
    current: RwLock<Location>,
}

impl Router {
    pub fn new(guard: RouteGuard) -> Self { Self { guard, current: RwLock::new(Location::entry()) } }

    pub fn current(&self) -> Location { self.current.read().clone() }

    pub fn guard(&self) -> &RouteGuard { &self.guard }

    /// Navigate to `to`, following guard redirects. Returns the location finally entered.
    pub async fn navigate(&self, to: &str) -> AppResult<Location> {
        self.navigate_to(Location::parse(to)).await
    }

    pub async fn navigate_to(&self, to: Location) -> AppResult<Location> {
        let mut target = to;
        for _ in 0..MAX_REDIRECTS {
            match self.guard.before_each(&target).await {
                NavigationOutcome::Proceed => {
                    *self.current.write() = target.clone();
                    return Ok(target);
                }
                NavigationOutcome::Redirect(next) => target = next,
            }
        }
        Err(AppError::internal("redirect_loop", format!("navigation to {} did not settle", target)))
    }
}
