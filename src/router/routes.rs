use crate::identity::{Role, ADMIN_DASHBOARD_ROUTE, ENTRY_ROUTE, PROFESSIONAL_DASHBOARD_ROUTE};

pub const BOOKINGS_ROUTE: &str = "/bookings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub role: Option<Role>,
}

impl RouteMeta {
    pub const PUBLIC: RouteMeta = RouteMeta { requires_auth: false, role: None };

    pub const fn authenticated() -> Self { RouteMeta { requires_auth: true, role: None } }

    pub const fn for_role(role: Role) -> Self { RouteMeta { requires_auth: true, role: Some(role) } }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDef {
    pub path: &'static str,
    pub name: &'static str,
    pub meta: RouteMeta,
}

/// Static route configuration. Paths not listed fall through to the public catch-all.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDef>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            RouteDef { path: ENTRY_ROUTE, name: "home", meta: RouteMeta::PUBLIC },
            RouteDef { path: ADMIN_DASHBOARD_ROUTE, name: "admin-dashboard", meta: RouteMeta::for_role(Role::Admin) },
            RouteDef { path: PROFESSIONAL_DASHBOARD_ROUTE, name: "professional-dashboard", meta: RouteMeta::for_role(Role::Professional) },
            RouteDef { path: BOOKINGS_ROUTE, name: "bookings", meta: RouteMeta::authenticated() },
        ])
    }
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDef>) -> Self { Self { routes } }

    pub fn find(&self, path: &str) -> Option<&RouteDef> {
        let path = normalize(path);
        self.routes.iter().find(|r| r.path == path)
    }

    pub fn meta_for(&self, path: &str) -> RouteMeta {
        self.find(path).map(|r| r.meta).unwrap_or(RouteMeta::PUBLIC)
    }

    pub fn routes(&self) -> &[RouteDef] { &self.routes }
}

// "/admin-dashboard/" and "/admin-dashboard" are the same route.
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { ENTRY_ROUTE } else { trimmed }
}
