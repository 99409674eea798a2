use super::principal::Role;

pub const ENTRY_ROUTE: &str = "/";
pub const ADMIN_DASHBOARD_ROUTE: &str = "/admin-dashboard";
pub const PROFESSIONAL_DASHBOARD_ROUTE: &str = "/professional-dashboard";

/// Role -> home route. Roles without an entry land on the entry route.
const LANDING_ROUTES: &[(Role, &str)] = &[
    (Role::Admin, ADMIN_DASHBOARD_ROUTE),
    (Role::Professional, PROFESSIONAL_DASHBOARD_ROUTE),
];

pub fn landing_route(role: Option<Role>) -> &'static str {
    role.and_then(|r| LANDING_ROUTES.iter().find(|(candidate, _)| *candidate == r).map(|(_, route)| *route))
        .unwrap_or(ENTRY_ROUTE)
}

/// True when a route requiring `required` may be entered by a user holding `actual`.
pub fn role_allows(required: Option<Role>, actual: Option<Role>) -> bool {
    match required {
        None => true,
        Some(r) => actual == Some(r),
    }
}
