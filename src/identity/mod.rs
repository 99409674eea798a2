//! Identity and session management: who is logged in, with which tokens, and what the
//! role means for navigation. Public surface is thin; implementation is split by concern.

mod principal;
mod session;
mod provider;
mod authorizer;

pub use principal::{Role, UserProfile};
pub use session::{Session, SessionStore, SessionToken};
pub use provider::{
    AuthService, GoogleLoginRequest, LoginRequest, LoginResponse, OtpPurpose, ProfessionalSignup, ResetPasswordRequest,
    ResumeUpload, SignupRequest,
};
pub use authorizer::{landing_route, role_allows, ADMIN_DASHBOARD_ROUTE, ENTRY_ROUTE, PROFESSIONAL_DASHBOARD_ROUTE};
