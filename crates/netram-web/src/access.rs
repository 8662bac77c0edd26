//! Page access policy.
//!
//! Decides, for a front-end path and the caller's session, whether the page
//! may be shown or where the caller should be sent instead:
//!
//! 1. Anonymous callers on a protected page go to the login page, carrying
//!    the requested path in `redirectedFrom`.
//! 2. Signed-in callers on an auth page (login, signup, password reset) go
//!    to their role dashboard.
//! 3. Signed-in callers with a pending onboarding step go to that step.

use axum::Json;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use netram_common::entities::{Role, UserProfile};

use crate::auth::AuthUser;
use crate::error::{ApiQuery, ApiResult};

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_DASHBOARD_PATH: &str = "/dashboard";

pub const AUTH_ROUTES: &[&str] = &["/login", "/signup", "/forgot-password"];

pub const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/analyze-scan",
    "/profile",
    "/patients",
    "/appointments",
    "/emr",
    "/billing",
    "/reports",
    "/telemedicine",
    "/settings",
    "/reception/dashboard",
    "/research-assistant",
    "/project-autoscholar",
    "/admin/setup",
    "/doctor/verify-license",
    "/patient/complete-profile",
    "/patient/consent",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    Redirect { location: String },
}

impl AccessDecision {
    fn redirect(location: impl Into<String>) -> Self {
        AccessDecision::Redirect { location: location.into() }
    }
}

pub fn role_dashboard(role: Role) -> &'static str {
    match role {
        Role::Receptionist => "/reception/dashboard",
        Role::Admin | Role::Doctor | Role::Patient => DEFAULT_DASHBOARD_PATH,
    }
}

/// The first onboarding page the user still has to visit.
pub fn pending_onboarding(user: &UserProfile) -> Option<&'static str> {
    match user.role {
        Role::Admin if user.first_login_pending => Some("/admin/setup"),
        Role::Doctor if user.license_verified == Some(false) => Some("/doctor/verify-license"),
        Role::Patient if user.profile_complete == Some(false) => Some("/patient/complete-profile"),
        Role::Patient if user.consent_signed == Some(false) => Some("/patient/consent"),
        _ => None,
    }
}

fn login_redirect(path: &str) -> String {
    let mut url = match Url::parse("http://localhost/login") {
        Ok(url) => url,
        Err(_) => return LOGIN_PATH.to_string(),
    };
    url.query_pairs_mut().append_pair("redirectedFrom", path);
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

pub fn decide(path: &str, user: Option<&UserProfile>) -> AccessDecision {
    // API calls enforce their own auth.
    if path.starts_with("/api") {
        return AccessDecision::Allow;
    }
    let is_auth_route = AUTH_ROUTES.iter().any(|r| path.starts_with(r));
    let is_protected = PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p));

    let Some(user) = user else {
        return if is_protected {
            AccessDecision::redirect(login_redirect(path))
        } else {
            AccessDecision::Allow
        };
    };

    if is_auth_route {
        return AccessDecision::redirect(role_dashboard(user.role));
    }
    match pending_onboarding(user) {
        Some(step) if step != path => AccessDecision::redirect(step),
        _ => AccessDecision::Allow,
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub path: String,
    pub authenticated: bool,
    #[serde(flatten)]
    pub decision: AccessDecision,
}

/// GET /api/access?path=/patients
pub async fn access_check(
    user: Option<AuthUser>,
    ApiQuery(q): ApiQuery<AccessQuery>,
) -> ApiResult<Json<AccessResponse>> {
    let path = if q.path.is_empty() { "/".to_string() } else { q.path };
    let decision = decide(&path, user.as_ref().map(|u| &u.profile));
    Ok(Json(AccessResponse { path, authenticated: user.is_some(), decision }))
}
