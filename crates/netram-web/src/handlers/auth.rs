//! Account endpoints: signup, login, logout, profile and onboarding steps.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use netram_common::entities::{Role, UserProfile};
use netram_common::forms::{LoginForm, SignUpForm};
use netram_common::validation::Validate;
use netram_db::OnboardingStep;

use crate::access::pending_onboarding;
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub user: UserProfile,
    /// Next onboarding page, if any step is still pending.
    pub next: Option<&'static str>,
}

async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<SharedState>,
    ApiJson(form): ApiJson<SignUpForm>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    form.validate()?;
    let role = form.role();
    let password = form.password.clone();
    let hash = blocking(move || hash_password(&password)).await??;

    let profile = UserProfile::new(
        Uuid::new_v4().to_string(),
        form.email.clone(),
        form.name.trim().to_string(),
        role,
    );
    let user = state.users().create(profile, hash).await?;
    let (token, session) = state.sessions.issue(&user.uid).await;
    info!(uid = %user.uid, role = %role, "Account created");

    Ok((StatusCode::CREATED, Json(SessionResponse { token, expires_at: session.expires_at, user })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<SharedState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> ApiResult<Json<SessionResponse>> {
    form.validate()?;
    let stored = state.users()
        .find_by_email(&form.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let password = form.password.clone();
    let phc = stored.password_hash.clone();
    if !blocking(move || verify_password(&password, &phc)).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let (token, session) = state.sessions.issue(&stored.profile.uid).await;
    Ok(Json(SessionResponse { token, expires_at: session.expires_at, user: stored.profile }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Json<serde_json::Value> {
    state.sessions.revoke(&user.token).await;
    Json(serde_json::json!({ "success": true }))
}

/// GET /api/auth/me
pub async fn me(user: AuthUser) -> Json<UserProfile> {
    Json(user.profile)
}

fn parse_step(raw: &str) -> Option<(OnboardingStep, Role)> {
    match raw {
        "setup"   => Some((OnboardingStep::AdminSetup, Role::Admin)),
        "license" => Some((OnboardingStep::LicenseVerified, Role::Doctor)),
        "profile" => Some((OnboardingStep::ProfileComplete, Role::Patient)),
        "consent" => Some((OnboardingStep::ConsentSigned, Role::Patient)),
        _ => None,
    }
}

/// POST /api/auth/onboarding/{step}
pub async fn complete_onboarding(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(step): Path<String>,
) -> ApiResult<Json<OnboardingResponse>> {
    let (step, role) = parse_step(&step)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown onboarding step '{step}'")))?;
    user.require_any(&[role])?;

    let updated = state.users().complete_step(user.uid(), step).await?;
    let next = pending_onboarding(&updated);
    Ok(Json(OnboardingResponse { user: updated, next }))
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_signup_login_me_logout() {
        let app = TestApp::new();
        let (status, body) = app.post("/api/auth/signup", None, json!({
            "email": "Doc@Clinic.org", "password": "secret1", "name": "Dr. Smith", "role": "doctor",
        })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "doc@clinic.org");
        assert_eq!(body["user"]["license_verified"], false);

        let (status, body) = app.post("/api/auth/login", None, json!({
            "email": "doc@clinic.org", "password": "secret1",
        })).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = app.get("/api/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "doctor");

        let (status, _) = app.post("/api/auth/logout", Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.get("/api/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signup_validation_and_duplicates() {
        let app = TestApp::new();
        let (status, body) = app.post("/api/auth/signup", None, json!({
            "email": "bad", "password": "123", "name": "A",
        })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["password"].is_array());

        let form = json!({"email": "p@b.co", "password": "secret1", "name": "Pat"});
        assert_eq!(app.post("/api/auth/signup", None, form.clone()).await.0, StatusCode::CREATED);
        assert_eq!(app.post("/api/auth/signup", None, form).await.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = TestApp::new();
        app.sign_up("a@b.co", netram_common::Role::Admin).await;
        let (status, _) = app.post("/api/auth/login", None, json!({
            "email": "a@b.co", "password": "wrong-one",
        })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_onboarding_steps_are_role_bound() {
        let app = TestApp::new();
        let patient = app.sign_up("p@b.co", netram_common::Role::Patient).await;

        let (status, _) = app.post("/api/auth/onboarding/license", Some(&patient), json!({})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.post("/api/auth/onboarding/profile", Some(&patient), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["next"], "/patient/consent");

        let (_, body) = app.post("/api/auth/onboarding/consent", Some(&patient), json!({})).await;
        assert!(body["next"].is_null());

        let (status, _) = app.post("/api/auth/onboarding/bogus", Some(&patient), json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
