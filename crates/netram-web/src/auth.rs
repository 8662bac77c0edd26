//! Password hashing, bearer-token sessions and the `AuthUser` extractor.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use tokio::sync::RwLock;

use netram_common::entities::{Role, UserProfile};

use crate::error::ApiError;
use crate::state::SharedState;

// ── Passwords ────────────────────────────────────────────────────────────────

/// Argon2id PHC string. CPU-heavy: call from a blocking task.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

// ── Sessions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    pub expires_at: DateTime<Utc>,
}

/// In-process session table keyed by opaque bearer token.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl SessionStore {
    pub fn new(ttl_hours: i64) -> Self {
        Self { ttl: Duration::hours(ttl_hours.max(1)), sessions: RwLock::new(HashMap::new()) }
    }

    pub async fn issue(&self, uid: &str) -> (String, Session) {
        let token = new_token();
        let session = Session { uid: uid.to_string(), expires_at: Utc::now() + self.ttl };
        self.sessions.write().await.insert(token.clone(), session.clone());
        (token, session)
    }

    /// Returns the owning uid. Expired sessions are dropped on sight.
    pub async fn resolve(&self, token: &str) -> Result<String, ApiError> {
        let session = self.sessions.read().await.get(token).cloned();
        match session {
            None => Err(ApiError::Unauthorized),
            Some(s) if s.expires_at <= Utc::now() => {
                self.sessions.write().await.remove(token);
                Err(ApiError::SessionExpired)
            }
            Some(s) => Ok(s.uid),
        }
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub async fn active(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn expire_now(&self, token: &str) {
        if let Some(s) = self.sessions.write().await.get_mut(token) {
            s.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

// ── Extractor ────────────────────────────────────────────────────────────────

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub token: String,
    pub profile: UserProfile,
}

impl AuthUser {
    pub fn uid(&self) -> &str {
        &self.profile.uid
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.profile.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.profile.role.is_staff() { Ok(()) } else { Err(ApiError::forbidden()) }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?.to_string();
        let uid = state.sessions.resolve(&token).await?;
        let profile = state.users().find_by_uid(&uid).await?.ok_or(ApiError::Unauthorized)?;
        Ok(AuthUser { token, profile })
    }
}

/// `Option<AuthUser>`: anonymous when the token is missing, unknown or expired.
impl OptionalFromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Option<Self>, Self::Rejection> {
        match <AuthUser as FromRequestParts<SharedState>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(ApiError::Unauthorized | ApiError::SessionExpired) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(!verify_password("secret1", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = SessionStore::new(1);
        let (token, session) = store.issue("u1").await;
        assert_eq!(session.uid, "u1");
        assert_eq!(store.resolve(&token).await.unwrap(), "u1");

        assert!(store.revoke(&token).await);
        assert!(matches!(store.resolve(&token).await, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let store = SessionStore::new(1);
        let (token, _) = store.issue("u1").await;
        let (other, _) = store.issue("u2").await;
        store.expire_now(&token).await;

        assert!(matches!(store.resolve(&token).await, Err(ApiError::SessionExpired)));
        assert!(matches!(store.resolve(&token).await, Err(ApiError::Unauthorized)));
        assert_eq!(store.resolve(&other).await.unwrap(), "u2");
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::new(1);
        let (a, _) = store.issue("u1").await;
        let (b, _) = store.issue("u1").await;
        assert_ne!(a, b);
        assert_eq!(store.active().await, 2);
        assert_eq!(store.purge_expired().await, 0);
    }
}
