//! User account repository.
//!
//! Users are keyed by `uid`. The password hash is stored alongside the
//! profile but never leaves this crate inside a `UserProfile`.

use netram_common::entities::UserProfile;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::Result;
use crate::repository::Repository;
use crate::store::{DocumentStore, Query, COLLECTION_USERS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub password_hash: String,
}

/// Onboarding steps a user can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    AdminSetup,
    LicenseVerified,
    ProfileComplete,
    ConsentSigned,
}

#[derive(Clone)]
pub struct UserRepository {
    repo: Repository<StoredUser>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { repo: Repository::new(store, COLLECTION_USERS) }
    }

    /// Fails with `Duplicate` if the email is already registered.
    pub async fn create(&self, mut profile: UserProfile, password_hash: String) -> Result<UserProfile> {
        profile.email = profile.email.trim().to_lowercase();
        let uid = profile.uid.clone();
        let stored = self.repo.put_unique(&uid, &StoredUser { profile, password_hash }, "email").await?;
        Ok(stored.profile)
    }

    /// Emails are matched case-insensitively; they are stored lowercased.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let q = Query::new().where_eq("email", email.trim().to_lowercase()).limit(1);
        Ok(self.repo.find(&q).await?.into_iter().next())
    }

    pub async fn find_by_uid(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.repo.find_by_id(uid).await?.map(|u| u.profile))
    }

    pub async fn complete_step(&self, uid: &str, step: OnboardingStep) -> Result<UserProfile> {
        let patch = match step {
            OnboardingStep::AdminSetup      => json!({"first_login_pending": false}),
            OnboardingStep::LicenseVerified => json!({"license_verified": true}),
            OnboardingStep::ProfileComplete => json!({"profile_complete": true}),
            OnboardingStep::ConsentSigned   => json!({"consent_signed": true}),
        };
        Ok(self.repo.patch(uid, patch).await?.profile)
    }

    pub async fn count(&self) -> Result<u64> {
        self.repo.count(&Query::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::MemoryStore;
    use netram_common::entities::Role;

    fn repo() -> UserRepository {
        UserRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let users = repo();
        let profile = UserProfile::new("u1".into(), "doc@clinic.org".into(), "Dr. Who".into(), Role::Doctor);
        users.create(profile, "hash".into()).await.unwrap();

        let found = users.find_by_email(" DOC@clinic.org ").await.unwrap().unwrap();
        assert_eq!(found.profile.uid, "u1");
        assert_eq!(found.password_hash, "hash");
        assert_eq!(users.find_by_uid("u1").await.unwrap().unwrap().role, Role::Doctor);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let users = repo();
        let a = UserProfile::new("u1".into(), "a@b.co".into(), "Al".into(), Role::Patient);
        let b = UserProfile::new("u2".into(), "a@b.co".into(), "Bo".into(), Role::Patient);
        users.create(a, "h".into()).await.unwrap();
        assert!(matches!(users.create(b, "h".into()).await, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_concurrent_signups_with_one_email() {
        let users = repo();
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let users = users.clone();
            tasks.spawn(async move {
                let p = UserProfile::new(format!("u{i}"), "SAME@b.co".into(), "Sam".into(), Role::Patient);
                users.create(p, "h".into()).await
            });
        }
        let mut created = 0;
        while let Some(res) = tasks.join_next().await {
            match res.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert!(matches!(e, StoreError::Duplicate(_))),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(users.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_complete_step() {
        let users = repo();
        let p = UserProfile::new("u1".into(), "p@b.co".into(), "Pat".into(), Role::Patient);
        users.create(p, "h".into()).await.unwrap();
        let updated = users.complete_step("u1", OnboardingStep::ConsentSigned).await.unwrap();
        assert_eq!(updated.consent_signed, Some(true));
        assert_eq!(updated.profile_complete, Some(false));
    }
}
