use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewUser, Profile, ProfilePatch, StoreError, User, UserStore};

/// In-memory store for tests. Uniqueness checks and the insert happen under
/// one write lock.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if let Some(name) = &user.name {
            if users.values().any(|u| u.name.as_ref() == Some(name)) {
                return Err(StoreError::DuplicateName);
            }
        }
        let now = OffsetDateTime::now_utc();
        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            profile: Json(Profile::default()),
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.name.as_deref() == Some(name))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|u| {
            patch.apply_to(&mut u.profile.0);
            u.updated_at = OffsetDateTime::now_utc();
            u.clone()
        }))
    }
}

/// Store whose every call fails, for exercising the unavailable path.
pub struct DownUserStore;

#[async_trait]
impl UserStore for DownUserStore {
    async fn insert(&self, _user: NewUser) -> Result<User, StoreError> {
        Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
    }
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
    }
    async fn find_by_name(&self, _name: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
    }
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
    }
    async fn update_profile(
        &self,
        _id: Uuid,
        _patch: &ProfilePatch,
    ) -> Result<Option<User>, StoreError> {
        Err(StoreError::Unavailable(anyhow::anyhow!("connection refused")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, name: Option<&str>) -> NewUser {
        NewUser {
            email: email.into(),
            name: name.map(Into::into),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_email_and_name() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@b.com", Some("alice"))).await.unwrap();

        let err = store.insert(new_user("a@b.com", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        let err = store
            .insert(new_user("c@d.com", Some("alice")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn nameless_users_do_not_collide() {
        let store = MemoryUserStore::new();
        store.insert(new_user("a@b.com", None)).await.unwrap();
        store.insert(new_user("c@d.com", None)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn update_profile_on_missing_user_is_none() {
        let store = MemoryUserStore::new();
        let out = store
            .update_profile(Uuid::new_v4(), &ProfilePatch::default())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn update_profile_merges_into_stored_profile() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@b.com", None)).await.unwrap();

        let age = ProfilePatch {
            age: Some(28),
            ..Default::default()
        };
        let allergies = ProfilePatch {
            allergies: Some(vec!["nuts".into()]),
            snacks: Some(false),
            ..Default::default()
        };
        store.update_profile(user.id, &age).await.unwrap();
        let updated = store
            .update_profile(user.id, &allergies)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.profile.age, Some(28));
        assert_eq!(updated.profile.allergies, vec!["nuts".to_string()]);
        assert!(!updated.profile.meal_preferences.snacks);
        assert!(updated.profile.meal_preferences.lunch);
    }
}
