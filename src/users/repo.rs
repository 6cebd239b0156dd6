use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{NewUser, Profile, ProfilePatch, StoreError, User, UserStore};

const EMAIL_CONSTRAINT: &str = "users_email_key";
const NAME_CONSTRAINT: &str = "users_name_key";

/// PostgreSQL-backed user store. Uniqueness is enforced by the
/// `users_email_key` / `users_name_key` constraints.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Maps a unique-violation constraint name to the matching store error.
fn duplicate_for_constraint(constraint: Option<&str>) -> Option<StoreError> {
    match constraint {
        Some(EMAIL_CONSTRAINT) => Some(StoreError::DuplicateEmail),
        Some(NAME_CONSTRAINT) => Some(StoreError::DuplicateName),
        _ => None,
    }
}

fn map_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(dup) = duplicate_for_constraint(db_err.constraint()) {
                return dup;
            }
        }
    }
    StoreError::Unavailable(anyhow!(err))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, password_hash, profile, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_err)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, profile, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(map_err)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, profile, created_at, updated_at
            FROM users
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await
        .map_err(map_err)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, profile, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_err)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Option<User>, StoreError> {
        let mut tx = self.db.begin().await.map_err(map_err)?;

        // Row lock serializes concurrent patches for the same user.
        let current: Option<(Json<Profile>,)> =
            sqlx::query_as("SELECT profile FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_err)?;
        let Some((Json(mut profile),)) = current else {
            return Ok(None);
        };
        patch.apply_to(&mut profile);

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET profile = $2, updated_at = now()
             WHERE id = $1
            RETURNING id, email, name, password_hash, profile, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(Json(profile))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err)?;

        tx.commit().await.map_err(map_err)?;
        Ok(Some(user))
    }
}
