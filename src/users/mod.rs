use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

#[cfg(test)]
pub mod memory;
pub mod repo;

pub use repo::PgUserStore;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String, // always lowercase
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub profile: Json<Profile>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields required to insert a user. Email and name are already normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// Optional nutrition attributes attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub age: Option<u32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub dietary_restrictions: Vec<String>,
    pub allergies: Vec<String>,
    pub weekly_budget: Option<f64>,
    pub fitness_goals: Vec<String>,
    pub meal_preferences: MealPreferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealPreferences {
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
    pub snacks: bool,
}

impl Default for MealPreferences {
    fn default() -> Self {
        Self {
            breakfast: true,
            lunch: true,
            dinner: true,
            snacks: true,
        }
    }
}

/// Validated partial profile change. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub age: Option<u32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub dietary_restrictions: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub weekly_budget: Option<f64>,
    pub fitness_goals: Option<Vec<String>>,
    pub breakfast: Option<bool>,
    pub lunch: Option<bool>,
    pub dinner: Option<bool>,
    pub snacks: Option<bool>,
}

impl ProfilePatch {
    /// Merges onto the profile read under the store's lock.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(age) = self.age {
            profile.age = Some(age);
        }
        if let Some(w) = self.weight {
            profile.weight = Some(w);
        }
        if let Some(h) = self.height {
            profile.height = Some(h);
        }
        if let Some(b) = self.weekly_budget {
            profile.weekly_budget = Some(b);
        }
        if let Some(list) = &self.dietary_restrictions {
            profile.dietary_restrictions = list.clone();
        }
        if let Some(list) = &self.allergies {
            profile.allergies = list.clone();
        }
        if let Some(list) = &self.fitness_goals {
            profile.fitness_goals = list.clone();
        }
        let prefs = &mut profile.meal_preferences;
        prefs.breakfast = self.breakfast.unwrap_or(prefs.breakfast);
        prefs.lunch = self.lunch.unwrap_or(prefs.lunch);
        prefs.dinner = self.dinner.unwrap_or(prefs.dinner);
        prefs.snacks = self.snacks.unwrap_or(prefs.snacks);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already exists")]
    DuplicateEmail,
    #[error("name already exists")]
    DuplicateName,
    #[error("user store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

/// Persistence for user records. Implementations must enforce email and name
/// uniqueness atomically with the insert.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Merges `patch` into the stored profile as one atomic read-modify-write,
    /// so concurrent patches touching different fields are all kept.
    /// Returns `None` if the user does not exist.
    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch)
        -> Result<Option<User>, StoreError>;
}
