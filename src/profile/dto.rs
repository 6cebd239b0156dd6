use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::users::ProfilePatch;

const MAX_AGE: u32 = 130;

/// Partial profile update. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub age: Option<u32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub dietary_restrictions: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub weekly_budget: Option<f64>,
    pub fitness_goals: Option<Vec<String>>,
    pub meal_preferences: Option<MealPreferencesUpdate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MealPreferencesUpdate {
    pub breakfast: Option<bool>,
    pub lunch: Option<bool>,
    pub dinner: Option<bool>,
    pub snacks: Option<bool>,
}

fn positive(field: &str, v: f64) -> AppResult<f64> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(AppError::validation(format!("{field} must be a positive number")))
    }
}

/// Trims entries, drops blanks and repeats, keeps first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|s| s == item) {
            out.push(item.to_string());
        }
    }
    out
}

impl ProfileUpdate {
    /// Validates and cleans the body. The merge with the stored profile is
    /// left to the store so it happens under its lock.
    pub fn into_patch(self) -> AppResult<ProfilePatch> {
        if let Some(age) = self.age {
            if age == 0 || age > MAX_AGE {
                return Err(AppError::validation(format!(
                    "age must be between 1 and {MAX_AGE}"
                )));
            }
        }
        let weight = self.weight.map(|w| positive("weight", w)).transpose()?;
        let height = self.height.map(|h| positive("height", h)).transpose()?;
        if let Some(b) = self.weekly_budget {
            if !b.is_finite() || b < 0.0 {
                return Err(AppError::validation("weeklyBudget must not be negative"));
            }
        }
        let prefs = self.meal_preferences.unwrap_or_default();

        Ok(ProfilePatch {
            age: self.age,
            weight,
            height,
            dietary_restrictions: self.dietary_restrictions.map(clean_list),
            allergies: self.allergies.map(clean_list),
            weekly_budget: self.weekly_budget,
            fitness_goals: self.fitness_goals.map(clean_list),
            breakfast: prefs.breakfast,
            lunch: prefs.lunch,
            dinner: prefs.dinner,
            snacks: prefs.snacks,
        })
    }
}
