use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, PublicUser},
        jwt::JwtKeys,
        password,
    },
    error::{AppError, AppResult},
    users::{NewUser, User, UserStore},
};

pub const MIN_USERNAME_LEN: usize = 2;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Outcome of a username availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameStatus {
    TooShort,
    Taken,
    Available,
}

impl UsernameStatus {
    pub fn is_available(self) -> bool {
        self == Self::Available
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::TooShort => "Username must be at least 2 characters long",
            Self::Taken => "Username is already taken",
            Self::Available => "Username is available",
        }
    }
}

/// Registration, login and token verification over a [`UserStore`].
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> AppResult<AuthResponse> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("Email and password are required"));
        }
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::validation("Invalid email"));
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        // Fast-path checks for a stable error order; the store's unique
        // constraints still decide concurrent inserts.
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::DuplicateEmail);
        }
        if let Some(name) = name {
            if self.users.find_by_name(name).await?.is_some() {
                warn!(name = %name, "username already taken");
                return Err(AppError::DuplicateUsername);
            }
        }

        let password_hash = password::hash_password(password).map_err(AppError::Internal)?;
        let user = self
            .users
            .insert(NewUser {
                email,
                name: name.map(str::to_string),
                password_hash,
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "user insert rejected");
                AppError::from(e)
            })?;

        let token = self.issue(&user)?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(AuthResponse {
            user: PublicUser::from(&user),
            token,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthResponse> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation("Email and password are required"));
        }

        let user = match self.users.find_by_email(&email).await? {
            Some(u) => u,
            None => {
                password::verify_against_dummy(password);
                warn!(email = %email, "login unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        match password::verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!(user_id = %user.id, "login invalid password");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, user_id = %user.id, "stored password hash unreadable");
                return Err(AppError::InvalidCredentials);
            }
        }

        let token = self.issue(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthResponse {
            user: PublicUser::from(&user),
            token,
        })
    }

    /// Resolves a token to its user. Every failure yields `None`.
    pub async fn verify_token(&self, token: &str) -> Option<User> {
        let claims = match self.keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                return None;
            }
        };
        match self.users.find_by_id(claims.id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                warn!(user_id = %claims.id, "token for unknown user");
                None
            }
            Err(e) => {
                error!(error = ?e, user_id = %claims.id, "user lookup failed during token check");
                None
            }
        }
    }

    pub async fn check_username_availability(&self, name: &str) -> AppResult<UsernameStatus> {
        let name = name.trim();
        if name.chars().count() < MIN_USERNAME_LEN {
            return Ok(UsernameStatus::TooShort);
        }
        Ok(match self.users.find_by_name(name).await? {
            Some(_) => UsernameStatus::Taken,
            None => UsernameStatus::Available,
        })
    }

    fn issue(&self, user: &User) -> AppResult<String> {
        self.keys.sign(user.id, &user.email).map_err(|e| {
            error!(error = %e, user_id = %user.id, "jwt sign failed");
            AppError::Internal(e)
        })
    }
}
