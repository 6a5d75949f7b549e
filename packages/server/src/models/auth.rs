use serde::{Deserialize, Serialize};

use super::user::UserResponse;
use crate::error::AppError;

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username.
    #[schema(example = "alice")]
    #[serde(default)]
    pub username: String,
    /// Unique email address.
    #[schema(example = "alice@example.com")]
    #[serde(default)]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    #[serde(default)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(AppError::Validation(
            "Missing required fields: username, email, and password".into(),
        ));
    }
    if payload.username.trim().chars().count() > 80 {
        return Err(AppError::Validation(
            "Username must be at most 80 characters".into(),
        ));
    }
    if !payload.email.contains('@') || payload.email.trim().chars().count() > 120 {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    Ok(())
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username, or email address when it contains `@`.
    #[schema(example = "alice")]
    #[serde(default)]
    pub username: String,
    #[schema(example = "s3cure_P@ss!")]
    #[serde(default)]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("Missing username or password".into()));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    /// JWT bearer token for the new account.
    pub access_token: String,
    pub user: UserResponse,
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
}
