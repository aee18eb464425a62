//! Authentication endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{error::AppResult, models::CallerIdentity, AppState};

use super::{ApiResponse, AuthenticatedUser, ValidatedJson};

/// Login request
#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response with JWT token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub member: CallerIdentity,
}

/// Authenticate a member and get a JWT token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let (token, member) = state
        .services
        .auth
        .login(&request.email, &request.password)
        .await?;

    Ok(ApiResponse::new(
        "Login successful",
        LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.auth.jwt_expiration_hours * 3600,
            member,
        },
    ))
}

/// Get the authenticated caller
#[utoipa::path(
    get,
    path = "/auth/profil",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller identity", body = CallerIdentity),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn profile(
    AuthenticatedUser(caller): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<CallerIdentity>>> {
    Ok(ApiResponse::new("Profile retrieved", caller))
}
