//! API handlers for Pustaka REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;
pub mod returns;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use crate::{error::AppError, models::CallerIdentity, AppState};

/// Extractor for the authenticated caller
pub struct AuthenticatedUser(pub CallerIdentity);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let identity = state.services.auth.authenticate(auth_header)?;
        Ok(AuthenticatedUser(identity))
    }
}

/// JSON body that has been deserialized and passed its `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Path parameters, rejected as a 400 error body
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string, rejected as a 400 error body
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Success envelope: `{message, data?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
            data: None,
        })
    }
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/profil", get(auth::profile))
        // Loans
        .route("/peminjaman", get(loans::list_loans).post(loans::create_loan))
        .route(
            "/peminjaman/:id",
            get(loans::get_loan).put(loans::update_loan).delete(loans::delete_loan),
        )
        // Returns
        .route("/pengembalian", get(returns::list_returns).post(returns::create_return))
        .route(
            "/pengembalian/:id",
            get(returns::get_return)
                .put(returns::update_return)
                .delete(returns::delete_return),
        )
        // Books
        .route("/buku", get(books::list_books).post(books::create_book))
        .route(
            "/buku/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        // Members
        .route("/anggota", get(members::list_members).post(members::create_member))
        .route(
            "/anggota/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
