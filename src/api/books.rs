//! Catalog (buku) endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::book::{Book, CreateBook, UpdateBook},
    AppState,
};

use super::{ApiPath, ApiResponse, AuthenticatedUser, ValidatedJson};

/// List catalog titles
#[utoipa::path(
    get,
    path = "/buku",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All books", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<Book>>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(ApiResponse::new("Books retrieved", books))
}

#[utoipa::path(
    get,
    path = "/buku/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(ApiResponse::new("Book retrieved", book))
}

#[utoipa::path(
    post,
    path = "/buku",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateBook>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let book = state.services.catalog.create_book(request).await?;
    Ok((StatusCode::CREATED, ApiResponse::new("Book created", book)))
}

#[utoipa::path(
    put,
    path = "/buku/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "More copies on loan than the new total")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(changes): ValidatedJson<UpdateBook>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.catalog.update_book(id, changes).await?;
    Ok(ApiResponse::new("Book updated", book))
}

#[utoipa::path(
    delete,
    path = "/buku/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has open loans")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.catalog.delete_book(id).await?;
    Ok(ApiResponse::message("Book deleted"))
}
