//! Loan (peminjaman) endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, LoanDetails, LoanPatch, LoanQuery},
    AppState,
};

use super::{ApiPath, ApiQuery, ApiResponse, AuthenticatedUser, ValidatedJson};

/// List loans
#[utoipa::path(
    get,
    path = "/peminjaman",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans matching the filters", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiQuery(query): ApiQuery<LoanQuery>,
) -> AppResult<Json<ApiResponse<Vec<LoanDetails>>>> {
    let loans = state.services.loans.list_loans(&query).await?;
    Ok(ApiResponse::new("Loans retrieved", loans))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/peminjaman/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<LoanDetails>>> {
    let loan = state.services.loans.get_loan(id).await?;
    Ok(ApiResponse::new("Loan retrieved", loan))
}

/// Open a loan for one copy of a book
#[utoipa::path(
    post,
    path = "/peminjaman",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "No copy of the book is available")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateLoan>,
) -> AppResult<(StatusCode, Json<ApiResponse<LoanDetails>>)> {
    tracing::debug!("Member {} opening loan for book {}", caller.member_id, request.book_id);
    let loan = state.services.loans.create_loan(request).await?;
    Ok((StatusCode::CREATED, ApiResponse::new("Loan created", loan)))
}

/// Correct loan metadata
#[utoipa::path(
    put,
    path = "/peminjaman/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = LoanPatch,
    responses(
        (status = 200, description = "Loan updated", body = LoanDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Loan, book or member not found")
    )
)]
pub async fn update_loan(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(patch): ValidatedJson<LoanPatch>,
) -> AppResult<Json<ApiResponse<LoanDetails>>> {
    let loan = state.services.loans.update_loan(id, patch).await?;
    Ok(ApiResponse::new("Loan updated", loan))
}

/// Delete a loan record
#[utoipa::path(
    delete,
    path = "/peminjaman/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan deleted"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.loans.delete_loan(id).await?;
    Ok(ApiResponse::message("Loan deleted"))
}
