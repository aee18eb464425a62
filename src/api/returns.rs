//! Return (pengembalian) endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::loan_return::{CreateReturn, LoanReturn, ReturnPatch},
    AppState,
};

use super::{ApiPath, ApiResponse, AuthenticatedUser, ValidatedJson};

/// List return records
#[utoipa::path(
    get,
    path = "/pengembalian",
    tag = "returns",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All return records", body = Vec<LoanReturn>)
    )
)]
pub async fn list_returns(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<LoanReturn>>>> {
    let returns = state.services.loans.list_returns().await?;
    Ok(ApiResponse::new("Returns retrieved", returns))
}

/// Get a return record by ID
#[utoipa::path(
    get,
    path = "/pengembalian/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return ID")),
    responses(
        (status = 200, description = "Return details", body = LoanReturn),
        (status = 404, description = "Return not found")
    )
)]
pub async fn get_return(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<LoanReturn>>> {
    let record = state.services.loans.get_return(id).await?;
    Ok(ApiResponse::new("Return retrieved", record))
}

/// Return a borrowed copy, closing its loan
#[utoipa::path(
    post,
    path = "/pengembalian",
    tag = "returns",
    security(("bearer_auth" = [])),
    request_body = CreateReturn,
    responses(
        (status = 201, description = "Loan closed", body = LoanReturn),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned")
    )
)]
pub async fn create_return(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateReturn>,
) -> AppResult<(StatusCode, Json<ApiResponse<LoanReturn>>)> {
    let record = state.services.loans.create_return(request).await?;
    Ok((StatusCode::CREATED, ApiResponse::new("Book returned", record)))
}

/// Edit a return record
#[utoipa::path(
    put,
    path = "/pengembalian/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return ID")),
    request_body = ReturnPatch,
    responses(
        (status = 200, description = "Return updated", body = LoanReturn),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Return or loan not found"),
        (status = 409, description = "Target loan already has a return record")
    )
)]
pub async fn update_return(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(patch): ValidatedJson<ReturnPatch>,
) -> AppResult<Json<ApiResponse<LoanReturn>>> {
    let record = state.services.loans.update_return(id, patch).await?;
    Ok(ApiResponse::new("Return updated", record))
}

/// Delete a return record
#[utoipa::path(
    delete,
    path = "/pengembalian/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return ID")),
    responses(
        (status = 200, description = "Return deleted"),
        (status = 404, description = "Return not found")
    )
)]
pub async fn delete_return(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.loans.delete_return(id).await?;
    Ok(ApiResponse::message("Return deleted"))
}
