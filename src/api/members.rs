//! Member (anggota) endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::member::{CreateMember, Member, UpdateMember},
    AppState,
};

use super::{ApiPath, ApiResponse, AuthenticatedUser, ValidatedJson};

#[utoipa::path(
    get,
    path = "/anggota",
    tag = "members",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All members", body = Vec<Member>)
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<Member>>>> {
    let members = state.services.members.list_members().await?;
    Ok(ApiResponse::new("Members retrieved", members))
}

#[utoipa::path(
    get,
    path = "/anggota/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<Member>>> {
    let member = state.services.members.get_member(id).await?;
    Ok(ApiResponse::new("Member retrieved", member))
}

/// Register a member
#[utoipa::path(
    post,
    path = "/anggota",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateMember>,
) -> AppResult<(StatusCode, Json<ApiResponse<Member>>)> {
    let member = state.services.members.create_member(request).await?;
    Ok((StatusCode::CREATED, ApiResponse::new("Member created", member)))
}

#[utoipa::path(
    put,
    path = "/anggota/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(changes): ValidatedJson<UpdateMember>,
) -> AppResult<Json<ApiResponse<Member>>> {
    let member = state.services.members.update_member(id, changes).await?;
    Ok(ApiResponse::new("Member updated", member))
}

#[utoipa::path(
    delete,
    path = "/anggota/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member deleted"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Member has open loans")
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.members.delete_member(id).await?;
    Ok(ApiResponse::message("Member deleted"))
}
