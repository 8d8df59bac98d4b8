use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use slotbook_core::models::user::{
    CreateUserRequest, DeleteUserResponse, Role, UpdateUserRequest, User,
};
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::AuthUser, error_handling::AppError},
};

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<String>,
}

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let role = query.role.as_deref().map(str::parse::<Role>).transpose()?;

    let users = state.ledger.list_users(&caller, role).await?;
    Ok(Json(users))
}

/// Staff members, for the admin's slot-owner picker.
#[axum::debug_handler]
pub async fn list_staff(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<User>>, AppError> {
    let staff = state.ledger.list_users(&caller, Some(Role::Staff)).await?;
    Ok(Json(staff))
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    caller.require_admin()?;
    let Json(request) = payload?;

    let user = state.ledger.create_user(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    caller.require_admin()?;
    let Json(request) = payload?;

    let user = state.ledger.update_user(&caller, id, request).await?;
    Ok(Json(user))
}

/// Deletes the user together with their appointments, their slots and the
/// appointments on those slots.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteUserResponse>, AppError> {
    let deleted = state.ledger.delete_user(&caller, id).await?;
    Ok(Json(deleted))
}
