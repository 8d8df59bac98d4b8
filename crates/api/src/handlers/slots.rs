use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use slotbook_core::models::{
    slot::{CreateSlotRequest, DeleteSlotResponse, SlotView},
    user::Role,
};
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::AuthUser, error_handling::AppError},
};

/// Every slot with its live booking count. Public.
#[axum::debug_handler]
pub async fn list_slots(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<SlotView>>, AppError> {
    let slots = state.ledger.list_slots().await?;
    Ok(Json(slots))
}

#[axum::debug_handler]
pub async fn get_slot(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SlotView>, AppError> {
    let slot = state.ledger.get_slot(id).await?;
    Ok(Json(slot))
}

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<CreateSlotRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SlotView>), AppError> {
    caller.require_role(&[Role::Staff, Role::Admin])?;
    let Json(request) = payload?;

    let slot = state.ledger.create_slot(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// Removes the slot and every appointment on it.
#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteSlotResponse>, AppError> {
    let deleted = state.ledger.delete_slot(&caller, id).await?;
    Ok(Json(deleted))
}
