use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use slotbook_core::{
    errors::BookingError,
    models::{
        appointment::{
            AppointmentView, AssignAppointmentRequest, BookAppointmentRequest,
            DeleteAppointmentResponse, ReassignAppointmentRequest,
        },
        user::Role,
    },
};
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::AuthUser, error_handling::AppError},
};

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    pub student_id: Option<Uuid>,
}

fn require_field(value: Option<Uuid>, field: &str) -> Result<Uuid, AppError> {
    value.ok_or_else(|| AppError(BookingError::Validation(format!("{} is required", field))))
}

/// Students see their own appointments, staff those on their slots, admins
/// everything (optionally narrowed with `?student_id=`).
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    let appointments = state
        .ledger
        .list_appointments(&caller, query.student_id)
        .await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentView>), AppError> {
    caller.require_role(&[Role::Student])?;
    let Json(request) = payload?;
    let slot_id = require_field(request.slot_id, "slot_id")?;

    let appointment = state.ledger.book(caller.user_id, slot_id).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn assign_appointment(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<AssignAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentView>), AppError> {
    caller.require_admin()?;
    let Json(request) = payload?;
    let slot_id = require_field(request.slot_id, "slot_id")?;
    let student_id = require_field(request.student_id, "student_id")?;

    let appointment = state
        .ledger
        .admin_assign(&caller, slot_id, student_id)
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentView>, AppError> {
    let appointment = state.ledger.cancel(&caller, id).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn reassign_appointment(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<ReassignAppointmentRequest>, JsonRejection>,
) -> Result<Json<AppointmentView>, AppError> {
    caller.require_admin()?;
    let Json(request) = payload?;
    let student_id = require_field(request.student_id, "student_id")?;

    let appointment = state.ledger.reassign(&caller, id, student_id).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<ApiState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteAppointmentResponse>, AppError> {
    let deleted = state.ledger.delete_appointment(&caller, id).await?;
    Ok(Json(DeleteAppointmentResponse { id, deleted }))
}
