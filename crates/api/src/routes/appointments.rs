use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/appointments",
            get(handlers::appointments::list_appointments)
                .post(handlers::appointments::book_appointment),
        )
        .route(
            "/api/appointments/assign",
            post(handlers::appointments::assign_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            patch(handlers::appointments::cancel_appointment),
        )
        .route(
            "/api/appointments/:id/reassign",
            patch(handlers::appointments::reassign_appointment),
        )
        .route(
            "/api/appointments/:id",
            delete(handlers::appointments::delete_appointment),
        )
}
