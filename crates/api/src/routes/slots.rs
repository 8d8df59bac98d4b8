use axum::{
    Router,
    routing::get,
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/slots",
            get(handlers::slots::list_slots).post(handlers::slots::create_slot),
        )
        .route(
            "/api/slots/:id",
            get(handlers::slots::get_slot).delete(handlers::slots::delete_slot),
        )
}
