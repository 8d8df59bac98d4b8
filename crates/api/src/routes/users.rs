use axum::{
    Router,
    routing::{get, put},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/api/users/staff", get(handlers::users::list_staff))
        .route(
            "/api/users/:id",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
}
