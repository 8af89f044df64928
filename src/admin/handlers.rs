use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::backends::{BackendRegistry, BackendStatus};

pub async fn get_backends(State(registry): State<Arc<BackendRegistry>>) -> Json<Vec<BackendStatus>> {
    Json(registry.as_json())
}

/// Turn a handler panic into a plain 500.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %message, "Admin handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
