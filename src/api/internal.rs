//! Liveness, root, and operator routes.

// crates.io
use axum::{Json, extract::State, http::StatusCode};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{AppState, Reply},
};

/// `GET /health`.
pub async fn health() -> Json<Value> {
	Json(json!({ "message": "Server Health is Fine" }))
}

/// `GET /`.
pub async fn root() -> Json<Value> {
	Json(json!({ "user": "admin" }))
}

/// `POST /internal/refresh-token`: forces a new session token.
pub async fn refresh_token(State(state): State<AppState>) -> Reply {
	match state.crm.session().refresh().await {
		Ok(_) => Reply::message(StatusCode::OK, "Access token refreshed successfully"),
		Err(err) => Reply::new(
			StatusCode::INTERNAL_SERVER_ERROR,
			json!({ "message": "Failed to refresh access token", "error": err.to_json() }),
		),
	}
}
