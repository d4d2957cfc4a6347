//! Session middleware for authenticated routes.

// crates.io
use axum::{
	extract::{Request, State},
	http::StatusCode,
	middleware::Next,
	response::{IntoResponse, Response},
};
use serde_json::json;
// self
use crate::api::{AppState, Reply};

/// Acquires the session token and stores it in the request extensions before the handler runs.
///
/// Fails the request with `500 {message: "Salesforce authentication error", error}` when no
/// token can be obtained.
pub async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
	match state.crm.session().acquire().await {
		Ok(token) => {
			request.extensions_mut().insert(token);

			next.run(request).await
		},
		Err(err) => {
			tracing::error!(error = %err, path = %request.uri().path(), "session token unavailable");

			Reply::new(
				StatusCode::INTERNAL_SERVER_ERROR,
				json!({ "message": "Salesforce authentication error", "error": err.to_json() }),
			)
			.into_response()
		},
	}
}
