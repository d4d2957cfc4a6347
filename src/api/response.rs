//! Response envelope shared by every handler.

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde_json::json;
// self
use crate::_prelude::*;

/// Status code plus JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
	/// HTTP status.
	pub status: StatusCode,
	/// JSON body.
	pub body: Value,
}
impl Reply {
	/// Arbitrary status and body.
	pub fn new(status: StatusCode, body: Value) -> Self {
		Self { status, body }
	}

	/// `200` with `body`.
	pub fn ok(body: Value) -> Self {
		Self::new(StatusCode::OK, body)
	}

	/// `201` with `body`.
	pub fn created(body: Value) -> Self {
		Self::new(StatusCode::CREATED, body)
	}

	/// `{message}` with the given status.
	pub fn message(status: StatusCode, message: &str) -> Self {
		Self::new(status, json!({ "message": message }))
	}

	/// `{message, success: false}` with the given status.
	pub fn rejected(status: StatusCode, message: &str) -> Self {
		Self::new(status, json!({ "message": message, "success": false }))
	}

	/// `500 {message, error, success: false}`.
	pub fn failure(message: &str, error: Value) -> Self {
		Self::new(
			StatusCode::INTERNAL_SERVER_ERROR,
			json!({ "message": message, "error": error, "success": false }),
		)
	}
}
impl IntoResponse for Reply {
	fn into_response(self) -> Response {
		(self.status, Json(self.body)).into_response()
	}
}

/// Collapses a handler outcome into a reply.
///
/// Invalid identifiers in caller input become `400`; every other error becomes a `500` envelope
/// carrying `failure` as the message and the error (raw upstream body when there is one).
pub fn respond(failure: &str, outcome: Result<Reply>) -> Reply {
	match outcome {
		Ok(reply) => reply,
		Err(Error::Query(err)) => Reply::rejected(StatusCode::BAD_REQUEST, &err.to_string()),
		Err(err) => {
			tracing::error!(error = %err, status = ?err.upstream_status(), "{failure}");

			Reply::failure(failure, err.to_json())
		},
	}
}
