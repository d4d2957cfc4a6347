//! Request-body extraction with portal-friendly failures.

// crates.io
use axum::{
	async_trait,
	body::Bytes,
	extract::{FromRequest, Request},
	http::StatusCode,
};
use serde::{Deserializer, de::DeserializeOwned};
// self
use crate::{_prelude::*, api::Reply};

/// JSON body extractor.
///
/// The body is parsed whatever its `Content-Type`; an empty body reads as `{}`. Failures answer
/// `400 {message, success: false}` instead of axum's plain-text rejections.
#[derive(Clone, Debug)]
pub struct JsonBody<T>(pub T);
#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
	S: Send + Sync,
	T: DeserializeOwned,
{
	type Rejection = Reply;

	async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
		let bytes = Bytes::from_request(request, state)
			.await
			.map_err(|rejection| Reply::rejected(StatusCode::BAD_REQUEST, &rejection.body_text()))?;

		parse_body(&bytes).map(Self)
	}
}

/// Parses a request body, reporting the JSON path of the first mismatch.
pub fn parse_body<T>(bytes: &[u8]) -> Result<T, Reply>
where
	T: DeserializeOwned,
{
	let bytes = if bytes.iter().all(u8::is_ascii_whitespace) { b"{}".as_slice() } else { bytes };
	let mut de = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut de).map_err(|err| {
		let path = err.path().to_string();

		tracing::debug!(%path, error = %err.inner(), "request body rejected");

		Reply::rejected(StatusCode::BAD_REQUEST, &format!("Invalid request body at `{path}`."))
	})
}

/// Reads a string field that portals sometimes send as a number or boolean; `null` reads as `""`.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::String(text) => text,
		Value::Null => String::new(),
		Value::Number(number) => number.to_string(),
		Value::Bool(flag) => flag.to_string(),
		other => other.to_string(),
	})
}
