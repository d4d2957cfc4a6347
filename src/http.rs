//! Shared HTTP plumbing for the token endpoint, the CRM data API, and the payment provider.
//!
//! One [`ReqwestClient`] is built at startup by [`build_client`] and cloned into every
//! component. Token exchanges go through [`InstrumentedHandle`], the `oauth2` adapter that
//! captures the status and `Retry-After` hint in a [`ResponseMetadataSlot`] so refresh
//! failures can be reported with the upstream status intact.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{
	Response,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Builds the process-wide HTTP client.
///
/// Redirects are never followed; an optional per-request timeout applies to every call.
pub fn build_client(timeout: Option<std::time::Duration>) -> Result<ReqwestClient, ConfigError> {
	let mut builder = ReqwestClient::builder().redirect(Policy::none());

	if let Some(timeout) = timeout {
		builder = builder.timeout(timeout);
	}

	Ok(builder.build()?)
}

/// Metadata captured from the most recent token-endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot shared between an [`InstrumentedHandle`] and the caller that reads it.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] adapter over reqwest that records response metadata.
#[derive(Clone)]
pub struct InstrumentedHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
impl InstrumentedHandle {
	/// Wraps `client`, publishing every response's metadata into `slot`.
	pub fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self { client, slot }
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response = self
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = parse_retry_after(&headers);

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let mut converted = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

/// Reads an upstream response into JSON.
///
/// A successful empty body becomes [`Value::Null`]. Non-success statuses become
/// [`Error::Upstream`] carrying the raw body (JSON when parseable, a string otherwise).
pub(crate) async fn read_json(target: &'static str, response: Response) -> Result<Value> {
	let status = response.status();
	let retry_after = parse_retry_after(response.headers());
	let bytes = response.bytes().await.map_err(|e| TransportError::network(target, e))?;

	if !status.is_success() {
		let body = serde_json::from_slice::<Value>(&bytes)
			.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

		tracing::debug!(target_api = target, status = status.as_u16(), "upstream call rejected");

		return Err(Error::Upstream { status: status.as_u16(), body, retry_after });
	}
	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(Value::Null);
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer).map_err(Error::decode)
}

/// Converts a JSON value into `T`, reporting the path of the first mismatch.
pub(crate) fn decode<T>(value: Value) -> Result<T>
where
	T: for<'de> Deserialize<'de>,
{
	serde_path_to_error::deserialize(value).map_err(Error::decode)
}

pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return Some(Duration::seconds(secs.max(0)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
