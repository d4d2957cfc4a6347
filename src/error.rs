//! Gateway-level error types shared by the session, dispatcher, and route layers.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// A query or path could not be built from the supplied input.
	#[error(transparent)]
	Query(#[from] crate::crm::QueryError),
	/// Password hashing failed.
	#[error(transparent)]
	Password(#[from] crate::password::PasswordError),

	/// The identity provider refused to issue a session token.
	#[error("Failed to refresh Salesforce access token.")]
	Authentication {
		/// HTTP status code returned by the token endpoint, when available.
		status: Option<u16>,
		/// Provider- or gateway-supplied reason string; kept for logs only.
		reason: String,
	},
	/// Upstream API responded with a non-success status.
	#[error("Upstream API responded with HTTP {status}.")]
	Upstream {
		/// HTTP status code returned by the upstream API.
		status: u16,
		/// Raw upstream error body (JSON when parseable, a string otherwise).
		body: Value,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Upstream API returned a success body that does not match the expected shape.
	#[error("Upstream response could not be decoded at `{path}`.")]
	Decode {
		/// JSON path of the first mismatch.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
}
impl Error {
	/// Returns the HTTP status carried by an upstream failure.
	pub fn upstream_status(&self) -> Option<u16> {
		match self {
			Self::Upstream { status, .. } => Some(*status),
			Self::Authentication { status, .. } => *status,
			_ => None,
		}
	}

	/// Renders the error as the JSON value handed back to portal clients.
	///
	/// Upstream failures are surfaced verbatim; everything else is reduced to its display text.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Upstream { body, .. } => body.clone(),
			other => serde_json::json!({ "message": other.to_string() }),
		}
	}

	pub(crate) fn decode(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = err.path().to_string();

		Self::Decode { path, source: err.into_inner() }
	}
}

/// Configuration and request-construction failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required environment variable is not set.
	#[error("Environment variable `{var}` is required.")]
	Missing {
		/// Variable name.
		var: &'static str,
	},
	/// An environment variable holds an unusable value.
	#[error("Environment variable `{var}` is invalid: {reason}.")]
	Invalid {
		/// Variable name.
		var: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// A configured endpoint cannot be parsed or joined.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The base URL cannot carry path segments (e.g. `mailto:`).
	#[error("Endpoint `{url}` cannot be used as a base URL.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Request payload could not be serialized.
	#[error("Request payload could not be serialized.")]
	Serialize(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Logical upstream being called (token endpoint, data API, payments).
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling an upstream API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(target: &'static str, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { target, source: Box::new(src) }
	}
}
