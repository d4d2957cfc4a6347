//! Session token issued by the identity provider.

// self
use crate::{_prelude::*, session::Secret};

/// Bearer credential presented on every data-API call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionToken {
	/// Bearer secret.
	pub access_token: Secret,
	/// Instance URL reported by the token endpoint, if any.
	pub instance_url: Option<Url>,
	/// Identity URL of the integration user, if any.
	pub identity: Option<String>,
	/// Local instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Instant after which the token is no longer reused; `None` means single-use.
	pub expires_at: Option<OffsetDateTime>,
}
impl SessionToken {
	/// Creates a token issued now with no expiry bookkeeping.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self {
			access_token: Secret::new(access_token),
			instance_url: None,
			identity: None,
			issued_at: OffsetDateTime::now_utc(),
			expires_at: None,
		}
	}

	/// Overrides the issue instant.
	pub fn with_issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Sets the reuse deadline to `issued_at + lifetime`.
	pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
		self.expires_at = Some(self.issued_at + lifetime);

		self
	}

	/// Returns `true` when the token may be reused at `now` with `skew` of headroom.
	pub fn is_reusable_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		match self.expires_at {
			Some(expires_at) => now + skew < expires_at,
			None => false,
		}
	}

	/// Formats the `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}

	/// Returns `true` when both values carry the same bearer secret.
	pub fn same_secret(&self, other: &Self) -> bool {
		self.access_token == other.access_token
	}
}
