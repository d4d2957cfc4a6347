//! Credential material that must stay out of logs.

// self
use crate::_prelude::*;

/// Shared, immutable secret; formatting never reveals it.
///
/// Clones share one allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Arc<str>);
impl Secret {
	/// Wraps a secret value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(Arc::from(value.into()))
	}

	/// Returns the raw value for placing on the wire.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Whether the secret is the empty string.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Secret(<redacted, {} bytes>)", self.0.len())
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
