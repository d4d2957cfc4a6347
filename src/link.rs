//! Activation and password-reset link munging.
//!
//! A link carries the Base64 of the member's email and a one-off SHA-256 token. Links are written
//! to the CRM and mailed from there; the gateway never stores or checks the token.

// crates.io
use base64::{
	Engine,
	engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, config::LinkConfig};

/// Failures while decoding the email segment of a link.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LinkError {
	/// The segment is not Base64 in any accepted alphabet.
	#[error("Link segment is not valid Base64.")]
	InvalidBase64,
	/// The decoded bytes are not UTF-8.
	#[error("Link segment does not decode to UTF-8 text.")]
	InvalidUtf8,
}

/// Standard, padded Base64 of the email's UTF-8 bytes.
pub fn encode_email(email: &str) -> String {
	STANDARD.encode(email.as_bytes())
}

/// Decodes an email segment in the standard or URL-safe alphabet, padded or not.
pub fn decode_email(segment: &str) -> Result<String, LinkError> {
	let segment = segment.trim();
	let bytes = [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
		.iter()
		.find_map(|engine| engine.decode(segment).ok())
		.ok_or(LinkError::InvalidBase64)?;

	String::from_utf8(bytes).map_err(|_| LinkError::InvalidUtf8)
}

/// Lowercase hex SHA-256 of the email followed by the decimal Unix seconds.
pub fn link_token(email: &str, unix_seconds: i64) -> String {
	let digest = Sha256::new()
		.chain_update(email.as_bytes())
		.chain_update(unix_seconds.to_string())
		.finalize();

	format!("{digest:x}")
}

/// Renders portal links for a configured scheme and domain.
#[derive(Clone, Debug)]
pub struct LinkBuilder {
	config: LinkConfig,
}
impl LinkBuilder {
	/// Wraps the public link settings.
	pub fn new(config: LinkConfig) -> Self {
		Self { config }
	}

	/// Base URL of the portal, e.g. `http://localhost:5173`.
	pub fn base_url(&self) -> String {
		format!("{}://{}", self.config.scheme, self.config.domain)
	}

	/// `{base}/activate/{b64}/{token}` issued at `now`.
	pub fn activation_link(&self, email: &str, now: OffsetDateTime) -> String {
		self.render("activate", email, now)
	}

	/// `{base}/reset-password/{b64}/{token}` issued at `now`.
	pub fn reset_link(&self, email: &str, now: OffsetDateTime) -> String {
		self.render("reset-password", email, now)
	}

	fn render(&self, route: &str, email: &str, now: OffsetDateTime) -> String {
		format!(
			"{}/{route}/{}/{}",
			self.base_url(),
			encode_email(email),
			link_token(email, now.unix_timestamp())
		)
	}
}
