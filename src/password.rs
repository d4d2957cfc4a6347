//! Member password storage.
//!
//! New values are Argon2id PHC strings. Records written before hashing was introduced hold the
//! Base64 of the clear text; [`verify_password`] still accepts those and reports that the stored
//! value should be upgraded.

// crates.io
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
// self
use crate::_prelude::*;

/// Password hashing failure.
#[derive(Debug, ThisError)]
pub enum PasswordError {
	/// The hasher rejected its input or parameters.
	#[error("Password could not be hashed: {0}.")]
	Hash(String),
}

/// Result of checking a candidate password against a stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
	/// The candidate does not match.
	Mismatch,
	/// The candidate matches an Argon2id hash.
	Match,
	/// The candidate matches a legacy Base64 value that should be re-hashed.
	LegacyMatch,
}
impl Verification {
	/// Whether the candidate was accepted.
	pub fn is_match(self) -> bool {
		!matches!(self, Verification::Mismatch)
	}
}

/// Hashes `password` with Argon2id and a fresh 16-byte salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
	let mut salt = [0_u8; 16];

	rand::rng().fill_bytes(&mut salt);

	let salt = SaltString::encode_b64(&salt).map_err(|e| PasswordError::Hash(e.to_string()))?;

	Argon2::default()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Checks `candidate` against a stored PHC string or legacy Base64 value.
pub fn verify_password(candidate: &str, stored: &str) -> Verification {
	let stored = stored.trim();

	if stored.starts_with('$') {
		return match PasswordHash::new(stored) {
			Ok(hash) if Argon2::default().verify_password(candidate.as_bytes(), &hash).is_ok() =>
				Verification::Match,
			_ => Verification::Mismatch,
		};
	}

	match STANDARD.decode(stored) {
		Ok(clear) if !stored.is_empty() && clear == candidate.as_bytes() => Verification::LegacyMatch,
		_ => Verification::Mismatch,
	}
}

/// Random throwaway password used for accounts created on someone else's behalf.
pub fn random_password() -> Result<String, PasswordError> {
	let mut clear = [0_u8; 24];

	rand::rng().fill_bytes(&mut clear);

	hash_password(&STANDARD.encode(clear))
}
