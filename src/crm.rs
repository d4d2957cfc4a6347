//! Salesforce data-API access: validated identifiers, the SOQL builder, wire models, and the
//! token-pinned dispatcher.

pub mod client;
pub mod id;
pub mod model;
pub mod soql;

pub use client::*;
pub use id::*;
pub use model::*;
pub use soql::*;

// self
use crate::_prelude::*;

/// Errors raised while turning caller input into a query or sObject path.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum QueryError {
	/// A record identifier was not 15 or 18 ASCII alphanumerics.
	#[error("`{value}` is not a valid record id.")]
	InvalidRecordId {
		/// Rejected input.
		value: String,
	},
	/// An sObject or field name contained characters outside the identifier grammar.
	#[error("`{value}` is not a valid {kind}.")]
	InvalidName {
		/// Identifier category (`sObject` or `field`).
		kind: &'static str,
		/// Rejected input.
		value: String,
	},
	/// A SELECT was requested without any field.
	#[error("A query must select at least one field.")]
	NoFields,
}
