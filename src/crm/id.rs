//! Validated Salesforce names used in URL paths and query text.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::{_prelude::*, crm::QueryError};

macro_rules! def_name {
	($name:ident, $doc:literal, $validate:ident) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new value after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, QueryError> {
				let view = value.as_ref().trim();

				$validate(view)?;

				Ok(Self(view.to_owned()))
			}

			/// Returns the validated text.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = QueryError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!(stringify!($name), "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = QueryError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const NAME_MAX_LEN: usize = 80;

def_name!(RecordId, "Salesforce record identifier (15 or 18 ASCII alphanumerics).", validate_record_id);
def_name!(SObjectName, "API name of an sObject such as `Contact` or `Newsletter__c`.", validate_sobject);
def_name!(FieldPath, "Field API name, optionally a dotted relationship path.", validate_field_path);

impl SObjectName {
	/// Wraps a compile-time object name the gateway itself uses.
	pub(crate) fn known(name: &'static str) -> Self {
		debug_assert!(is_identifier(name), "`{name}` is not an sObject name");

		Self(name.to_owned())
	}
}

fn validate_record_id(view: &str) -> Result<(), QueryError> {
	let valid =
		matches!(view.len(), 15 | 18) && view.bytes().all(|byte| byte.is_ascii_alphanumeric());

	if valid { Ok(()) } else { Err(QueryError::InvalidRecordId { value: view.to_owned() }) }
}

fn validate_sobject(view: &str) -> Result<(), QueryError> {
	if is_identifier(view) {
		Ok(())
	} else {
		Err(QueryError::InvalidName { kind: "sObject", value: view.to_owned() })
	}
}

fn validate_field_path(view: &str) -> Result<(), QueryError> {
	if !view.is_empty() && view.split('.').all(is_identifier) {
		Ok(())
	} else {
		Err(QueryError::InvalidName { kind: "field", value: view.to_owned() })
	}
}

fn is_identifier(view: &str) -> bool {
	let mut bytes = view.bytes();

	match bytes.next() {
		Some(first) if first.is_ascii_alphabetic() => {},
		_ => return false,
	}

	view.len() <= NAME_MAX_LEN && bytes.all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_ids_accept_short_and_long_forms() {
		assert!(RecordId::new("0035g00000AbCdE").is_ok());
		assert!(RecordId::new("0035g00000AbCdEAAZ").is_ok());
		assert_eq!(RecordId::new(" 0035g00000AbCdE ").map(String::from).ok().as_deref(), Some("0035g00000AbCdE"));

		for bad in ["", "0035g00000AbCd", "0035g00000AbCdEA", "0035g00000AbCd'", "0035g00000AbCdE/../x"] {
			assert!(
				matches!(RecordId::new(bad), Err(QueryError::InvalidRecordId { .. })),
				"{bad:?} should be rejected."
			);
		}
	}

	#[test]
	fn names_follow_identifier_grammar() {
		assert!(SObjectName::new("DonationSummary__c").is_ok());
		assert!(FieldPath::new("Account.RecordType.Name").is_ok());
		assert!(SObjectName::new("Contact WHERE").is_err());
		assert!(SObjectName::new("1Contact").is_err());
		assert!(FieldPath::new("Account..Id").is_err());
		assert!(FieldPath::new("Email'").is_err());
	}

	#[test]
	fn serde_round_trip_validates() {
		let id: RecordId =
			serde_json::from_str("\"001000000000001\"").expect("Valid id should deserialize.");

		assert_eq!(serde_json::to_string(&id).expect("Id should serialize."), "\"001000000000001\"");
		assert!(serde_json::from_str::<RecordId>("\"nope\"").is_err());
	}
}
