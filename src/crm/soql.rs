//! Minimal SOQL builder.
//!
//! Only the shapes the portal needs are supported: a field list, one sObject, equality and
//! inequality filters joined by `AND`, and an optional `LIMIT`. Every name is validated and every
//! string literal is escaped, so caller input never reaches the query text verbatim.

// self
use crate::{
	_prelude::*,
	crm::{FieldPath, QueryError, RecordId, SObjectName},
};

/// Literal value on the right-hand side of a filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
	/// Quoted, escaped string.
	Text(String),
	/// `TRUE` / `FALSE`.
	Bool(bool),
	/// Quoted record identifier.
	Id(RecordId),
	/// `NULL`.
	Null,
}
impl Display for Literal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Literal::Text(text) => write!(f, "'{}'", escape_literal(text)),
			Literal::Bool(true) => f.write_str("TRUE"),
			Literal::Bool(false) => f.write_str("FALSE"),
			Literal::Id(id) => write!(f, "'{id}'"),
			Literal::Null => f.write_str("NULL"),
		}
	}
}
impl From<&str> for Literal {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
impl From<String> for Literal {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<&String> for Literal {
	fn from(value: &String) -> Self {
		Self::Text(value.clone())
	}
}
impl From<bool> for Literal {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<RecordId> for Literal {
	fn from(value: RecordId) -> Self {
		Self::Id(value)
	}
}
impl From<&RecordId> for Literal {
	fn from(value: &RecordId) -> Self {
		Self::Id(value.clone())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Comparison {
	Eq,
	Ne,
}
impl Comparison {
	fn as_str(self) -> &'static str {
		match self {
			Comparison::Eq => "=",
			Comparison::Ne => "!=",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Condition {
	field: FieldPath,
	comparison: Comparison,
	value: Literal,
}

/// A `SELECT ... FROM ... [WHERE ...] [LIMIT n]` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Soql {
	object: SObjectName,
	fields: Vec<FieldPath>,
	conditions: Vec<Condition>,
	limit: Option<u32>,
}
impl Soql {
	/// Starts a query selecting `fields` from `object`.
	pub fn select<I, S>(object: &str, fields: I) -> Result<Self, QueryError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let object = SObjectName::new(object)?;
		let fields = fields.into_iter().map(FieldPath::new).collect::<Result<Vec<_>, _>>()?;

		if fields.is_empty() {
			return Err(QueryError::NoFields);
		}

		Ok(Self { object, fields, conditions: Vec::new(), limit: None })
	}

	/// Adds `field = value`.
	pub fn where_eq(self, field: &str, value: impl Into<Literal>) -> Result<Self, QueryError> {
		self.push(field, Comparison::Eq, value.into())
	}

	/// Adds `field != value`.
	pub fn where_ne(self, field: &str, value: impl Into<Literal>) -> Result<Self, QueryError> {
		self.push(field, Comparison::Ne, value.into())
	}

	/// Caps the number of returned rows.
	pub fn limit(mut self, limit: u32) -> Self {
		self.limit = Some(limit);

		self
	}

	/// Returns the queried sObject.
	pub fn object(&self) -> &SObjectName {
		&self.object
	}

	fn push(
		mut self,
		field: &str,
		comparison: Comparison,
		value: Literal,
	) -> Result<Self, QueryError> {
		self.conditions.push(Condition { field: FieldPath::new(field)?, comparison, value });

		Ok(self)
	}
}
impl Display for Soql {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SELECT ")?;

		for (i, field) in self.fields.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}

			f.write_str(field)?;
		}

		write!(f, " FROM {}", self.object)?;

		for (i, condition) in self.conditions.iter().enumerate() {
			let keyword = if i == 0 { "WHERE" } else { "AND" };

			write!(
				f,
				" {keyword} {} {} {}",
				condition.field,
				condition.comparison.as_str(),
				condition.value
			)?;
		}

		if let Some(limit) = self.limit {
			write!(f, " LIMIT {limit}")?;
		}

		Ok(())
	}
}

/// Escapes `raw` for use inside a single-quoted SOQL string literal.
pub fn escape_literal(raw: &str) -> String {
	let mut escaped = String::with_capacity(raw.len());

	for ch in raw.chars() {
		match ch {
			'\\' => escaped.push_str("\\\\"),
			'\'' => escaped.push_str("\\'"),
			'"' => escaped.push_str("\\\""),
			'\n' => escaped.push_str("\\n"),
			'\r' => escaped.push_str("\\r"),
			'\t' => escaped.push_str("\\t"),
			'\u{8}' => escaped.push_str("\\b"),
			'\u{c}' => escaped.push_str("\\f"),
			other => escaped.push(other),
		}
	}

	escaped
}
