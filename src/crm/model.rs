//! Wire shapes shared by every data-API caller.

// self
use crate::_prelude::*;

/// Result envelope of the synchronous query endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
	/// Total number of matching rows.
	#[serde(default)]
	pub total_size: u64,
	/// Whether every row is contained in `records`.
	#[serde(default)]
	pub done: bool,
	/// Returned rows.
	pub records: Vec<T>,
}
impl<T> QueryResult<T> {
	/// Returns the first row, if any.
	pub fn first(&self) -> Option<&T> {
		self.records.first()
	}

	/// Consumes the envelope and returns the first row, if any.
	pub fn into_first(self) -> Option<T> {
		self.records.into_iter().next()
	}
}

/// Row carrying only its record id.
#[derive(Clone, Debug, Deserialize)]
pub struct IdRecord {
	/// Record id.
	#[serde(rename = "Id")]
	pub id: String,
}

/// Response to an sObject create.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateResponse {
	/// Id of the new record.
	pub id: String,
	/// Whether the create succeeded.
	#[serde(default)]
	pub success: bool,
	/// Field-level errors, if any.
	#[serde(default)]
	pub errors: Vec<Value>,
}

/// Payload of `POST composite/batch`.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeBatch {
	/// Sub-requests executed independently by the data API.
	pub batch_requests: Vec<BatchSubrequest>,
}
impl CompositeBatch {
	/// Number of sub-requests.
	pub fn len(&self) -> usize {
		self.batch_requests.len()
	}

	/// Whether the batch carries no sub-request.
	pub fn is_empty(&self) -> bool {
		self.batch_requests.is_empty()
	}
}

/// One entry of a [`CompositeBatch`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSubrequest {
	/// HTTP method.
	pub method: &'static str,
	/// Path relative to the instance, including `/services/data/{version}`.
	pub url: String,
	/// JSON body.
	pub rich_input: Value,
}

/// Response of `POST composite/batch`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
	/// Whether any sub-request failed.
	#[serde(default)]
	pub has_errors: bool,
	/// Per sub-request outcomes, in submission order.
	#[serde(default)]
	pub results: Vec<BatchResult>,
}

/// Outcome of one sub-request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
	/// HTTP status of the sub-request.
	pub status_code: u16,
	/// Body of the sub-request.
	#[serde(default)]
	pub result: Value,
}
impl BatchResult {
	/// Whether the sub-request succeeded.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status_code)
	}
}
