//! Token-pinned dispatcher for the Salesforce data API.
//!
//! [`CrmClient`] is shared by every route. Each inbound request obtains a [`SignedCrm`] bound to
//! the token the middleware acquired for it, so one request never signs a call with another
//! request's token. Under [`RefreshPolicy::Cached`] a `401` drops the token from the session store
//! and the call is replayed once with a fresh one; otherwise upstream failures are returned as-is.

// crates.io
use reqwest::{Method, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::RefreshPolicy,
	crm::{BatchResponse, CompositeBatch, CreateResponse, QueryResult, RecordId, SObjectName, Soql},
	error::{ConfigError, TransportError},
	http,
	obs::{self, OpSpan, Operation, Outcome},
	session::{SessionStore, SessionToken},
	signer::{BearerSigner, RequestSigner},
};

const TARGET: &str = "Salesforce data API";

/// Shared entry point to the data API.
#[derive(Debug)]
pub struct CrmClient {
	http_client: ReqwestClient,
	data_base: Url,
	api_version: String,
	session: Arc<SessionStore>,
	signer: BearerSigner,
}
impl CrmClient {
	/// Creates a dispatcher rooted at `{instance}/services/data/{api_version}/`.
	pub fn new(
		http_client: ReqwestClient,
		instance_url: &Url,
		api_version: impl Into<String>,
		session: Arc<SessionStore>,
	) -> Result<Self, ConfigError> {
		let api_version = api_version.into();
		let mut data_base = instance_url.clone();

		data_base
			.path_segments_mut()
			.map_err(|_| ConfigError::CannotBeABase { url: instance_url.to_string() })?
			.pop_if_empty()
			.extend(["services", "data", api_version.as_str(), ""]);

		Ok(Self { http_client, data_base, api_version, session, signer: BearerSigner })
	}

	/// Returns the data-API base URL (with trailing slash).
	pub fn data_base(&self) -> &Url {
		&self.data_base
	}

	/// Returns the session store backing this dispatcher.
	pub fn session(&self) -> &Arc<SessionStore> {
		&self.session
	}

	/// Instance-relative path of an sObject collection, as used inside composite requests.
	pub fn sobject_url(&self, object: &SObjectName) -> String {
		format!("/services/data/{}/sobjects/{object}", self.api_version)
	}

	/// Binds a handle to the token acquired for one inbound request.
	pub fn with_token(&self, token: SessionToken) -> SignedCrm<'_> {
		SignedCrm { crm: self, token: Mutex::new(token) }
	}

	fn endpoint(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.data_base.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::CannotBeABase { url: self.data_base.to_string() })?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}
}

/// Data-API handle pinned to one request's session token.
#[derive(Debug)]
pub struct SignedCrm<'a> {
	crm: &'a CrmClient,
	token: Mutex<SessionToken>,
}
impl SignedCrm<'_> {
	/// Returns the token the next call will be signed with.
	pub fn token(&self) -> SessionToken {
		self.token.lock().clone()
	}

	/// Runs a SOQL query through the synchronous query endpoint.
	pub async fn query<T>(&self, soql: &Soql) -> Result<QueryResult<T>>
	where
		T: DeserializeOwned,
	{
		let mut url = self.crm.endpoint(&["query"])?;

		url.query_pairs_mut().append_pair("q", &soql.to_string());

		let value = self.dispatch("query", Method::GET, url, None).await?;

		http::decode(value)
	}

	/// Creates a record and returns the create envelope.
	pub async fn create(&self, object: &SObjectName, body: &Value) -> Result<CreateResponse> {
		let url = self.crm.endpoint(&["sobjects", object.as_str()])?;
		let value = self.dispatch("create", Method::POST, url, Some(body)).await?;

		http::decode(value)
	}

	/// Patches fields on an existing record.
	pub async fn update(&self, object: &SObjectName, id: &RecordId, body: &Value) -> Result<Value> {
		let url = self.crm.endpoint(&["sobjects", object.as_str(), id.as_str()])?;

		self.dispatch("update", Method::PATCH, url, Some(body)).await
	}

	/// Submits independent sub-requests in one round trip.
	pub async fn composite_batch(&self, batch: &CompositeBatch) -> Result<BatchResponse> {
		let url = self.crm.endpoint(&["composite", "batch"])?;
		let body = serde_json::to_value(batch).map_err(ConfigError::Serialize)?;
		let value = self.dispatch("composite_batch", Method::POST, url, Some(&body)).await?;

		http::decode(value)
	}

	async fn dispatch(
		&self,
		stage: &'static str,
		method: Method,
		url: Url,
		body: Option<&Value>,
	) -> Result<Value> {
		let span = OpSpan::new(Operation::Dispatch, stage);

		span.wrap(async {
			obs::record_operation(Operation::Dispatch, Outcome::Attempt);

			let payload =
				body.map(serde_json::to_vec).transpose().map_err(ConfigError::Serialize)?;
			let token = self.token();
			let result = self.send(&method, &url, payload.as_deref(), &token).await;
			let result = match result {
				Err(Error::Upstream { status: 401, .. })
					if matches!(self.crm.session.policy(), RefreshPolicy::Cached { .. }) =>
				{
					tracing::info!(stage, "data API rejected cached token; replaying once");

					self.crm.session.invalidate(&token);

					let fresh = self.crm.session.acquire().await?;

					*self.token.lock() = fresh.clone();

					self.send(&method, &url, payload.as_deref(), &fresh).await
				},
				other => other,
			};

			match &result {
				Ok(_) => obs::record_operation(Operation::Dispatch, Outcome::Success),
				Err(err) => {
					obs::record_operation(Operation::Dispatch, Outcome::Failure);
					tracing::warn!(stage, status = ?err.upstream_status(), error = %err, "data API call failed");
				},
			}

			result
		})
		.await
	}

	async fn send(
		&self,
		method: &Method,
		url: &Url,
		payload: Option<&[u8]>,
		token: &SessionToken,
	) -> Result<Value> {
		let mut request = self.crm.http_client.request(method.clone(), url.clone());

		if let Some(payload) = payload {
			request = request.header(CONTENT_TYPE, "application/json").body(payload.to_vec());
		}

		let response = self
			.crm
			.signer
			.sign(request, token)
			.send()
			.await
			.map_err(|e| TransportError::network(TARGET, e))?;

		http::read_json(TARGET, response).await
	}
}
