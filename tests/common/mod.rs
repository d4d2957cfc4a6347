//! Shared harness for route-level integration tests.

#![allow(dead_code)]

// std
use std::collections::HashMap;
// crates.io
use axum::{
	Router,
	body::Body,
	http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use httpmock::{HttpMockRequest, Mock, prelude::*};
use serde_json::Value;
use tower::ServiceExt;
// self
use donor_gateway::{
	api::{self, AppState},
	config::PortalConfig,
};

pub const API: &str = "/services/data/v57.0";
pub const TOKEN_PATH: &str = "/services/oauth2/token";

/// Loads a configuration pointing both Salesforce and Stripe at `server`.
pub fn config(server: &MockServer, policy: &str) -> PortalConfig {
	let base = server.base_url();
	let env = HashMap::from([
		("API_SALESFORCE_INSTATE", base.clone()),
		("API_SALESFORCE_CLIENT_ID", "client-id".to_owned()),
		("API_SALESFORCE_CLIENT_SECRET", "client-secret".to_owned()),
		("API_SALESFORCE_USER_NAME", "integration@acme.org".to_owned()),
		("API_SALESFORCE_USER_PASSWORD", "hunter2".to_owned()),
		("VITE_STRIPE_CLIENT_SECRET", "sk_test_123".to_owned()),
		("STRIPE_API_BASE", base),
		("DOMAIN", "portal.example.org".to_owned()),
		("LINK_SCHEME", "https".to_owned()),
		("TOKEN_REFRESH_POLICY", policy.to_owned()),
	]);

	PortalConfig::from_lookup(|key| env.get(key).cloned())
		.expect("Test configuration should load successfully.")
}

/// Builds the full router against `server` using the real password grant.
pub fn app(server: &MockServer, policy: &str) -> Router {
	let state = AppState::from_config(&config(server, policy))
		.expect("Application state should build successfully.");

	api::router(state)
}

/// Mocks a successful password grant issuing `access_token`.
pub async fn mock_token<'a>(server: &'a MockServer, access_token: &str) -> Mock<'a> {
	let body = serde_json::json!({
		"access_token": access_token,
		"instance_url": server.base_url(),
		"id": "https://login.salesforce.com/id/00D000000000001/005000000000001",
		"token_type": "Bearer",
		"issued_at": "1760000000000",
		"signature": "c2lnbmF0dXJl",
	})
	.to_string();

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

/// Mocks a SOQL query answered with `records`.
pub async fn mock_query<'a>(
	server: &'a MockServer,
	soql: &str,
	access_token: &str,
	records: Value,
) -> Mock<'a> {
	let body = serde_json::json!({
		"totalSize": records.as_array().map(Vec::len).unwrap_or_default(),
		"done": true,
		"records": records,
	})
	.to_string();
	let bearer = format!("Bearer {access_token}");

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{API}/query")).query_param("q", soql).header("authorization", bearer);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

/// Mocks a record create returning `id`.
pub async fn mock_create<'a>(server: &'a MockServer, object: &str, id: &str) -> Mock<'a> {
	let body = serde_json::json!({ "id": id, "success": true, "errors": [] }).to_string();

	server
		.mock_async(|when, then| {
			when.method(POST).path(format!("{API}/sobjects/{object}"));
			then.status(201).header("content-type", "application/json").body(body);
		})
		.await
}

/// Mocks a record patch answered with `204 No Content`.
pub async fn mock_update<'a>(server: &'a MockServer, object: &str, id: &str) -> Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(PATCH).path(format!("{API}/sobjects/{object}/{id}"));
			then.status(204);
		})
		.await
}

/// Decodes the JSON body a mock received; anything else reads as `null`.
pub fn json_body(request: &HttpMockRequest) -> Value {
	serde_json::from_slice(request.body_ref()).unwrap_or(Value::Null)
}

/// Builds a request with an optional JSON body.
pub fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
	let builder = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(body) => builder.header(CONTENT_TYPE, "application/json").body(Body::from(body.to_string())),
		None => builder.body(Body::empty()),
	};

	request.expect("Test request should build successfully.")
}

/// Drives one request through the router and decodes the JSON reply.
pub async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
	let response =
		app.clone().oneshot(request).await.expect("Router should always produce a response.");
	let status = response.status();
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should be readable.");
	let body = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Response body should be JSON.")
	};

	(status, body)
}
