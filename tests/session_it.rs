mod common;

// crates.io
use axum::http::{Method, StatusCode};
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;

const LOGIN_QUERY: &str = "SELECT Id, Password__c, Is_Email_Verify__c, CHF_Account_Status__c, FirstName, LastName FROM Contact WHERE Email = 'nobody@example.org' LIMIT 1";

fn login_request() -> axum::http::Request<axum::body::Body> {
	request(
		Method::POST,
		"/api/auth/login",
		Some(json!({ "email": "nobody@example.org", "password": "secret" })),
	)
}

#[tokio::test]
async fn public_routes_never_touch_the_token_endpoint() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "tok-1").await;
	let app = app(&server, "every-request");
	let (status, body) = call(&app, request(Method::GET, "/health", None)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "message": "Server Health is Fine" }));

	let (status, body) = call(&app, request(Method::GET, "/", None)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["user"], "admin");

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn every_request_policy_mints_one_token_per_request() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "tok-1").await;
	let lookup = mock_query(&server, LOGIN_QUERY, "tok-1", json!([])).await;
	let app = app(&server, "every-request");

	for _ in 0..2 {
		let (status, body) = call(&app, login_request()).await;

		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["message"], "User not found");
	}

	token.assert_calls_async(2).await;
	lookup.assert_calls_async(2).await;
}

#[tokio::test]
async fn cached_policy_shares_one_token_across_concurrent_requests() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "tok-1").await;
	let lookup = mock_query(&server, LOGIN_QUERY, "tok-1", json!([])).await;
	let app = app(&server, "cached");
	let (first, second, third) =
		tokio::join!(call(&app, login_request()), call(&app, login_request()), call(&app, login_request()));

	for (status, _) in [first, second, third] {
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	let (status, _) = call(&app, login_request()).await;

	assert_eq!(status, StatusCode::NOT_FOUND);

	token.assert_calls_async(1).await;
	lookup.assert_calls_async(4).await;
}

#[tokio::test]
async fn token_failure_short_circuits_authenticated_routes() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"authentication failure\"}");
		})
		.await;
	let lookup = mock_query(&server, LOGIN_QUERY, "tok-1", json!([])).await;
	let app = app(&server, "every-request");
	let (status, body) = call(&app, login_request()).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body["message"], "Salesforce authentication error");
	assert!(
		!body.to_string().contains("invalid_grant"),
		"Provider reasons must stay in the logs."
	);

	token.assert_calls_async(1).await;
	lookup.assert_calls_async(0).await;
}

#[tokio::test]
async fn operator_refresh_reports_success_and_failure() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "tok-1").await;
	let app = app(&server, "cached");
	let (status, body) = call(&app, request(Method::POST, "/internal/refresh-token", None)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["message"], "Access token refreshed successfully");

	token.assert_calls_async(1).await;

	let failing = MockServer::start_async().await;
	let rejected = failing
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let app = common::app(&failing, "cached");
	let (status, body) = call(&app, request(Method::POST, "/internal/refresh-token", None)).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body["message"], "Failed to refresh access token");
	assert!(body.get("error").is_some());

	rejected.assert_calls_async(1).await;
}
