mod common;

// crates.io
use axum::http::{Method, StatusCode};
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;
use donor_gateway::{link, password};

const HOUSEHOLD_QUERY: &str = "SELECT Id FROM RecordType WHERE Name = 'Household Account' LIMIT 1";
const LOGIN_QUERY: &str = "SELECT Id, Password__c, Is_Email_Verify__c, CHF_Account_Status__c, FirstName, LastName FROM Contact WHERE Email = 'jane@example.org' LIMIT 1";

fn login_row(status: &str, verified: bool, stored_password: &str) -> serde_json::Value {
	json!([{
		"attributes": { "type": "Contact" },
		"Id": "003000000000001",
		"Password__c": stored_password,
		"Is_Email_Verify__c": verified,
		"CHF_Account_Status__c": status,
		"FirstName": "Jane",
		"LastName": "Doe",
	}])
}

fn login_request(password: &str) -> axum::http::Request<axum::body::Body> {
	request(
		Method::POST,
		"/api/auth/login",
		Some(json!({ "email": "jane@example.org", "password": password })),
	)
}

#[tokio::test]
async fn register_rejects_mismatched_passwords_without_data_calls() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let household = mock_query(&server, HOUSEHOLD_QUERY, "tok-1", json!([])).await;
	let create = mock_create(&server, "Contact", "003000000000001").await;
	let app = app(&server, "every-request");
	let (status, body) = call(
		&app,
		request(
			Method::POST,
			"/api/auth/register",
			Some(json!({
				"firstname": "Jane",
				"lastname": "Doe",
				"emailid": "jane@example.org",
				"usernumber": "5125550100",
				"userpwd": "one",
				"userconfirmPassword": "two",
			})),
		),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["message"], "Passwords do not match");

	household.assert_calls_async(0).await;
	create.assert_calls_async(0).await;
}

#[tokio::test]
async fn register_creates_contact_with_hashed_password_and_activation_link() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let household = mock_query(
		&server,
		HOUSEHOLD_QUERY,
		"tok-1",
		json!([{ "attributes": { "type": "RecordType" }, "Id": "012000000000001" }]),
	)
	.await;
	let existing = mock_query(
		&server,
		"SELECT Id FROM Contact WHERE Account.RecordTypeId = '012000000000001' AND Email = 'jane@example.org' LIMIT 1",
		"tok-1",
		json!([]),
	)
	.await;
	let create = mock_create(&server, "Contact", "003000000000001").await;
	let app = app(&server, "every-request");
	let (status, body) = call(
		&app,
		request(
			Method::POST,
			"/api/auth/register",
			Some(json!({
				"firstname": "Jane",
				"lastname": "Doe",
				"emailid": "jane@example.org",
				"usernumber": "5125550100",
				"userpwd": "correct horse",
				"userconfirmPassword": "correct horse",
			})),
		),
	)
	.await;

	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(body["success"], true);
	assert_eq!(body["data"]["id"], "003000000000001");

	let activation = body["activationLink"].as_str().expect("Activation link should be a string.");
	let prefix = format!("https://portal.example.org/activate/{}/", link::encode_email("jane@example.org"));

	assert!(activation.starts_with(&prefix), "Unexpected activation link {activation}.");

	household.assert_async().await;
	existing.assert_async().await;
	create.assert_async().await;
}

#[tokio::test]
async fn register_rejects_existing_household_email() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _household = mock_query(
		&server,
		HOUSEHOLD_QUERY,
		"tok-1",
		json!([{ "Id": "012000000000001" }]),
	)
	.await;
	let _existing = mock_query(
		&server,
		"SELECT Id FROM Contact WHERE Account.RecordTypeId = '012000000000001' AND Email = 'jane@example.org' LIMIT 1",
		"tok-1",
		json!([{ "Id": "003000000000001" }]),
	)
	.await;
	let create = mock_create(&server, "Contact", "003000000000002").await;
	let app = app(&server, "every-request");
	let (status, body) = call(
		&app,
		request(
			Method::POST,
			"/api/auth/register",
			Some(json!({
				"emailid": "jane@example.org",
				"userpwd": "pw",
				"userconfirmPassword": "pw",
			})),
		),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["message"], "Email already exists");

	create.assert_calls_async(0).await;
}

#[tokio::test]
async fn login_requires_approved_and_verified_account() {
	let hash = password::hash_password("correct horse").expect("Hashing should succeed.");

	for (status, verified) in [("Pending", true), ("Approve", false)] {
		let server = MockServer::start_async().await;
		let _token = mock_token(&server, "tok-1").await;
		let _lookup = mock_query(&server, LOGIN_QUERY, "tok-1", login_row(status, verified, &hash)).await;
		let app = app(&server, "every-request");
		let (code, body) = call(&app, login_request("correct horse")).await;

		assert_eq!(code, StatusCode::FORBIDDEN, "{status}/{verified} should be forbidden.");
		assert_eq!(body["message"], "Account not verified or approved");
	}
}

#[tokio::test]
async fn login_verifies_password_and_returns_profile() {
	let hash = password::hash_password("correct horse").expect("Hashing should succeed.");
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _lookup = mock_query(&server, LOGIN_QUERY, "tok-1", login_row("Approve", true, &hash)).await;
	let app = app(&server, "every-request");
	let (status, body) = call(&app, login_request("wrong")).await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["message"], "Invalid credentials");

	let (status, body) = call(&app, login_request("correct horse")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["success"], true);
	assert_eq!(
		body["data"],
		json!({
			"userId": "003000000000001",
			"email": "jane@example.org",
			"firstName": "Jane",
			"lastName": "Doe",
		})
	);
}

#[tokio::test]
async fn legacy_password_is_rehashed_on_login() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _lookup =
		mock_query(&server, LOGIN_QUERY, "tok-1", login_row("Approve", true, &link::encode_email("legacy"))).await;
	let upgrade = mock_update(&server, "Contact", "003000000000001").await;
	let app = app(&server, "every-request");
	let (status, _) = call(&app, login_request("legacy")).await;

	assert_eq!(status, StatusCode::OK);

	upgrade.assert_calls_async(1).await;
}

#[tokio::test]
async fn activation_marks_email_verified_once() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _lookup = mock_query(
		&server,
		"SELECT Id, Is_Email_Verify__c FROM Contact WHERE Email = 'jane@example.org' LIMIT 1",
		"tok-1",
		json!([{ "Id": "003000000000001", "Is_Email_Verify__c": false }]),
	)
	.await;
	let verify = mock_update(&server, "Contact", "003000000000001").await;
	let app = app(&server, "every-request");
	let uri = format!("/activate/{}/ignored", link::encode_email("jane@example.org"));
	let (status, body) = call(&app, request(Method::GET, &uri, None)).await;

	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(body["message"], "Email activation successful");

	verify.assert_calls_async(1).await;

	let (status, body) = call(&app, request(Method::GET, "/activate/%25%25%25/ignored", None)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "message": "Invalid link.", "success": false }));
}

const RESET_LOOKUP: &str = "SELECT Id FROM Contact WHERE Email = 'jane@example.org' LIMIT 1";
const CHECK_EMAIL_QUERY: &str = "SELECT Id, CHF_Account_Status__c, Is_Email_Verify__c FROM Contact WHERE Email = 'jane@example.org' AND Account.RecordTypeId = '012000000000001' LIMIT 1";

async fn mock_household_type(server: &MockServer) -> httpmock::Mock<'_> {
	mock_query(server, HOUSEHOLD_QUERY, "tok-1", json!([{ "Id": "012000000000001" }])).await
}

fn check_email_request() -> axum::http::Request<axum::body::Body> {
	request(Method::POST, "/api/auth/check-email", Some(json!({ "forgot_email": "jane@example.org" })))
}

#[tokio::test]
async fn register_accepts_numeric_phone() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _household = mock_household_type(&server).await;
	let _existing = mock_query(
		&server,
		"SELECT Id FROM Contact WHERE Account.RecordTypeId = '012000000000001' AND Email = 'jane@example.org' LIMIT 1",
		"tok-1",
		json!([]),
	)
	.await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{API}/sobjects/Contact"))
				.is_true(|req| json_body(req)["Phone"] == "5125550100");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"id\":\"003000000000001\",\"success\":true,\"errors\":[]}");
		})
		.await;
	let app = app(&server, "every-request");
	let (status, body) = call(
		&app,
		request(
			Method::POST,
			"/api/auth/register",
			Some(json!({
				"firstname": "Jane",
				"lastname": "Doe",
				"emailid": "jane@example.org",
				"usernumber": 5125550100_u64,
				"userpwd": "pw",
				"userconfirmPassword": "pw",
			})),
		),
	)
	.await;

	assert_eq!(status, StatusCode::CREATED, "Unexpected body {body}.");

	create.assert_calls_async(1).await;
}

#[tokio::test]
async fn bodies_without_content_type_still_reach_the_handler() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let lookup = mock_query(&server, LOGIN_QUERY, "tok-1", json!([])).await;
	let app = app(&server, "every-request");
	let request = axum::http::Request::builder()
		.method(Method::POST)
		.uri("/api/auth/login")
		.body(axum::body::Body::from(
			json!({ "email": "jane@example.org", "password": "pw" }).to_string(),
		))
		.expect("Request should build.");
	let (status, body) = call(&app, request).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["message"], "User not found");

	lookup.assert_calls_async(1).await;
}

#[tokio::test]
async fn malformed_bodies_get_the_json_envelope() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let lookup = mock_query(&server, LOGIN_QUERY, "tok-1", json!([])).await;
	let app = app(&server, "every-request");
	let request = axum::http::Request::builder()
		.method(Method::POST)
		.uri("/api/auth/login")
		.header("content-type", "application/json")
		.body(axum::body::Body::from("{\"email\":"))
		.expect("Request should build.");
	let (status, body) = call(&app, request).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["success"], false);
	assert!(body["message"].is_string());

	lookup.assert_calls_async(0).await;
}

#[tokio::test]
async fn check_email_rejects_locked_and_unverified_members() {
	for (status, verified, message) in
		[("Reject", true, "User is locked"), ("Approve", false, "Email not verified")]
	{
		let server = MockServer::start_async().await;
		let _token = mock_token(&server, "tok-1").await;
		let _household = mock_household_type(&server).await;
		let _lookup = mock_query(
			&server,
			CHECK_EMAIL_QUERY,
			"tok-1",
			json!([{ "Id": "003000000000001", "CHF_Account_Status__c": status, "Is_Email_Verify__c": verified }]),
		)
		.await;
		let patch = mock_update(&server, "Contact", "003000000000001").await;
		let app = app(&server, "every-request");
		let (code, body) = call(&app, check_email_request()).await;

		assert_eq!(code, StatusCode::FORBIDDEN);
		assert_eq!(body["message"], message);

		patch.assert_calls_async(0).await;
	}
}

#[tokio::test]
async fn check_email_stores_reset_link() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _household = mock_household_type(&server).await;
	let _lookup = mock_query(
		&server,
		CHECK_EMAIL_QUERY,
		"tok-1",
		json!([{ "Id": "003000000000001", "CHF_Account_Status__c": "Approve", "Is_Email_Verify__c": true }]),
	)
	.await;
	let prefix = format!(
		"https://portal.example.org/reset-password/{}/",
		link::encode_email("jane@example.org")
	);
	let expected_prefix = prefix.clone();
	let patch = server
		.mock_async(|when, then| {
			when.method(PATCH).path(format!("{API}/sobjects/Contact/003000000000001")).is_true(
				move |req| {
					json_body(req)["Reset_Pwd_Link__c"]
						.as_str()
						.is_some_and(|link| link.starts_with(&expected_prefix))
				},
			);
			then.status(204);
		})
		.await;
	let app = app(&server, "every-request");
	let (status, body) = call(&app, check_email_request()).await;

	assert_eq!(status, StatusCode::OK);
	assert!(body["link"].as_str().is_some_and(|link| link.starts_with(&prefix)));

	patch.assert_calls_async(1).await;
}

#[tokio::test]
async fn password_routes_reject_mismatch_without_data_calls() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let lookup = mock_query(&server, RESET_LOOKUP, "tok-1", json!([])).await;
	let app = app(&server, "every-request");

	for path in ["/api/auth/reset-password", "/api/auth/forgot-password"] {
		let (status, body) = call(
			&app,
			request(
				Method::POST,
				path,
				Some(json!({
					"email": "jane@example.org",
					"uidb64": link::encode_email("jane@example.org"),
					"newPassword": "one",
					"confirmPassword": "two",
				})),
			),
		)
		.await;

		assert_eq!(status, StatusCode::BAD_REQUEST, "{path} should reject.");
		assert_eq!(body["message"], "Passwords do not match");
	}

	lookup.assert_calls_async(0).await;
}

#[tokio::test]
async fn reset_password_stores_argon2_hash() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _lookup =
		mock_query(&server, RESET_LOOKUP, "tok-1", json!([{ "Id": "003000000000001" }])).await;
	let patch = server
		.mock_async(|when, then| {
			when.method(PATCH).path(format!("{API}/sobjects/Contact/003000000000001")).is_true(|req| {
				json_body(req)["Password__c"].as_str().is_some_and(|hash| hash.starts_with("$argon2"))
			});
			then.status(204);
		})
		.await;
	let app = app(&server, "every-request");
	let (status, body) = call(
		&app,
		request(
			Method::POST,
			"/api/auth/reset-password",
			Some(json!({
				"email": "jane@example.org",
				"newPassword": "correct horse",
				"confirmPassword": "correct horse",
			})),
		),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["message"], "Password reset successful");

	patch.assert_calls_async(1).await;
}

#[tokio::test]
async fn password_routes_report_unknown_contacts() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _lookup = mock_query(&server, RESET_LOOKUP, "tok-1", json!([])).await;
	let app = app(&server, "every-request");
	let (status, body) = call(
		&app,
		request(
			Method::POST,
			"/api/auth/reset-password",
			Some(json!({ "email": "jane@example.org", "newPassword": "pw", "confirmPassword": "pw" })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["message"], "Invalid credentials");

	let (status, body) = call(
		&app,
		request(
			Method::POST,
			"/api/auth/forgot-password",
			Some(json!({
				"uidb64": link::encode_email("jane@example.org"),
				"newPassword": "pw",
				"confirmPassword": "pw",
			})),
		),
	)
	.await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["message"], "Invalid reset link");
}

#[tokio::test]
async fn forgot_password_rejects_undecodable_link() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let lookup = mock_query(&server, RESET_LOOKUP, "tok-1", json!([])).await;
	let app = app(&server, "every-request");
	let (status, body) = call(
		&app,
		request(
			Method::POST,
			"/api/auth/forgot-password",
			Some(json!({ "uidb64": "!!!", "newPassword": "pw", "confirmPassword": "pw" })),
		),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["message"], "Invalid reset link");

	lookup.assert_calls_async(0).await;
}
