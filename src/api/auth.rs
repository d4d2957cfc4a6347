//! Registration, login, activation, and password recovery.

// crates.io
use axum::{
	Extension,
	extract::{Path, State},
	http::StatusCode,
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{
		AppState, JsonBody, Reply,
		records::{self, CONTACT, HOUSEHOLD_RECORD_TYPE},
		response,
	},
	crm::{IdRecord, RecordId, SObjectName, SignedCrm, Soql},
	link,
	password::{self, Verification},
	session::SessionToken,
};

const APPROVED: &str = "Approve";
const LOCKED: &str = "Reject";

/// Body of `POST /api/auth/register`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
	pub firstname: String,
	pub lastname: String,
	pub emailid: String,
	#[serde(deserialize_with = "crate::api::extract::text")]
	pub usernumber: String,
	pub userpwd: String,
	pub userconfirm_password: String,
}

/// Body of `POST /api/auth/login`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
	pub email: String,
	pub password: String,
}

/// Body of `POST /api/auth/check-email`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckEmailRequest {
	pub forgot_email: String,
}

/// Body of `POST /api/auth/reset-password` and `POST /api/auth/forgot-password`.
///
/// The reset route identifies the member by `email`, the forgot route by the Base64 `uidb64`
/// segment of a reset link.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewPasswordRequest {
	pub email: String,
	pub uidb64: String,
	pub new_password: String,
	pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoginRow {
	id: String,
	#[serde(default, rename = "Password__c")]
	password: Option<String>,
	#[serde(default, rename = "Is_Email_Verify__c")]
	email_verified: bool,
	#[serde(default, rename = "CHF_Account_Status__c")]
	status: Option<String>,
	#[serde(default)]
	first_name: Option<String>,
	#[serde(default)]
	last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VerificationRow {
	id: String,
	#[serde(default, rename = "Is_Email_Verify__c")]
	email_verified: bool,
	#[serde(default, rename = "CHF_Account_Status__c")]
	status: Option<String>,
}

/// `POST /api/auth/register`.
pub async fn register(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<RegisterRequest>,
) -> Reply {
	if body.userpwd != body.userconfirm_password {
		return Reply::message(StatusCode::BAD_REQUEST, "Passwords do not match");
	}

	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let Some(household) = records::record_type_id(&crm, HOUSEHOLD_RECORD_TYPE).await? else {
			return Ok(Reply::failure("Registration failed", records::missing("Household Account record type")));
		};
		let existing = Soql::select(CONTACT, ["Id"])?
			.where_eq("Account.RecordTypeId", &household)?
			.where_eq("Email", &body.emailid)?
			.limit(1);

		if crm.query::<IdRecord>(&existing).await?.first().is_some() {
			return Ok(Reply::message(StatusCode::BAD_REQUEST, "Email already exists"));
		}

		let activation_link = state.links.activation_link(&body.emailid, OffsetDateTime::now_utc());
		let created = crm
			.create(
				&SObjectName::known(CONTACT),
				&json!({
					"FirstName": body.firstname,
					"LastName": body.lastname,
					"Email": body.emailid,
					"Phone": body.usernumber,
					"Password__c": password::hash_password(&body.userpwd)?,
					"Activate_Link__c": activation_link,
				}),
			)
			.await?;

		tracing::info!(contact = %created.id, "member registered");

		Ok(Reply::created(json!({
			"message": "Registration successful",
			"success": true,
			"data": created,
			"activationLink": activation_link,
		})))
	}
	.await;

	response::respond("Registration failed", outcome)
}

/// `POST /api/auth/login`.
pub async fn login(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<LoginRequest>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let soql = Soql::select(
			CONTACT,
			["Id", "Password__c", "Is_Email_Verify__c", "CHF_Account_Status__c", "FirstName", "LastName"],
		)?
		.where_eq("Email", &body.email)?
		.limit(1);
		let Some(row) = crm.query::<LoginRow>(&soql).await?.into_first() else {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "User not found"));
		};

		if row.status.as_deref() != Some(APPROVED) || !row.email_verified {
			return Ok(Reply::message(StatusCode::FORBIDDEN, "Account not verified or approved"));
		}

		let verification =
			password::verify_password(&body.password, row.password.as_deref().unwrap_or_default());

		if !verification.is_match() {
			return Ok(Reply::message(StatusCode::UNAUTHORIZED, "Invalid credentials"));
		}
		if verification == Verification::LegacyMatch {
			upgrade_legacy_password(&crm, &row.id, &body.password).await;
		}

		Ok(Reply::ok(json!({
			"message": "Login successful",
			"data": {
				"userId": row.id,
				"email": body.email,
				"firstName": row.first_name,
				"lastName": row.last_name,
			},
			"success": true,
		})))
	}
	.await;

	response::respond("Login failed", outcome)
}

async fn upgrade_legacy_password(crm: &SignedCrm<'_>, contact: &str, clear: &str) {
	let upgraded: Result<()> = async {
		let id = RecordId::new(contact)?;
		let hash = password::hash_password(clear)?;

		crm.update(&SObjectName::known(CONTACT), &id, &json!({ "Password__c": hash })).await?;

		Ok(())
	}
	.await;

	match upgraded {
		Ok(()) => tracing::info!(contact, "legacy password re-hashed"),
		Err(err) => tracing::warn!(contact, error = %err, "legacy password upgrade failed"),
	}
}

/// `GET /activate/:uidb64/:token`.
///
/// The token segment is not checked here; the CRM owns link validity.
pub async fn activate(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	Path((uidb64, _link_token)): Path<(String, String)>,
) -> Reply {
	let Ok(email) = link::decode_email(&uidb64) else {
		return Reply::rejected(StatusCode::BAD_REQUEST, "Invalid link.");
	};
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let soql = Soql::select(CONTACT, ["Id", "Is_Email_Verify__c"])?.where_eq("Email", &email)?.limit(1);
		let row = crm.query::<VerificationRow>(&soql).await?.into_first();
		let Some(row) = row.filter(|row| !row.email_verified) else {
			return Ok(Reply::rejected(StatusCode::BAD_REQUEST, "Invalid link."));
		};
		let id = RecordId::new(&row.id)?;

		crm.update(&SObjectName::known(CONTACT), &id, &json!({ "Is_Email_Verify__c": true })).await?;

		Ok(Reply::created(json!({ "message": "Email activation successful", "success": true })))
	}
	.await;

	response::respond("Activation failed", outcome)
}

/// `POST /api/auth/check-email`: issues a password-reset link.
pub async fn check_email(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<CheckEmailRequest>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let Some(household) = records::record_type_id(&crm, HOUSEHOLD_RECORD_TYPE).await? else {
			return Ok(Reply::failure("Check email failed", records::missing("Household Account record type")));
		};
		let soql = Soql::select(CONTACT, ["Id", "CHF_Account_Status__c", "Is_Email_Verify__c"])?
			.where_eq("Email", &body.forgot_email)?
			.where_eq("Account.RecordTypeId", &household)?
			.limit(1);
		let Some(row) = crm.query::<VerificationRow>(&soql).await?.into_first() else {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "Email not registered"));
		};

		if row.status.as_deref() == Some(LOCKED) {
			return Ok(Reply::message(StatusCode::FORBIDDEN, "User is locked"));
		}
		if !row.email_verified {
			return Ok(Reply::message(StatusCode::FORBIDDEN, "Email not verified"));
		}

		let link = state.links.reset_link(&body.forgot_email, OffsetDateTime::now_utc());
		let id = RecordId::new(&row.id)?;

		crm.update(&SObjectName::known(CONTACT), &id, &json!({ "Reset_Pwd_Link__c": link })).await?;

		Ok(Reply::ok(json!({
			"message": "Password reset link is sent to the regesterd email",
			"success": true,
			"link": link,
		})))
	}
	.await;

	response::respond("Check email failed", outcome)
}

/// `POST /api/auth/reset-password`: sets a new password for `email`.
pub async fn reset_password(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<NewPasswordRequest>,
) -> Reply {
	if body.new_password != body.confirm_password {
		return Reply::message(StatusCode::BAD_REQUEST, "Passwords do not match");
	}

	let crm = state.crm.with_token(token);
	let outcome = store_new_password(&crm, &body.email, &body.new_password, "Invalid credentials").await;

	response::respond("Reset password failed", outcome)
}

/// `POST /api/auth/forgot-password`: sets a new password for the email encoded in `uidb64`.
pub async fn forgot_password(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<NewPasswordRequest>,
) -> Reply {
	if body.new_password != body.confirm_password {
		return Reply::message(StatusCode::BAD_REQUEST, "Passwords do not match");
	}

	let Ok(email) = link::decode_email(&body.uidb64) else {
		return Reply::message(StatusCode::BAD_REQUEST, "Invalid reset link");
	};
	let crm = state.crm.with_token(token);
	let outcome = store_new_password(&crm, &email, &body.new_password, "Invalid reset link").await;

	response::respond("Reset password failed", outcome)
}

async fn store_new_password(
	crm: &SignedCrm<'_>,
	email: &str,
	new_password: &str,
	not_found: &str,
) -> Result<Reply> {
	let soql = Soql::select(CONTACT, ["Id"])?.where_eq("Email", email)?.limit(1);
	let Some(row) = crm.query::<IdRecord>(&soql).await?.into_first() else {
		return Ok(Reply::message(StatusCode::NOT_FOUND, not_found));
	};
	let id = RecordId::new(&row.id)?;

	crm.update(
		&SObjectName::known(CONTACT),
		&id,
		&json!({ "Password__c": password::hash_password(new_password)? }),
	)
	.await?;

	Ok(Reply::ok(json!({ "message": "Password reset successful", "success": true })))
}
