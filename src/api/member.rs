//! Household member management.
//!
//! Both `/api/member/add` and `/api/add-member` share one contract. Existence is resolved on the
//! server from the member email within the requesting user's household account:
//!
//! - email found on a contact of the same account: that contact is updated (`200`);
//! - email found only on contacts of another account: rejected (`400`);
//! - email unknown: a new contact is created in the household (`201`);
//! - no email but a `contactId`: that contact is updated once it is confirmed to belong to the
//!   household.

// crates.io
use axum::{Extension, extract::State, http::StatusCode};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{
		AppState, JsonBody, Reply,
		records::{ACCOUNT, CONTACT},
		response,
	},
	crm::{IdRecord, RecordId, SObjectName, SignedCrm, Soql},
	password,
	session::SessionToken,
};

/// Body of the member add routes.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberRequest {
	pub rel_name: String,
	pub mem_fname: String,
	pub mem_lname: String,
	pub mem_email_addr: String,
	#[serde(deserialize_with = "crate::api::extract::text")]
	pub mem_mobile: String,
	#[serde(rename = "memDOB")]
	pub mem_dob: String,
	pub mem_create_acc: String,
	pub useremail: String,
	pub contact_id: String,
}
impl MemberRequest {
	fn creates_account(&self) -> bool {
		self.mem_create_acc == "Yes"
	}

	fn profile_fields(&self, household: &str) -> serde_json::Map<String, Value> {
		let mut fields = serde_json::Map::new();

		fields.insert("FirstName".into(), json!(self.mem_fname));
		fields.insert("LastName".into(), json!(self.mem_lname));
		fields.insert("MobilePhone".into(), json!(self.mem_mobile));
		fields.insert("Member_Relationship__c".into(), json!(self.rel_name));
		fields.insert("Member_Account__c".into(), json!(self.creates_account()));
		fields.insert("Household__c".into(), json!(household));

		if let Some(birthdate) = format_birthdate(&self.mem_dob) {
			fields.insert("Birthdate".into(), json!(birthdate));
		}

		fields
	}
}

/// Body of `POST /api/delete-member`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteMemberRequest {
	pub member_id: String,
	pub contact_id: String,
}

#[derive(Debug, Deserialize)]
struct AccountIdRow {
	#[serde(default, rename = "AccountId")]
	account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberRow {
	#[serde(rename = "Id")]
	id: String,
	#[serde(default, rename = "AccountId")]
	account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NameRow {
	#[serde(default, rename = "Name")]
	name: Option<String>,
}

/// Converts the portal's `dd/mm/yyyy` birthdate into `yyyy-mm-dd`.
pub fn format_birthdate(raw: &str) -> Option<String> {
	let raw = raw.trim();

	if raw.is_empty() {
		return None;
	}

	let mut parts = raw.split('/').collect::<Vec<_>>();

	parts.reverse();

	Some(parts.join("-"))
}

/// `POST /api/member/add` and `POST /api/add-member`.
pub async fn add_member(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<MemberRequest>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let soql = Soql::select(CONTACT, ["AccountId"])?.where_eq("Email", &body.useremail)?.limit(1);
		let Some(owner) = crm.query::<AccountIdRow>(&soql).await?.into_first() else {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "User email not found."));
		};
		let Some(account) = owner.account_id else {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "Account not found."));
		};
		let account = RecordId::new(account)?;
		let soql = Soql::select(ACCOUNT, ["Name"])?.where_eq("Id", &account)?.limit(1);
		let Some(household) = crm.query::<NameRow>(&soql).await?.into_first() else {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "Account not found."));
		};
		let household = household.name.unwrap_or_default();
		let email = body.mem_email_addr.trim();

		if email.is_empty() {
			if body.contact_id.trim().is_empty() {
				return Ok(Reply::message(
					StatusCode::BAD_REQUEST,
					"Member email or contact id is required.",
				));
			}

			let member = RecordId::new(&body.contact_id)?;
			let soql = Soql::select(CONTACT, ["Id"])?
				.where_eq("Id", &member)?
				.where_eq("AccountId", &account)?
				.limit(1);

			if crm.query::<IdRecord>(&soql).await?.first().is_none() {
				return Ok(Reply::message(
					StatusCode::NOT_FOUND,
					"No matching contact found to update.",
				));
			}

			return update_member(&crm, &member, &body, &household).await;
		}

		let soql = Soql::select(CONTACT, ["Id", "AccountId"])?.where_eq("Email", email)?;
		let matches = crm.query::<MemberRow>(&soql).await?.records;

		if let Some(existing) =
			matches.iter().find(|row| row.account_id.as_deref() == Some(account.as_str()))
		{
			let member = RecordId::new(&existing.id)?;

			return update_member(&crm, &member, &body, &household).await;
		}
		if !matches.is_empty() {
			return Ok(Reply::message(
				StatusCode::BAD_REQUEST,
				"This email already exists with another account.",
			));
		}

		create_member(&crm, &state, &account, email, &body, &household).await
	}
	.await;

	response::respond("Something went wrong, please try again later.", outcome)
}

async fn update_member(
	crm: &SignedCrm<'_>,
	member: &RecordId,
	body: &MemberRequest,
	household: &str,
) -> Result<Reply> {
	crm.update(&SObjectName::known(CONTACT), member, &Value::Object(body.profile_fields(household)))
		.await?;

	tracing::info!(member = %member, "household member updated");

	Ok(Reply::ok(json!({ "message": "Member updated successfully." })))
}

async fn create_member(
	crm: &SignedCrm<'_>,
	state: &AppState,
	account: &RecordId,
	email: &str,
	body: &MemberRequest,
	household: &str,
) -> Result<Reply> {
	let now = OffsetDateTime::now_utc();
	let (activation_link, reset_link) = if body.creates_account() {
		(state.links.activation_link(email, now), state.links.reset_link(email, now))
	} else {
		(String::new(), String::new())
	};
	let mut fields = body.profile_fields(household);

	fields.insert("Email".into(), json!(email));
	fields.insert("AccountId".into(), json!(account));
	fields.insert("Password__c".into(), json!(password::random_password()?));
	fields.insert("Activate_Link__c".into(), json!(activation_link));
	fields.insert("Reset_Pwd_Link__c".into(), json!(reset_link));
	fields.insert("Base_URL__c".into(), json!(state.links.base_url()));
	fields.insert("Is_Email_Verify__c".into(), json!(true));
	fields.insert("Is_Member_Email__c".into(), json!(true));
	fields.insert("CHF_Account_Status__c".into(), json!("Approve"));

	let created = crm.create(&SObjectName::known(CONTACT), &Value::Object(fields)).await?;

	tracing::info!(member = %created.id, account = %account, "household member created");

	Ok(Reply::created(json!({ "message": "Member added successfully." })))
}

/// `POST /api/delete-member`: locks a member of the caller's household and clears its email.
pub async fn delete_member(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<DeleteMemberRequest>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let owner = RecordId::new(&body.contact_id)?;
		let member = RecordId::new(&body.member_id)?;
		let soql = Soql::select(CONTACT, ["AccountId"])?.where_eq("Id", &owner)?.limit(1);
		let account = crm
			.query::<AccountIdRow>(&soql)
			.await?
			.into_first()
			.and_then(|row| row.account_id);
		let Some(account) = account else {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "Contact not found."));
		};
		let account = RecordId::new(account)?;
		let soql = Soql::select(CONTACT, ["Id"])?
			.where_eq("Id", &member)?
			.where_eq("AccountId", &account)?
			.limit(1);

		if crm.query::<IdRecord>(&soql).await?.first().is_none() {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "Member not found."));
		}

		crm.update(
			&SObjectName::known(CONTACT),
			&member,
			&json!({ "CHF_Account_Status__c": "Reject", "Email": Value::Null }),
		)
		.await?;

		let soql = Soql::select(CONTACT, ["Id", "FirstName", "LastName"])?
			.where_eq("AccountId", &account)?
			.where_eq("CHF_Account_Status__c", "Approve")?;
		let members = crm.query::<Value>(&soql).await?.records;

		Ok(Reply::ok(json!({
			"message": "Member deleted successfully.",
			"members": members,
			"success": true,
		})))
	}
	.await;

	response::respond("Error deleting member.", outcome)
}
