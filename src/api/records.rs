//! Pass-through record writes and lookups shared by several routes.

// crates.io
use axum::{
	Extension,
	extract::{Path, State},
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{AppState, JsonBody, Reply, response},
	crm::{IdRecord, RecordId, SObjectName, SignedCrm, Soql},
	session::SessionToken,
};

pub(crate) const CONTACT: &str = "Contact";
pub(crate) const ACCOUNT: &str = "Account";
pub(crate) const OPPORTUNITY: &str = "Opportunity";
pub(crate) const DONATION_SUMMARY: &str = "DonationSummary__c";
pub(crate) const NEWSLETTER: &str = "Newsletter__c";
pub(crate) const HOUSEHOLD_RECORD_TYPE: &str = "Household Account";
pub(crate) const DONATION_RECORD_TYPE: &str = "Donation";

/// Looks up a record type id by its label.
pub(crate) async fn record_type_id(crm: &SignedCrm<'_>, name: &str) -> Result<Option<RecordId>> {
	let soql = Soql::select("RecordType", ["Id"])?.where_eq("Name", name)?.limit(1);
	let row = crm.query::<IdRecord>(&soql).await?.into_first();

	row.map(|row| RecordId::new(row.id).map_err(Error::from)).transpose()
}

/// Error body used when a lookup the gateway depends on comes back empty.
pub(crate) fn missing(what: &str) -> Value {
	json!({ "message": format!("{what} not found.") })
}

/// `POST /api/contact`: creates a Contact from the raw body.
pub async fn create_contact(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<Value>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let created = crm.create(&SObjectName::known(CONTACT), &body).await?;

		Ok(Reply::created(json!(created)))
	}
	.await;

	response::respond("Contact creation failed", outcome)
}

/// `POST /api/opportunity`: creates an Opportunity from the raw body.
pub async fn create_opportunity(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<Value>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let created = crm.create(&SObjectName::known(OPPORTUNITY), &body).await?;

		Ok(Reply::created(json!({ "data": created, "success": true })))
	}
	.await;

	response::respond("Opportunity creation failed", outcome)
}

/// `PATCH /api/opportunity/:id`: patches an Opportunity with the raw body.
pub async fn update_opportunity(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	Path(id): Path<String>,
	JsonBody(body): JsonBody<Value>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let id = RecordId::new(id)?;
		let updated = crm.update(&SObjectName::known(OPPORTUNITY), &id, &body).await?;

		Ok(Reply::ok(updated))
	}
	.await;

	response::respond("Opportunity update failed", outcome)
}

/// `POST /api/donationsummary`: creates a `DonationSummary__c` from the raw body.
pub async fn create_donation_summary(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<Value>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let created = crm.create(&SObjectName::known(DONATION_SUMMARY), &body).await?;

		Ok(Reply::created(json!(created)))
	}
	.await;

	response::respond("Donation summary creation failed", outcome)
}
