//! Donation intake: donor resolution, opportunity, and per-category summaries.

// crates.io
use axum::{Extension, extract::State};
use rand::Rng;
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{
		AppState, JsonBody, Reply,
		records::{self, ACCOUNT, CONTACT, DONATION_RECORD_TYPE, DONATION_SUMMARY, OPPORTUNITY},
		response,
	},
	crm::{BatchSubrequest, CompositeBatch, RecordId, SObjectName, SignedCrm, Soql},
	session::SessionToken,
};

const PAYMENT_PENDING: &str = "Payment Pending";

/// One donation category line.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DonationCategory {
	pub project_name: Option<String>,
	pub unit_amount: Value,
	pub quantity: Value,
	pub remark: Option<String>,
}

/// Body of `POST /api/donate/create`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DonationRequest {
	pub don_amt: Value,
	pub donor_name: String,
	pub display_name: String,
	pub donor_email: String,
	#[serde(deserialize_with = "crate::api::extract::text")]
	pub donor_mobile: String,
	pub donor_bill_st: String,
	pub donor_city: String,
	pub donor_state: String,
	#[serde(deserialize_with = "crate::api::extract::text")]
	pub donor_zip: String,
	pub donor_country: String,
	pub tnx_id: String,
	pub donation_categories: Vec<DonationCategory>,
}
impl DonationRequest {
	fn has_billing(&self) -> bool {
		[&self.donor_bill_st, &self.donor_city, &self.donor_state, &self.donor_zip, &self.donor_country]
			.iter()
			.any(|field| !field.trim().is_empty())
	}
}

#[derive(Debug, Deserialize)]
struct DonorRow {
	#[serde(rename = "Id")]
	id: String,
	#[serde(default, rename = "AccountId")]
	account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountIdRow {
	#[serde(default, rename = "AccountId")]
	account_id: Option<String>,
}

/// Splits a full name at its last space; single words fill both parts.
pub fn split_donor_name(full: &str) -> (String, String) {
	match full.rsplit_once(' ') {
		Some((first, last)) => (first.to_owned(), last.to_owned()),
		None => (full.to_owned(), full.to_owned()),
	}
}

/// Rewrites offline payment modes into generated transaction ids.
pub fn transaction_id(tnx_id: &str) -> String {
	match tnx_id {
		"cheque" => format!("Check-{}", random_letters(12)),
		"zelle" => format!("Zelle-{}", random_letters(13)),
		other => other.to_owned(),
	}
}

fn random_letters(len: usize) -> String {
	let mut rng = rand::rng();

	(0..len).map(|_| char::from(rng.random_range(b'A'..=b'Z'))).collect()
}

/// `POST /api/donate/create`.
pub async fn create_donation(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<DonationRequest>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let (first_name, last_name) = split_donor_name(&body.donor_name);
		let transaction = transaction_id(&body.tnx_id);
		let (account, donor) = resolve_donor(&crm, &body, &first_name, &last_name).await?;
		let Some(record_type) = records::record_type_id(&crm, DONATION_RECORD_TYPE).await? else {
			return Ok(Reply::failure(
				"Failed to process donation.",
				records::missing("Donation record type"),
			));
		};
		let close_date = OffsetDateTime::now_utc().date().to_string();
		let opportunity = crm
			.create(
				&SObjectName::known(OPPORTUNITY),
				&json!({
					"AccountId": account,
					"Amount": body.don_amt,
					"StageName": PAYMENT_PENDING,
					"CloseDate": close_date,
					"Name": body.display_name,
					"Donor__c": donor,
					"RecordTypeId": record_type,
				}),
			)
			.await?;
		let opportunity = RecordId::new(&opportunity.id)?;

		submit_summaries(&crm, &state, &opportunity, &body.donation_categories).await?;
		crm.update(
			&SObjectName::known(OPPORTUNITY),
			&opportunity,
			&json!({ "Transaction_ID__c": transaction, "EmailTriggered__c": false }),
		)
		.await?;

		tracing::info!(opportunity = %opportunity, donor = %donor, "donation recorded");

		Ok(Reply::ok(json!({ "message": "Donation processed successfully.", "success": true })))
	}
	.await;

	response::respond("Failed to process donation.", outcome)
}

// Returns the donor's account (if any) and contact id, creating the contact when the email is new.
async fn resolve_donor(
	crm: &SignedCrm<'_>,
	body: &DonationRequest,
	first_name: &str,
	last_name: &str,
) -> Result<(Option<RecordId>, RecordId)> {
	let soql = Soql::select(CONTACT, ["Id", "Name", "AccountId"])?
		.where_eq("Email", &body.donor_email)?
		.limit(1);

	if let Some(row) = crm.query::<DonorRow>(&soql).await?.into_first() {
		let account = row.account_id.map(RecordId::new).transpose()?;

		return Ok((account, RecordId::new(row.id)?));
	}

	let created = crm
		.create(
			&SObjectName::known(CONTACT),
			&json!({
				"FirstName": first_name,
				"LastName": last_name,
				"Email": body.donor_email,
				"MobilePhone": body.donor_mobile,
			}),
		)
		.await?;
	let contact = RecordId::new(&created.id)?;
	let soql = Soql::select(CONTACT, ["AccountId"])?.where_eq("Id", &contact)?.limit(1);
	let account = crm
		.query::<AccountIdRow>(&soql)
		.await?
		.into_first()
		.and_then(|row| row.account_id)
		.map(RecordId::new)
		.transpose()?;

	tracing::info!(contact = %contact, "donor contact created");

	if let Some(account) = &account {
		if body.has_billing() {
			crm.update(
				&SObjectName::known(ACCOUNT),
				account,
				&json!({
					"BillingStreet": body.donor_bill_st,
					"BillingCity": body.donor_city,
					"BillingState": body.donor_state,
					"BillingPostalCode": body.donor_zip,
					"BillingCountry": body.donor_country,
				}),
			)
			.await?;
		}
	}

	Ok((account, contact))
}

// One composite batch per donation; per-category failures are logged only.
async fn submit_summaries(
	crm: &SignedCrm<'_>,
	state: &AppState,
	opportunity: &RecordId,
	categories: &[DonationCategory],
) -> Result<()> {
	if categories.is_empty() {
		return Ok(());
	}

	let url = state.crm.sobject_url(&SObjectName::known(DONATION_SUMMARY));
	let batch = CompositeBatch {
		batch_requests: categories
			.iter()
			.map(|category| BatchSubrequest {
				method: "POST",
				url: url.clone(),
				rich_input: json!({
					"Opportunity__c": opportunity,
					"Campaign_Name__c": category.project_name,
					"Amount__c": category.unit_amount,
					"Quantity__c": category.quantity,
					"Remark__c": category.remark,
				}),
			})
			.collect(),
	};
	let response = crm.composite_batch(&batch).await?;

	for (category, result) in categories.iter().zip(&response.results) {
		let project = category.project_name.as_deref().unwrap_or_default();

		if result.is_success() {
			tracing::debug!(project, "donation summary created");
		} else {
			tracing::warn!(
				project,
				status = result.status_code,
				result = %result.result,
				"donation summary rejected"
			);
		}
	}

	Ok(())
}
