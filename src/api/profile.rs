//! Profile and household address routes.

// crates.io
use axum::{
	Extension,
	extract::{Query, State},
	http::StatusCode,
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{
		AppState, JsonBody, Reply,
		records::{ACCOUNT, CONTACT},
		response,
	},
	crm::{RecordId, SObjectName, Soql},
	session::SessionToken,
};

/// Body of `POST /api/profile/update`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileUpdate {
	pub first_name: String,
	pub last_name: String,
	#[serde(deserialize_with = "crate::api::extract::text")]
	pub mobile: String,
	#[serde(rename = "Id")]
	pub id: String,
}

/// Billing and shipping address of a household account, as exchanged with the portal.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
	pub billing_street: Option<String>,
	pub billing_city: Option<String>,
	pub billing_state: Option<String>,
	pub billing_country: Option<String>,
	pub billing_postal_code: Option<String>,
	pub shipping_street: Option<String>,
	pub shipping_city: Option<String>,
	pub shipping_state: Option<String>,
	pub shipping_country: Option<String>,
	pub shipping_postal_code: Option<String>,
}
impl Address {
	/// Whether billing and shipping fields are pairwise equal.
	pub fn same_address(&self) -> bool {
		self.billing_street == self.shipping_street
			&& self.billing_city == self.shipping_city
			&& self.billing_country == self.shipping_country
			&& self.billing_state == self.shipping_state
			&& self.billing_postal_code == self.shipping_postal_code
	}

	fn to_account_fields(&self) -> Value {
		let pairs = [
			("BillingStreet", &self.billing_street),
			("BillingCity", &self.billing_city),
			("BillingState", &self.billing_state),
			("BillingCountry", &self.billing_country),
			("BillingPostalCode", &self.billing_postal_code),
			("ShippingStreet", &self.shipping_street),
			("ShippingCity", &self.shipping_city),
			("ShippingState", &self.shipping_state),
			("ShippingCountry", &self.shipping_country),
			("ShippingPostalCode", &self.shipping_postal_code),
		];

		// Absent fields are left untouched on the account.
		Value::Object(
			pairs
				.into_iter()
				.filter_map(|(key, value)| value.clone().map(|v| (key.to_owned(), Value::String(v))))
				.collect(),
		)
	}
}

/// Body of `PATCH /api/profile/address`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddressUpdate {
	pub contact_id: String,
	#[serde(flatten)]
	pub address: Address,
}

/// Query of `GET /api/contact`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactQuery {
	pub email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountRef {
	#[serde(rename = "Id")]
	pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContactAccountRow {
	#[serde(default)]
	account: Option<AccountRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContactRow {
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	first_name: Option<String>,
	#[serde(default)]
	last_name: Option<String>,
	#[serde(default)]
	phone: Option<String>,
	#[serde(default)]
	mobile_phone: Option<String>,
	#[serde(default)]
	account: Option<AccountRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AccountRow {
	billing_street: Option<String>,
	billing_city: Option<String>,
	billing_state: Option<String>,
	billing_country: Option<String>,
	billing_postal_code: Option<String>,
	shipping_street: Option<String>,
	shipping_city: Option<String>,
	shipping_state: Option<String>,
	shipping_country: Option<String>,
	shipping_postal_code: Option<String>,
}
impl From<AccountRow> for Address {
	fn from(row: AccountRow) -> Self {
		Self {
			billing_street: row.billing_street,
			billing_city: row.billing_city,
			billing_state: row.billing_state,
			billing_country: row.billing_country,
			billing_postal_code: row.billing_postal_code,
			shipping_street: row.shipping_street,
			shipping_city: row.shipping_city,
			shipping_state: row.shipping_state,
			shipping_country: row.shipping_country,
			shipping_postal_code: row.shipping_postal_code,
		}
	}
}

/// `POST /api/profile/update`.
pub async fn update_profile(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<ProfileUpdate>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let id = RecordId::new(&body.id)?;

		crm.update(
			&SObjectName::known(CONTACT),
			&id,
			&json!({
				"FirstName": body.first_name,
				"LastName": body.last_name,
				"MobilePhone": body.mobile,
			}),
		)
		.await?;

		Ok(Reply::ok(json!({
			"message": "Profile updated successfully",
			"success": true,
			"userData": {
				"firstName": body.first_name,
				"lastName": body.last_name,
				"mobile": body.mobile,
			},
		})))
	}
	.await;

	response::respond("Profile update failed", outcome)
}

/// `PATCH /api/profile/address`: writes billing and shipping fields on the contact's account.
pub async fn update_address(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	JsonBody(body): JsonBody<AddressUpdate>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let contact = RecordId::new(&body.contact_id)?;
		let soql = Soql::select(CONTACT, ["Id", "Account.Id"])?.where_eq("Id", &contact)?.limit(1);
		let account = crm
			.query::<ContactAccountRow>(&soql)
			.await?
			.into_first()
			.and_then(|row| row.account);
		let Some(account) = account else {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "Account not found."));
		};
		let account = RecordId::new(&account.id)?;
		let data = crm
			.update(&SObjectName::known(ACCOUNT), &account, &body.address.to_account_fields())
			.await?;

		Ok(Reply::ok(json!({
			"message": "Address updated successfully",
			"success": true,
			"data": data,
		})))
	}
	.await;

	response::respond("Address update failed. Please try again.", outcome)
}

/// `GET /api/contact?email=`: contact details plus the household address.
pub async fn get_contact(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	Query(query): Query<ContactQuery>,
) -> Reply {
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let soql = Soql::select(
			CONTACT,
			["Id", "Email", "FirstName", "LastName", "Phone", "MobilePhone", "Account.Id"],
		)?
		.where_eq("Email", &query.email)?
		.limit(1);
		let Some(contact) = crm.query::<ContactRow>(&soql).await?.into_first() else {
			return Ok(Reply::message(StatusCode::NOT_FOUND, "User not found"));
		};
		let address = match &contact.account {
			Some(account) => {
				let id = RecordId::new(&account.id)?;
				let soql = Soql::select(
					ACCOUNT,
					[
						"Id",
						"BillingStreet",
						"BillingCity",
						"BillingState",
						"BillingCountry",
						"BillingPostalCode",
						"ShippingStreet",
						"ShippingCity",
						"ShippingState",
						"ShippingCountry",
						"ShippingPostalCode",
					],
				)?
				.where_eq("Id", &id)?
				.limit(1);

				crm.query::<AccountRow>(&soql).await?.into_first().unwrap_or_default().into()
			},
			None => Address::default(),
		};
		let mut body = json!({
			"firstName": contact.first_name,
			"lastName": contact.last_name,
			"email": contact.email,
			"mobile": contact.mobile_phone.or(contact.phone),
			"sameAddress": address.same_address(),
		});

		if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), json!(address)) {
			target.extend(fields);
		}

		Ok(Reply::ok(body))
	}
	.await;

	response::respond("Something went wrong, please try again later.", outcome)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn same_address_compares_every_pair() {
		let mut address = Address {
			billing_street: Some("1 Main St".into()),
			shipping_street: Some("1 Main St".into()),
			billing_city: Some("Austin".into()),
			shipping_city: Some("Austin".into()),
			..Default::default()
		};

		assert!(address.same_address());

		address.shipping_postal_code = Some("78701".into());

		assert!(!address.same_address());
	}

	#[test]
	fn address_update_reads_flat_body() {
		let update: AddressUpdate = serde_json::from_value(json!({
			"contactId": "003000000000001",
			"billingCity": "Austin",
			"shippingCity": "Dallas",
		}))
		.expect("Body should deserialize.");

		assert_eq!(update.contact_id, "003000000000001");
		assert_eq!(update.address.billing_city.as_deref(), Some("Austin"));
		assert_eq!(update.address.to_account_fields()["ShippingCity"], "Dallas");
		assert!(update.address.to_account_fields().get("BillingStreet").is_none());
	}
}
