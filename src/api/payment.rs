//! Checkout: PaymentIntent creation.

// crates.io
use axum::{extract::State, http::StatusCode};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{AppState, JsonBody, Reply, response},
	payment::{self, OrderItem},
};

/// Body of `POST /create-payment-intent`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaymentIntentRequest {
	pub items: Vec<OrderItem>,
}

/// `POST /create-payment-intent`: returns the intent's client secret.
pub async fn create_payment_intent(
	State(state): State<AppState>,
	JsonBody(body): JsonBody<PaymentIntentRequest>,
) -> Reply {
	let amount = match payment::calculate_order_amount(&body.items) {
		Ok(amount) => amount,
		Err(err) => return Reply::rejected(StatusCode::BAD_REQUEST, &err.to_string()),
	};
	let outcome = state
		.payments
		.create_intent(amount)
		.await
		.map(|intent| Reply::ok(json!({ "clientSecret": intent.client_secret })));

	response::respond("Failed to create payment intent.", outcome)
}
