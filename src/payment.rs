//! Stripe PaymentIntent creation.

// crates.io
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	config::PaymentConfig,
	error::{ConfigError, TransportError},
	http,
	obs::{self, OpSpan, Operation, Outcome},
	session::Secret,
};

const TARGET: &str = "Stripe API";

/// One line of a checkout request.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OrderItem {
	/// Amount in the currency's minor unit.
	pub amount: i64,
}

/// Invalid order totals.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AmountError {
	/// An item carried a negative amount.
	#[error("Item amounts must not be negative.")]
	Negative,
	/// The total does not fit the amount type.
	#[error("Order total is too large.")]
	Overflow,
}

/// Sums the item amounts, rejecting negative items and overflow.
pub fn calculate_order_amount(items: &[OrderItem]) -> Result<i64, AmountError> {
	items.iter().try_fold(0_i64, |total, item| {
		if item.amount < 0 {
			return Err(AmountError::Negative);
		}

		total.checked_add(item.amount).ok_or(AmountError::Overflow)
	})
}

/// Subset of the PaymentIntent object the portal needs.
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentIntent {
	/// Intent id.
	pub id: String,
	/// Secret handed to the browser to confirm the payment.
	pub client_secret: String,
}

/// Minimal Stripe client.
#[derive(Clone, Debug)]
pub struct PaymentClient {
	http_client: ReqwestClient,
	endpoint: Url,
	secret_key: Secret,
	currency: String,
}
impl PaymentClient {
	/// Builds a client posting to `{api_base}/v1/payment_intents`.
	pub fn new(config: &PaymentConfig, http_client: ReqwestClient) -> Result<Self, ConfigError> {
		let mut endpoint = config.api_base.clone();

		endpoint
			.path_segments_mut()
			.map_err(|_| ConfigError::CannotBeABase { url: config.api_base.to_string() })?
			.pop_if_empty()
			.extend(["v1", "payment_intents"]);

		Ok(Self {
			http_client,
			endpoint,
			secret_key: config.secret_key.clone(),
			currency: config.currency.clone(),
		})
	}

	/// Creates an intent for `amount` minor units with automatic payment methods enabled.
	pub async fn create_intent(&self, amount: i64) -> Result<PaymentIntent> {
		let span = OpSpan::new(Operation::PaymentIntent, "create_intent");

		span.wrap(async {
			obs::record_operation(Operation::PaymentIntent, Outcome::Attempt);

			let form = Serializer::new(String::new())
				.append_pair("amount", &amount.to_string())
				.append_pair("currency", &self.currency)
				.append_pair("automatic_payment_methods[enabled]", "true")
				.finish();
			let result = async {
				let response = self
					.http_client
					.post(self.endpoint.clone())
					.header(AUTHORIZATION, format!("Bearer {}", self.secret_key.expose()))
					.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
					.body(form)
					.send()
					.await
					.map_err(|e| TransportError::network(TARGET, e))?;
				let value = http::read_json(TARGET, response).await?;

				http::decode::<PaymentIntent>(value)
			}
			.await;

			match &result {
				Ok(intent) => {
					obs::record_operation(Operation::PaymentIntent, Outcome::Success);
					tracing::info!(intent = %intent.id, amount, "payment intent created");
				},
				Err(err) => {
					obs::record_operation(Operation::PaymentIntent, Outcome::Failure);
					tracing::warn!(status = ?err.upstream_status(), error = %err, "payment intent failed");
				},
			}

			result
		})
		.await
	}
}
