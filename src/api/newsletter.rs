//! Newsletter subscription.

// std
use std::net::{IpAddr, SocketAddr};
// crates.io
use axum::{
	Extension,
	extract::{ConnectInfo, State},
	http::{HeaderMap, StatusCode},
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	api::{AppState, JsonBody, Reply, records::NEWSLETTER, response},
	crm::{SObjectName, Soql},
	session::SessionToken,
};

/// Body of `POST /api/newsletter`.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
	#[serde(rename = "SubscriberEmail")]
	pub subscriber_email: String,
}

/// Subscriber address: first `X-Forwarded-For` hop, else the peer address.
pub fn subscriber_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
	let forwarded = headers
		.get("x-forwarded-for")
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.split(',').next())
		.and_then(|hop| hop.trim().parse::<IpAddr>().ok());

	forwarded.or_else(|| peer.map(|addr| addr.ip()))
}

/// `POST /api/newsletter`.
pub async fn subscribe(
	State(state): State<AppState>,
	Extension(token): Extension<SessionToken>,
	peer: Option<ConnectInfo<SocketAddr>>,
	headers: HeaderMap,
	JsonBody(body): JsonBody<SubscribeRequest>,
) -> Reply {
	let Some(ip) = subscriber_ip(&headers, peer.map(|ConnectInfo(addr)| addr)) else {
		return Reply::message(StatusCode::INTERNAL_SERVER_ERROR, "Unable to fetch public IP address.");
	};
	let crm = state.crm.with_token(token);
	let outcome: Result<Reply> = async {
		let soql = Soql::select(NEWSLETTER, ["Subscriber_Email__c"])?
			.where_eq("Subscriber_Email__c", &body.subscriber_email)?
			.limit(1);

		if crm.query::<Value>(&soql).await?.first().is_some() {
			return Ok(Reply::rejected(StatusCode::BAD_REQUEST, "Already Subscribed!"));
		}

		crm.create(
			&SObjectName::known(NEWSLETTER),
			&json!({
				"Subscriber_Email__c": body.subscriber_email,
				"Subscriber_IP_Address__c": ip.to_string(),
			}),
		)
		.await?;

		Ok(Reply::created(json!({ "message": "Subscribed Successfully.", "success": true })))
	}
	.await;

	response::respond("Something went wrong, please try again later.", outcome)
}
