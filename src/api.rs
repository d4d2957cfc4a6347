//! HTTP surface of the portal gateway.
//!
//! Routes under `/api` and `/activate` sit behind [`middleware::require_session`], which blocks
//! until a session token is available and hands it to the handler through request extensions.
//! Health, root, payment intent, and token refresh routes are unauthenticated.

pub mod auth;
pub mod donation;
pub mod extract;
pub mod internal;
pub mod member;
pub mod middleware;
pub mod newsletter;
pub mod payment;
pub mod profile;
pub mod records;
pub mod response;
pub mod state;

pub use extract::JsonBody;
pub use response::Reply;
pub use state::AppState;

// crates.io
use axum::{
	Router,
	http::{
		Method,
		header::{AUTHORIZATION, CONTENT_TYPE},
	},
	routing::{get, patch, post},
};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};

/// Builds the complete router with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
	let authenticated = Router::new()
		.route("/api/auth/register", post(auth::register))
		.route("/api/auth/login", post(auth::login))
		.route("/api/auth/check-email", post(auth::check_email))
		.route("/api/auth/reset-password", post(auth::reset_password))
		.route("/api/auth/forgot-password", post(auth::forgot_password))
		.route("/activate/:uidb64/:token", get(auth::activate))
		.route("/api/profile/update", post(profile::update_profile))
		.route("/api/profile/address", patch(profile::update_address))
		.route("/api/contact", get(profile::get_contact).post(records::create_contact))
		.route("/api/member/add", post(member::add_member))
		.route("/api/add-member", post(member::add_member))
		.route("/api/delete-member", post(member::delete_member))
		.route("/api/donate/create", post(donation::create_donation))
		.route("/api/newsletter", post(newsletter::subscribe))
		.route("/api/opportunity", post(records::create_opportunity))
		.route("/api/opportunity/:id", patch(records::update_opportunity))
		.route("/api/donationsummary", post(records::create_donation_summary))
		.route_layer(axum::middleware::from_fn_with_state(
			state.clone(),
			middleware::require_session,
		));

	Router::new()
		.route("/health", get(internal::health))
		.route("/", get(internal::root))
		.route("/create-payment-intent", post(payment::create_payment_intent))
		.route("/internal/refresh-token", post(internal::refresh_token))
		.merge(authenticated)
		.layer(cors())
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

fn cors() -> CorsLayer {
	CorsLayer::new()
		.allow_origin(Any)
		.allow_methods([
			Method::GET,
			Method::HEAD,
			Method::PUT,
			Method::PATCH,
			Method::POST,
			Method::DELETE,
		])
		.allow_headers([CONTENT_TYPE, AUTHORIZATION])
}
