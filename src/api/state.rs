//! Shared handler state.

// self
use crate::{
	_prelude::*,
	config::PortalConfig,
	crm::CrmClient,
	http,
	link::LinkBuilder,
	oauth::PasswordGrant,
	payment::PaymentClient,
	session::{SessionStore, TokenSource},
};

/// Everything a handler needs; cheap to clone.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Salesforce dispatcher (owns the session store).
	pub crm: Arc<CrmClient>,
	/// Stripe client.
	pub payments: Arc<PaymentClient>,
	/// Activation and reset link renderer.
	pub links: LinkBuilder,
}
impl AppState {
	/// Wires the production components from configuration.
	pub fn from_config(config: &PortalConfig) -> Result<Self> {
		let http_client = http::build_client(config.http_timeout)?;
		let grant = PasswordGrant::new(&config.salesforce, http_client.clone())?;

		Self::with_token_source(config, http_client, Arc::new(grant))
	}

	/// Wires the components around a caller-supplied token source.
	pub fn with_token_source(
		config: &PortalConfig,
		http_client: ReqwestClient,
		source: Arc<dyn TokenSource>,
	) -> Result<Self> {
		let session = Arc::new(SessionStore::new(source, config.salesforce.refresh_policy));
		let crm = CrmClient::new(
			http_client.clone(),
			&config.salesforce.instance_url,
			config.salesforce.api_version.clone(),
			session,
		)?;
		let payments = PaymentClient::new(&config.payment, http_client)?;

		Ok(Self {
			crm: Arc::new(crm),
			payments: Arc::new(payments),
			links: LinkBuilder::new(config.links.clone()),
		})
	}
}
