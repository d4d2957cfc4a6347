//! Environment-sourced gateway configuration.
//!
//! [`PortalConfig::from_env`] reads the process environment; [`PortalConfig::from_lookup`]
//! accepts any lookup closure so tests can feed a fixed map without touching global state.

// std
use std::net::{IpAddr, SocketAddr};
// self
use crate::{_prelude::*, error::ConfigError, session::Secret};

const DEFAULT_API_VERSION: &str = "v57.0";
const DEFAULT_DOMAIN: &str = "localhost:5173";
const DEFAULT_LINK_SCHEME: &str = "http";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4242;
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// How the session store decides when to mint a new access token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
	#[default]
	/// Every authenticated request obtains a brand-new token.
	EveryRequest,
	/// Tokens are reused until `ttl` elapses or the data API answers `401`.
	Cached {
		/// Assumed lifetime of an issued token.
		ttl: Duration,
	},
}
impl RefreshPolicy {
	fn parse(raw: &str, ttl: Duration) -> Result<Self, ConfigError> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"every-request" | "always" => Ok(Self::EveryRequest),
			"cached" => Ok(Self::Cached { ttl }),
			other => Err(ConfigError::Invalid {
				var: "TOKEN_REFRESH_POLICY",
				reason: format!("expected `every-request` or `cached`, got `{other}`"),
			}),
		}
	}
}

/// Service-account credentials for the resource-owner password grant.
#[derive(Clone)]
pub struct SalesforceCredentials {
	/// Connected-app client identifier.
	pub client_id: String,
	/// Connected-app client secret.
	pub client_secret: Secret,
	/// Integration user name.
	pub username: String,
	/// Integration user password (with security token appended when required).
	pub password: Secret,
}
impl Debug for SalesforceCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SalesforceCredentials")
			.field("client_id", &self.client_id)
			.field("username", &self.username)
			.finish_non_exhaustive()
	}
}

/// Salesforce instance settings.
#[derive(Clone, Debug)]
pub struct SalesforceConfig {
	/// Instance base URL (e.g. `https://acme.my.salesforce.com`).
	pub instance_url: Url,
	/// REST API version segment (e.g. `v57.0`).
	pub api_version: String,
	/// Service-account credentials.
	pub credentials: SalesforceCredentials,
	/// Token refresh policy.
	pub refresh_policy: RefreshPolicy,
}

/// Stripe settings.
#[derive(Clone, Debug)]
pub struct PaymentConfig {
	/// Secret API key.
	pub secret_key: Secret,
	/// API base URL.
	pub api_base: Url,
	/// ISO currency code for payment intents.
	pub currency: String,
}

/// Public link settings for activation and password-reset URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
	/// `http` or `https`.
	pub scheme: String,
	/// Public-facing host (and optional port) of the portal.
	pub domain: String,
}

/// Complete gateway configuration.
#[derive(Clone, Debug)]
pub struct PortalConfig {
	/// Socket address the HTTP server binds to.
	pub bind: SocketAddr,
	/// Salesforce settings.
	pub salesforce: SalesforceConfig,
	/// Stripe settings.
	pub payment: PaymentConfig,
	/// Public link settings.
	pub links: LinkConfig,
	/// Optional per-request timeout for outbound HTTP calls.
	pub http_timeout: Option<std::time::Duration>,
}
impl PortalConfig {
	/// Loads configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Loads configuration through the provided lookup, treating empty values as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |var: &'static str| lookup(var).filter(|value| !value.trim().is_empty());
		let require = |var: &'static str| get(var).ok_or(ConfigError::Missing { var });
		let instance_url = parse_url("API_SALESFORCE_INSTATE", &require("API_SALESFORCE_INSTATE")?)?;
		let api_version = get("API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.into());

		if api_version.contains('/') {
			return Err(ConfigError::Invalid {
				var: "API_VERSION",
				reason: "must be a single path segment".into(),
			});
		}

		let credentials = SalesforceCredentials {
			client_id: require("API_SALESFORCE_CLIENT_ID")?,
			client_secret: Secret::new(require("API_SALESFORCE_CLIENT_SECRET")?),
			username: require("API_SALESFORCE_USER_NAME")?,
			password: Secret::new(require("API_SALESFORCE_USER_PASSWORD")?),
		};
		let ttl_secs = match get("TOKEN_TTL_SECS") {
			Some(raw) => parse_number::<i64>("TOKEN_TTL_SECS", &raw)?,
			None => DEFAULT_TOKEN_TTL_SECS,
		};

		if ttl_secs <= 0 {
			return Err(ConfigError::Invalid {
				var: "TOKEN_TTL_SECS",
				reason: "must be positive".into(),
			});
		}

		let refresh_policy = match get("TOKEN_REFRESH_POLICY") {
			Some(raw) => RefreshPolicy::parse(&raw, Duration::seconds(ttl_secs))?,
			None => RefreshPolicy::default(),
		};
		let payment = PaymentConfig {
			secret_key: Secret::new(require("VITE_STRIPE_CLIENT_SECRET")?),
			api_base: parse_url(
				"STRIPE_API_BASE",
				&get("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.into()),
			)?,
			currency: get("PAYMENT_CURRENCY")
				.unwrap_or_else(|| DEFAULT_CURRENCY.into())
				.to_ascii_lowercase(),
		};
		let scheme = get("LINK_SCHEME").unwrap_or_else(|| DEFAULT_LINK_SCHEME.into());

		if scheme != "http" && scheme != "https" {
			return Err(ConfigError::Invalid {
				var: "LINK_SCHEME",
				reason: format!("expected `http` or `https`, got `{scheme}`"),
			});
		}

		let links =
			LinkConfig { scheme, domain: get("DOMAIN").unwrap_or_else(|| DEFAULT_DOMAIN.into()) };
		let ip = get("BIND_ADDR")
			.unwrap_or_else(|| DEFAULT_BIND_ADDR.into())
			.parse::<IpAddr>()
			.map_err(|e| ConfigError::Invalid { var: "BIND_ADDR", reason: e.to_string() })?;
		let port = match get("PORT") {
			Some(raw) => parse_number::<u16>("PORT", &raw)?,
			None => DEFAULT_PORT,
		};
		let http_timeout = get("HTTP_TIMEOUT_SECS")
			.map(|raw| parse_number::<u64>("HTTP_TIMEOUT_SECS", &raw))
			.transpose()?
			.map(std::time::Duration::from_secs);

		Ok(Self {
			bind: SocketAddr::new(ip, port),
			salesforce: SalesforceConfig {
				instance_url,
				api_version,
				credentials,
				refresh_policy,
			},
			payment,
			links,
			http_timeout,
		})
	}
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw.trim())
		.map_err(|e| ConfigError::Invalid { var, reason: e.to_string() })?;

	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(ConfigError::Invalid { var, reason: format!("unsupported scheme `{other}`") }),
	}
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: Display,
{
	raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid { var, reason: e.to_string() })
}
