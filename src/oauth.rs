//! Resource-owner password grant against the Salesforce token endpoint.

// crates.io
use oauth2::{
	AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, ExtraTokenFields,
	HttpClientError, RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	config::SalesforceConfig,
	error::ConfigError,
	http::{InstrumentedHandle, ResponseMetadata, ResponseMetadataSlot},
	session::{SessionToken, TokenFuture, TokenSource},
};

/// Salesforce-specific fields returned next to the access token.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SalesforceTokenFields {
	/// Instance that issued the token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub instance_url: Option<String>,
	/// Identity URL of the integration user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Issue time in epoch milliseconds, as a string.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub issued_at: Option<String>,
	/// Base64 HMAC over `id` + `issued_at`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
}
impl ExtraTokenFields for SalesforceTokenFields {}

type SalesforceTokenResponse = StandardTokenResponse<SalesforceTokenFields, BasicTokenType>;
type SalesforceClient = Client<
	BasicErrorResponse,
	SalesforceTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// [`TokenSource`] that mints session tokens with the service-account credentials.
pub struct PasswordGrant {
	oauth_client: SalesforceClient,
	http_client: ReqwestClient,
	username: ResourceOwnerUsername,
	password: ResourceOwnerPassword,
}
impl PasswordGrant {
	/// Builds the grant for the configured instance.
	///
	/// The token endpoint is `{instance}/services/oauth2/token`; client credentials travel in the
	/// request body.
	pub fn new(config: &SalesforceConfig, http_client: ReqwestClient) -> Result<Self, ConfigError> {
		let mut endpoint = config.instance_url.clone();

		endpoint
			.path_segments_mut()
			.map_err(|_| ConfigError::CannotBeABase { url: config.instance_url.to_string() })?
			.pop_if_empty()
			.extend(["services", "oauth2", "token"]);

		let token_url = TokenUrl::from_url(endpoint);
		let credentials = &config.credentials;
		let oauth_client = Client::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self {
			oauth_client,
			http_client,
			username: ResourceOwnerUsername::new(credentials.username.clone()),
			password: ResourceOwnerPassword::new(credentials.password.expose().to_owned()),
		})
	}

	/// Returns the token endpoint in use.
	pub fn token_url(&self) -> &Url {
		self.oauth_client.token_uri().url()
	}

	async fn exchange(&self) -> Result<SessionToken> {
		let meta = ResponseMetadataSlot::default();
		let handle = InstrumentedHandle::new(self.http_client.clone(), meta.clone());
		let response = self
			.oauth_client
			.exchange_password(&self.username, &self.password)
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		Ok(session_token(response))
	}
}
impl TokenSource for PasswordGrant {
	fn fetch(&self) -> TokenFuture<'_> {
		Box::pin(self.exchange())
	}
}
impl Debug for PasswordGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PasswordGrant")
			.field("token_url", &self.token_url().as_str())
			.field("username", &self.username.as_str())
			.finish_non_exhaustive()
	}
}

fn session_token(response: SalesforceTokenResponse) -> SessionToken {
	let extra = response.extra_fields();
	let mut token = SessionToken::new(response.access_token().secret().to_owned());

	token.instance_url = extra.instance_url.as_deref().and_then(|raw| Url::parse(raw).ok());
	token.identity = extra.id.clone();

	// Salesforce omits `expires_in`; lifetimes come from the refresh policy instead.
	if let Some(expires_in) = response.expires_in() {
		if let Ok(lifetime) = Duration::try_from(expires_in) {
			token = token.with_lifetime(lifetime);
		}
	}

	token
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.as_ref().and_then(|meta| meta.status);
	let reason = match err {
		RequestTokenError::ServerResponse(response) => match response.error_description() {
			Some(description) => format!("{}: {description}", response.error().as_ref()),
			None => response.error().as_ref().to_owned(),
		},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) =>
			format!("token endpoint unreachable: {inner}"),
		RequestTokenError::Request(other) => format!("token request failed: {other}"),
		RequestTokenError::Parse(source, _body) =>
			format!("token response could not be parsed at `{}`", source.path()),
		RequestTokenError::Other(message) => message,
	};

	Error::Authentication { status, reason }
}
