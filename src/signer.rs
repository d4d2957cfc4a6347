//! Attaches the request's session token to outbound data-API calls.

// crates.io
use reqwest::{RequestBuilder, header::AUTHORIZATION};
// self
use crate::{_prelude::*, session::SessionToken};

/// Describes how to attach a [`SessionToken`] to an outbound request.
pub trait RequestSigner<Request>
where
	Self: Send + Sync,
{
	/// Consumes the request and returns it with authorization state applied.
	fn sign(&self, request: Request, token: &SessionToken) -> Request;
}

/// Signs reqwest builders with an `Authorization: Bearer` header.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl RequestSigner<RequestBuilder> for BearerSigner {
	fn sign(&self, request: RequestBuilder, token: &SessionToken) -> RequestBuilder {
		request.header(AUTHORIZATION, token.bearer())
	}
}
