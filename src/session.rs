//! Process-wide credential store for the Salesforce session.
//!
//! [`SessionStore`] owns the single bearer token shared by every authenticated route. Refreshes
//! run under one single-flight guard, so concurrent requests never overwrite a newer token with
//! an older one; a caller that waited while another refresh completed reuses that freshly issued
//! token instead of issuing its own call. Under [`RefreshPolicy::Cached`] the token is reused
//! until its lifetime (minus [`SessionStore::EXPIRY_SKEW`]) elapses or the dispatcher reports a
//! `401` through [`SessionStore::invalidate`].

mod metrics;
mod secret;
mod token;

pub use metrics::RefreshMetrics;
pub use secret::Secret;
pub use token::SessionToken;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	config::RefreshPolicy,
	obs::{self, OpSpan, Operation, Outcome},
};

/// Boxed future returned by [`TokenSource::fetch`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<SessionToken>> + 'a + Send>>;

/// Anything that can mint a new session token.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Requests a brand-new token from the identity provider.
	fn fetch(&self) -> TokenFuture<'_>;
}

/// Shared holder of the current session token.
pub struct SessionStore {
	source: Arc<dyn TokenSource>,
	policy: RefreshPolicy,
	current: RwLock<Option<SessionToken>>,
	generation: AtomicU64,
	refresh_guard: AsyncMutex<()>,
	metrics: RefreshMetrics,
}
impl SessionStore {
	/// Headroom subtracted from a cached token's lifetime.
	pub const EXPIRY_SKEW: Duration = Duration::seconds(30);

	/// Creates an empty store backed by `source`.
	pub fn new(source: Arc<dyn TokenSource>, policy: RefreshPolicy) -> Self {
		Self {
			source,
			policy,
			current: RwLock::new(None),
			generation: AtomicU64::new(0),
			refresh_guard: AsyncMutex::new(()),
			metrics: RefreshMetrics::default(),
		}
	}

	/// Returns the configured refresh policy.
	pub fn policy(&self) -> RefreshPolicy {
		self.policy
	}

	/// Returns the refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a clone of the token currently held, if any.
	pub fn current(&self) -> Option<SessionToken> {
		self.current.read().clone()
	}

	/// Returns the token one inbound request should use, refreshing according to the policy.
	pub async fn acquire(&self) -> Result<SessionToken> {
		let span = OpSpan::new(Operation::TokenRefresh, "acquire");

		span.wrap(async {
			if let Some(token) = self.reusable(OffsetDateTime::now_utc()) {
				self.metrics.record_reuse();

				return Ok(token);
			}

			let observed = self.generation.load(Ordering::Acquire);
			let _singleflight = self.refresh_guard.lock().await;

			if self.generation.load(Ordering::Acquire) != observed {
				// Issued while this caller waited, so it is as fresh as a new call would be.
				if let Some(token) = self.current() {
					self.metrics.record_reuse();

					return Ok(token);
				}
			}
			if let Some(token) = self.reusable(OffsetDateTime::now_utc()) {
				self.metrics.record_reuse();

				return Ok(token);
			}

			self.fetch_locked().await
		})
		.await
	}

	/// Unconditionally mints a new token and makes it current.
	pub async fn refresh(&self) -> Result<SessionToken> {
		let span = OpSpan::new(Operation::TokenRefresh, "refresh");

		span.wrap(async {
			let _singleflight = self.refresh_guard.lock().await;

			self.fetch_locked().await
		})
		.await
	}

	/// Drops `token` if it is still the current one; returns whether it was dropped.
	pub fn invalidate(&self, token: &SessionToken) -> bool {
		let mut current = self.current.write();

		match current.as_ref() {
			Some(held) if held.same_secret(token) => {
				*current = None;

				true
			},
			_ => false,
		}
	}

	fn reusable(&self, now: OffsetDateTime) -> Option<SessionToken> {
		if !matches!(self.policy, RefreshPolicy::Cached { .. }) {
			return None;
		}

		self.current
			.read()
			.as_ref()
			.filter(|token| token.is_reusable_at(now, Self::EXPIRY_SKEW))
			.cloned()
	}

	// Must be called with `refresh_guard` held.
	async fn fetch_locked(&self) -> Result<SessionToken> {
		self.metrics.record_attempt();
		obs::record_operation(Operation::TokenRefresh, Outcome::Attempt);

		match self.source.fetch().await {
			Ok(mut token) => {
				if let RefreshPolicy::Cached { ttl } = self.policy {
					if token.expires_at.is_none() {
						token = token.with_lifetime(ttl);
					}
				}

				*self.current.write() = Some(token.clone());
				self.generation.fetch_add(1, Ordering::AcqRel);
				self.metrics.record_success();
				obs::record_operation(Operation::TokenRefresh, Outcome::Success);
				tracing::debug!(issued_at = %token.issued_at, "session token refreshed");

				Ok(token)
			},
			Err(err) => {
				self.metrics.record_failure();
				obs::record_operation(Operation::TokenRefresh, Outcome::Failure);

				if let Error::Authentication { status, reason } = &err {
					tracing::warn!(?status, %reason, "session token refresh rejected");
				} else {
					tracing::warn!(error = %err, "session token refresh failed");
				}

				Err(err)
			},
		}
	}
}
impl Debug for SessionStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionStore")
			.field("policy", &self.policy)
			.field("has_token", &self.current.read().is_some())
			.field("metrics", &self.metrics)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// self
	use super::*;

	#[derive(Default)]
	struct CountingSource {
		calls: AtomicUsize,
		fail: bool,
	}
	impl TokenSource for CountingSource {
		fn fetch(&self) -> TokenFuture<'_> {
			Box::pin(async move {
				let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

				tokio::task::yield_now().await;

				if self.fail {
					return Err(Error::Authentication {
						status: Some(400),
						reason: "invalid_grant".into(),
					});
				}

				Ok(SessionToken::new(format!("token-{call}")))
			})
		}
	}

	fn store(policy: RefreshPolicy) -> (SessionStore, Arc<CountingSource>) {
		let source = Arc::new(CountingSource::default());

		(SessionStore::new(source.clone(), policy), source)
	}

	#[tokio::test]
	async fn every_request_policy_fetches_each_time() {
		let (store, source) = store(RefreshPolicy::EveryRequest);
		let first = store.acquire().await.expect("First acquire should succeed.");
		let second = store.acquire().await.expect("Second acquire should succeed.");

		assert_eq!(first.access_token.expose(), "token-1");
		assert_eq!(second.access_token.expose(), "token-2");
		assert_eq!(source.calls.load(Ordering::SeqCst), 2);
		assert_eq!(store.current().map(|t| t.access_token), Some(second.access_token));
	}

	#[tokio::test]
	async fn cached_policy_reuses_until_invalidated() {
		let (store, source) = store(RefreshPolicy::Cached { ttl: Duration::minutes(30) });
		let first = store.acquire().await.expect("First acquire should succeed.");
		let reused = store.acquire().await.expect("Second acquire should reuse.");

		assert!(first.same_secret(&reused));
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
		assert_eq!(store.metrics().reused(), 1);
		assert!(store.invalidate(&first));
		assert!(!store.invalidate(&first), "A dropped token cannot be dropped twice.");

		let replaced = store.acquire().await.expect("Acquire after invalidation should fetch.");

		assert_eq!(replaced.access_token.expose(), "token-2");
	}

	#[tokio::test]
	async fn cached_policy_singleflights_concurrent_acquires() {
		let (store, source) = store(RefreshPolicy::Cached { ttl: Duration::minutes(30) });
		let (a, b, c) = tokio::join!(store.acquire(), store.acquire(), store.acquire());

		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
		assert!(a.expect("a").same_secret(&b.expect("b")));
		assert_eq!(c.expect("c").access_token.expose(), "token-1");
	}

	#[tokio::test]
	async fn invalidate_ignores_stale_tokens() {
		let (store, _source) = store(RefreshPolicy::Cached { ttl: Duration::minutes(30) });
		let _current = store.acquire().await.expect("Acquire should succeed.");

		assert!(!store.invalidate(&SessionToken::new("someone-else")));
		assert!(store.current().is_some());
	}

	#[tokio::test]
	async fn refresh_failures_are_counted_and_propagated() {
		let source = Arc::new(CountingSource { fail: true, ..Default::default() });
		let store = SessionStore::new(source, RefreshPolicy::EveryRequest);
		let err = store.acquire().await.expect_err("Failing source must propagate.");

		assert!(matches!(err, Error::Authentication { .. }));
		assert_eq!(store.metrics().attempts(), 1);
		assert_eq!(store.metrics().failures(), 1);
		assert!(store.current().is_none());
	}

	#[tokio::test]
	async fn forced_refresh_replaces_cached_token() {
		let (store, _source) = store(RefreshPolicy::Cached { ttl: Duration::minutes(30) });
		let first = store.acquire().await.expect("Acquire should succeed.");
		let forced = store.refresh().await.expect("Forced refresh should succeed.");

		assert!(!first.same_secret(&forced));
		assert!(store.current().expect("Token should be held.").same_secret(&forced));
	}
}
