//! Single source of truth for the current bearer credential and the issuance quota.
//!
//! [`TokenManager::acquire_token`] returns the cached credential while it is unexpired and
//! only calls the token endpoint on a miss. Misses are serialized behind a singleflight guard,
//! so concurrent callers never both charge the quota for the same refresh: the first caller
//! issues, the rest wake up and reuse its credential.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credential, QuotaDecision, QuotaPolicy, QuotaSnapshot, QuotaWindow},
	http::HttpClient,
	issuance::{self, IssuerSettings},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Read-only view of the manager's state. Never contains the token itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSnapshot {
	/// Expiry of the cached credential, if one is held.
	pub expires_at: Option<OffsetDateTime>,
	/// Whether the cached credential is usable at the observed instant.
	pub active: bool,
	/// Quota window state at the observed instant.
	pub quota: QuotaSnapshot,
}

struct TokenState {
	credential: Option<Credential>,
	quota: QuotaWindow,
}

/// Owns the cached [`Credential`] and the [`QuotaWindow`] guarding issuance.
pub struct TokenManager<C>
where
	C: ?Sized + HttpClient,
{
	http_client: Arc<C>,
	settings: IssuerSettings,
	state: Mutex<TokenState>,
	issuance_guard: AsyncMutex<()>,
}
impl<C> TokenManager<C>
where
	C: ?Sized + HttpClient,
{
	/// Creates a manager whose first quota window opens now.
	pub fn new(http_client: impl Into<Arc<C>>, settings: IssuerSettings, policy: QuotaPolicy) -> Self {
		Self::with_started_at(http_client, settings, policy, OffsetDateTime::now_utc())
	}

	/// Creates a manager whose first quota window opens at `started_at`.
	pub fn with_started_at(
		http_client: impl Into<Arc<C>>,
		settings: IssuerSettings,
		policy: QuotaPolicy,
		started_at: OffsetDateTime,
	) -> Self {
		Self {
			http_client: http_client.into(),
			settings,
			state: Mutex::new(TokenState {
				credential: None,
				quota: QuotaWindow::new(policy, started_at),
			}),
			issuance_guard: AsyncMutex::new(()),
		}
	}

	/// Returns a usable bearer token, issuing a new one if the cache is empty or expired.
	///
	/// Fails with [`Error::QuotaExceeded`] when the window is exhausted (no network call is
	/// made) and with [`Error::IssuanceFailed`] when the token endpoint does not produce a
	/// credential. Both are "try again later" conditions.
	pub async fn acquire_token(&self) -> Result<AccessToken> {
		self.acquire_token_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`acquire_token`](Self::acquire_token) with an explicit observation instant.
	pub async fn acquire_token_at(&self, now: OffsetDateTime) -> Result<AccessToken> {
		const KIND: OpKind = OpKind::Issuance;

		let span = OpSpan::new(KIND);

		span.instrument(async move {
			if let Some(token) = self.cached_at(now) {
				return Ok(token);
			}

			let _singleflight = self.issuance_guard.lock().await;

			// Another caller may have issued while we waited.
			if let Some(token) = self.cached_at(now) {
				return Ok(token);
			}

			let decision = self.state.lock().quota.charge_at(now);
			let cap = self.policy().cap;
			let attempt = match decision {
				QuotaDecision::Allow { attempt } => attempt,
				QuotaDecision::Refuse { retry_at } => {
					tracing::warn!(cap, retry_at = ?retry_at, "Issuance quota exhausted, refusing.");
					obs::record_op_outcome(KIND, OpOutcome::Refused);

					return Err(Error::QuotaExceeded { cap, retry_at });
				},
			};

			tracing::info!(attempt, cap, "Requesting a new credential.");
			obs::record_op_outcome(KIND, OpOutcome::Attempt);

			match issuance::request_credential(self.http_client.as_ref(), &self.settings, now).await
			{
				Ok(credential) => {
					let token = credential.access_token.clone();

					tracing::info!(
						token_type = %credential.token_type,
						expires_at = %credential.expires_at,
						"New credential is active."
					);
					self.state.lock().credential = Some(credential);
					obs::record_op_outcome(KIND, OpOutcome::Success);

					Ok(token)
				},
				Err(e) => {
					tracing::warn!(attempt, error = %e, "Credential issuance failed.");
					obs::record_op_outcome(KIND, OpOutcome::Failure);

					Err(e.into())
				},
			}
		})
		.await
	}

	/// Drops the cached credential so the next acquisition re-issues. Quota is untouched.
	pub fn invalidate(&self) {
		let dropped = self.state.lock().credential.take().is_some();

		tracing::info!(dropped, "Cached credential invalidated.");
	}

	/// Returns the manager's state as observed now.
	pub fn snapshot(&self) -> TokenSnapshot {
		self.snapshot_at(OffsetDateTime::now_utc())
	}

	/// Returns the manager's state as observed at `now`.
	pub fn snapshot_at(&self, now: OffsetDateTime) -> TokenSnapshot {
		let state = self.state.lock();
		let expires_at = state.credential.as_ref().map(|c| c.expires_at);

		TokenSnapshot {
			expires_at,
			active: state.credential.as_ref().is_some_and(|c| !c.is_expired_at(now)),
			quota: state.quota.snapshot_at(now),
		}
	}

	/// Returns the quota policy in force.
	pub fn policy(&self) -> QuotaPolicy {
		self.state.lock().quota.policy()
	}

	fn cached_at(&self, now: OffsetDateTime) -> Option<AccessToken> {
		let state = self.state.lock();
		let credential = state.credential.as_ref().filter(|c| !c.is_expired_at(now))?;

		tracing::info!(
			expires_at = %credential.expires_at,
			remaining_secs = credential.remaining_at(now).whole_seconds(),
			"Reusing cached credential."
		);
		obs::record_op_outcome(OpKind::Issuance, OpOutcome::CacheHit);

		Some(credential.access_token.clone())
	}
}
impl<C> Debug for TokenManager<C>
where
	C: ?Sized + HttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("token_url", &self.settings.token_url.as_str())
			.field("client_id", &self.settings.client_id)
			.field("client_secret_set", &!self.settings.client_secret.is_empty())
			.finish()
	}
}
