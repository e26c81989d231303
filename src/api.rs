//! Authenticated polling of the protected resource.

// self
use crate::{
	_prelude::*,
	error::TransportError,
	http::{HttpClient, HttpRequest},
	obs::{self, OpKind, OpOutcome, OpSpan},
	token_manager::TokenManager,
};

/// Result of one [`ApiService::fetch_data`] invocation.
#[derive(Debug)]
pub enum FetchOutcome {
	/// The resource answered 2xx.
	Fetched {
		/// HTTP status code.
		status: u16,
		/// Length of the accepted body in bytes.
		body_len: usize,
	},
	/// The invocation did not yield a 2xx body; the error says why.
	Failed(Error),
}
impl FetchOutcome {
	/// Returns `true` for [`FetchOutcome::Fetched`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Fetched { .. })
	}

	/// Returns the failure, if any.
	pub fn error(&self) -> Option<&Error> {
		match self {
			Self::Fetched { .. } => None,
			Self::Failed(e) => Some(e),
		}
	}
}

/// Performs one authenticated GET per invocation, using a [`TokenManager`] as credential source.
pub struct ApiService<C>
where
	C: ?Sized + HttpClient,
{
	http_client: Arc<C>,
	tokens: Arc<TokenManager<C>>,
	resource_url: Url,
}
impl<C> ApiService<C>
where
	C: ?Sized + HttpClient,
{
	/// Creates a service that polls `resource_url`.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		tokens: Arc<TokenManager<C>>,
		resource_url: Url,
	) -> Self {
		Self { http_client: http_client.into(), tokens, resource_url }
	}

	/// Returns the token manager backing this service.
	pub fn tokens(&self) -> &Arc<TokenManager<C>> {
		&self.tokens
	}

	/// Acquires a credential and performs a single authenticated GET.
	///
	/// Never retries. A `401` invalidates the cached credential so the next invocation
	/// re-issues; other failures leave it in place.
	pub async fn fetch_data(&self) -> FetchOutcome {
		const KIND: OpKind = OpKind::Fetch;

		let span = OpSpan::new(KIND);

		span.instrument(async move {
			let token = match self.tokens.acquire_token().await {
				Ok(token) => token,
				Err(e) => {
					tracing::warn!(
						kind = e.kind(),
						error = %e,
						"No credential available, skipping request."
					);
					obs::record_op_outcome(KIND, OpOutcome::Refused);

					return FetchOutcome::Failed(e);
				},
			};

			obs::record_op_outcome(KIND, OpOutcome::Attempt);

			let request = HttpRequest::get(self.resource_url.clone()).bearer_auth(token.expose());
			let response = match self.http_client.send(request).await {
				Ok(response) => response,
				Err(e) => {
					let e = Error::RequestFailed(TransportError::network("resource endpoint", e));

					tracing::warn!(error = %e, "Resource request failed.");
					obs::record_op_outcome(KIND, OpOutcome::Failure);

					return FetchOutcome::Failed(e);
				},
			};

			if response.is_success() {
				let body_len = response.body.len();

				tracing::info!(status = response.status, body_len, "Resource fetched.");
				obs::record_op_outcome(KIND, OpOutcome::Success);

				return FetchOutcome::Fetched { status: response.status, body_len };
			}

			obs::record_op_outcome(KIND, OpOutcome::Failure);

			if response.is_unauthorized() {
				tracing::warn!(status = response.status, "Resource rejected the credential.");
				self.tokens.invalidate();

				return FetchOutcome::Failed(Error::Unauthorized { status: response.status });
			}

			tracing::warn!(status = response.status, "Resource returned an error status.");

			FetchOutcome::Failed(Error::OtherHttpError { status: response.status })
		})
		.await
	}
}
impl<C> Debug for ApiService<C>
where
	C: ?Sized + HttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiService")
			.field("resource_url", &self.resource_url.as_str())
			.field("tokens", &self.tokens)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, auth::QuotaPolicy, http::HttpResponse};

	fn service(client: &Arc<ScriptedHttpClient>) -> ApiService<ScriptedHttpClient> {
		let tokens: Arc<TokenManager<ScriptedHttpClient>> =
			Arc::new(TokenManager::new(client.clone(), issuer_settings(), QuotaPolicy::default()));

		ApiService::new(
			client.clone(),
			tokens,
			Url::parse("https://api.example.com/data").expect("Fixture URL should parse."),
		)
	}

	#[tokio::test]
	async fn success_attaches_bearer_header() {
		let client = Arc::new(ScriptedHttpClient::new());

		client.push_token(token_reply("abc", 3600)).push_resource(Ok(HttpResponse::new(200, "{}")));

		let outcome = service(&client).fetch_data().await;

		assert!(matches!(outcome, FetchOutcome::Fetched { status: 200, body_len: 2 }));

		let requests = client.requests();
		let get = requests.last().expect("A resource request should be recorded.");

		assert_eq!(get.header("authorization"), Some("Bearer abc"));
	}

	#[tokio::test]
	async fn unauthorized_invalidates_credential() {
		let client = Arc::new(ScriptedHttpClient::new());

		client
			.push_token(token_reply("abc", 3600))
			.push_token(token_reply("def", 3600))
			.push_resource(Ok(HttpResponse::new(401, "")));

		let service = service(&client);
		let outcome = service.fetch_data().await;

		assert!(matches!(outcome.error(), Some(Error::Unauthorized { status: 401 })));
		assert!(service.tokens().snapshot().expires_at.is_none());

		let outcome = service.fetch_data().await;

		assert!(outcome.is_success());
		assert_eq!(client.token_calls(), 2);

		let requests = client.requests();

		assert_eq!(requests.last().and_then(|r| r.header("authorization")), Some("Bearer def"));
	}

	#[tokio::test]
	async fn server_error_keeps_credential() {
		let client = Arc::new(ScriptedHttpClient::new());

		client.push_token(token_reply("abc", 3600)).push_resource(Ok(HttpResponse::new(500, "")));

		let service = service(&client);
		let outcome = service.fetch_data().await;

		assert!(matches!(outcome.error(), Some(Error::OtherHttpError { status: 500 })));

		service.fetch_data().await;

		assert_eq!(client.token_calls(), 1);
	}

	#[tokio::test]
	async fn transport_failure_keeps_credential() {
		let client = Arc::new(ScriptedHttpClient::new());

		client.push_token(token_reply("abc", 3600)).push_resource(Err(ScriptedTransportError));

		let service = service(&client);
		let outcome = service.fetch_data().await;

		assert!(matches!(outcome.error(), Some(Error::RequestFailed(_))));
		assert!(service.tokens().snapshot().active);
	}

	#[tokio::test]
	async fn refusal_skips_request() {
		let client = Arc::new(ScriptedHttpClient::new());
		let outcome = service(&client).fetch_data().await;

		assert!(matches!(outcome.error(), Some(Error::IssuanceFailed(_))));
		assert_eq!(client.resource_calls(), 0);
	}
}
