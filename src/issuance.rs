//! Client-credentials exchange against the token endpoint.
//!
//! The request is a JSON document (not the form encoding of RFC 6749) carrying the grant type
//! and the client's identifier and secret. A 2xx response must decode into [`TokenResponse`];
//! anything else is classified as an [`IssuanceError`].

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientSecret, Credential},
	error::{IssuanceError, TransportError},
	http::{HttpClient, HttpRequest},
};

const GRANT_TYPE: &str = "client_credentials";
const BODY_PREVIEW_LIMIT: usize = 256;

/// Static parameters of the client-credentials grant.
#[derive(Clone, Debug)]
pub struct IssuerSettings {
	/// Token endpoint URL.
	pub token_url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: ClientSecret,
}
impl IssuerSettings {
	/// Creates settings for the given endpoint and client pair.
	pub fn new(token_url: Url, client_id: impl Into<String>, client_secret: ClientSecret) -> Self {
		Self { token_url, client_id: client_id.into(), client_secret }
	}
}

/// JSON body posted to the token endpoint.
#[derive(Serialize)]
pub struct ClientCredentialsRequest<'a> {
	/// Always `client_credentials`.
	pub grant_type: &'static str,
	/// OAuth client identifier.
	pub client_id: &'a str,
	/// OAuth client secret.
	pub client_secret: &'a str,
}
impl<'a> ClientCredentialsRequest<'a> {
	/// Borrows the grant parameters from `settings`.
	pub fn from_settings(settings: &'a IssuerSettings) -> Self {
		Self {
			grant_type: GRANT_TYPE,
			client_id: &settings.client_id,
			client_secret: settings.client_secret.expose(),
		}
	}
}

/// Successful token endpoint response.
#[derive(Deserialize)]
pub struct TokenResponse {
	/// Opaque bearer token.
	pub access_token: String,
	/// Token type, normally `Bearer`; not validated.
	pub token_type: String,
	/// Lifetime in seconds.
	pub expires_in: i64,
}
impl TokenResponse {
	/// Converts the response into a [`Credential`] issued at `issued_at`.
	pub fn into_credential(self, issued_at: OffsetDateTime) -> Result<Credential, IssuanceError> {
		if self.expires_in <= 0 {
			return Err(IssuanceError::NonPositiveExpiresIn);
		}

		Credential::new(
			AccessToken::new(self.access_token),
			self.token_type,
			issued_at,
			Duration::seconds(self.expires_in),
		)
	}
}

/// Performs one client-credentials exchange and stamps the result with `issued_at`.
pub async fn request_credential<C>(
	http_client: &C,
	settings: &IssuerSettings,
	issued_at: OffsetDateTime,
) -> Result<Credential, IssuanceError>
where
	C: ?Sized + HttpClient,
{
	let body = serde_json::to_vec(&ClientCredentialsRequest::from_settings(settings))
		.map_err(IssuanceError::Encode)?;
	let request = HttpRequest::post_json(settings.token_url.clone(), body);
	let response = http_client
		.send(request)
		.await
		.map_err(|e| IssuanceError::Transport(TransportError::network("token endpoint", e)))?;

	if !response.is_success() {
		return Err(IssuanceError::Status {
			status: response.status,
			body_preview: response.body_preview(BODY_PREVIEW_LIMIT),
		});
	}

	let deserializer = &mut serde_json::Deserializer::from_slice(&response.body);
	let token: TokenResponse = serde_path_to_error::deserialize(deserializer)
		.map_err(|source| IssuanceError::Parse { source, status: response.status })?;

	token.into_credential(issued_at)
}
