//! Transport primitives for token issuance and resource polling.
//!
//! [`HttpClient`] is the poller's only dependency on an HTTP stack. It accepts a fully built
//! [`HttpRequest`] and resolves to an [`HttpResponse`] carrying the status code and the raw
//! body; classification of statuses happens in the callers so that every transport reports
//! `401` the same way. [`ReqwestHttpClient`] is the default implementation.

// self
use crate::_prelude::*;

/// Boxed future returned by [`HttpClient::send`].
pub type HttpFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of issuing the poller's POST and GET calls.
///
/// Implementations must be `Send + Sync + 'static` so a single handle can be shared (behind
/// `Arc`) by the token manager and the API service, letting the transport pool connections
/// across calls. A non-2xx response is not an error at this layer.
pub trait HttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes `request` and returns the response status and body.
	fn send(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError>;
}

/// HTTP methods used by the poller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
	/// `GET`, used against the protected resource.
	Get,
	/// `POST`, used against the token endpoint.
	Post,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outbound request handed to an [`HttpClient`].
#[derive(Clone)]
pub struct HttpRequest {
	/// Request method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Header name/value pairs, applied in order.
	pub headers: Vec<(&'static str, String)>,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Builds a `POST` carrying a JSON body.
	pub fn post_json(url: Url, body: Vec<u8>) -> Self {
		Self {
			method: Method::Post,
			url,
			headers: vec![("content-type", "application/json".into())],
			body: Some(body),
		}
	}

	/// Builds a bodiless `GET`.
	pub fn get(url: Url) -> Self {
		Self { method: Method::Get, url, headers: Vec::new(), body: None }
	}

	/// Attaches an `Authorization: Bearer <token>` header.
	pub fn bearer_auth(mut self, token: &str) -> Self {
		self.headers.push(("authorization", format!("Bearer {token}")));

		self
	}

	/// Returns the first header value matching `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| match name.eq_ignore_ascii_case("authorization") {
				true => (*name, "<redacted>"),
				false => (*name, value.as_str()),
			})
			.collect::<Vec<_>>();

		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// Response status and body returned by an [`HttpClient`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` when the server rejected the caller's credentials.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Returns up to `limit` bytes of the body, lossily decoded for diagnostics.
	pub fn body_preview(&self, limit: usize) -> String {
		let end = self.body.len().min(limit);

		String::from_utf8_lossy(&self.body[..end]).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Cloning is cheap; clones share the same connection pool.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a pooled client whose requests time out after `timeout`.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl HttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn send(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
			};
			let mut builder = self.0.request(method, request.url);

			for (name, value) in request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url() -> Url {
		Url::parse("https://api.example.com/data").expect("Fixture URL should parse.")
	}

	#[test]
	fn bearer_header_is_attached_and_redacted() {
		let request = HttpRequest::get(url()).bearer_auth("abc");

		assert_eq!(request.header("Authorization"), Some("Bearer abc"));
		assert!(!format!("{request:?}").contains("abc"));
	}

	#[test]
	fn post_json_sets_content_type() {
		let request = HttpRequest::post_json(url(), b"{}".to_vec());

		assert_eq!(request.method, Method::Post);
		assert_eq!(request.header("content-type"), Some("application/json"));
		assert_eq!(request.body.as_deref(), Some(&b"{}"[..]));
	}

	#[test]
	fn status_helpers_classify_codes() {
		assert!(HttpResponse::new(204, "").is_success());
		assert!(!HttpResponse::new(302, "").is_success());
		assert!(HttpResponse::new(401, "").is_unauthorized());
		assert!(!HttpResponse::new(403, "").is_unauthorized());
		assert_eq!(HttpResponse::new(500, "boom-boom").body_preview(4), "boom");
	}
}
