//! Poller-wide error types shared by the token manager, the API service, and startup code.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every runtime variant is recoverable; the scheduler logs it and waits for the next tick.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Issuance was attempted while the quota window was exhausted.
	#[error("Issuance quota of {cap} attempts is exhausted.")]
	QuotaExceeded {
		/// Configured number of attempts per window.
		cap: u32,
		/// Instant at which the window resets, if it ever does.
		retry_at: Option<OffsetDateTime>,
	},
	/// The token endpoint did not produce a usable credential.
	#[error(transparent)]
	IssuanceFailed(#[from] IssuanceError),
	/// Transport failure while calling the protected resource.
	#[error("Request to the resource endpoint failed.")]
	RequestFailed(#[source] TransportError),
	/// The protected resource rejected the bearer credential.
	#[error("Resource endpoint rejected the credential with HTTP {status}.")]
	Unauthorized {
		/// HTTP status code returned by the resource endpoint.
		status: u16,
	},
	/// The protected resource answered with a non-success status other than `401`.
	#[error("Resource endpoint returned HTTP {status}.")]
	OtherHttpError {
		/// HTTP status code returned by the resource endpoint.
		status: u16,
	},
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns a stable label suitable for log fields.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::QuotaExceeded { .. } => "quota_exceeded",
			Self::IssuanceFailed(_) => "issuance_failed",
			Self::RequestFailed(_) => "request_failed",
			Self::Unauthorized { .. } => "unauthorized",
			Self::OtherHttpError { .. } => "other_http_error",
			Self::Config(_) => "config",
		}
	}
}

/// Failures raised while exchanging client credentials for an access token.
#[derive(Debug, ThisError)]
pub enum IssuanceError {
	/// The request payload could not be encoded.
	#[error("Token request could not be encoded.")]
	Encode(#[source] serde_json::Error),
	/// Transport failure while calling the token endpoint.
	#[error("Token endpoint could not be reached.")]
	Transport(#[source] TransportError),
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint returned HTTP {status}.")]
	Status {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Leading bytes of the response body, lossily decoded.
		body_preview: String,
	},
	/// Token endpoint answered 2xx with a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure, including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code returned by the token endpoint.
		status: u16,
	},
	/// Token endpoint returned a zero or negative lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned a lifetime that overflows the expiry instant.
	#[error("The expires_in value is out of range.")]
	ExpiresInOutOfRange,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Which endpoint was being called.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error raised against `endpoint`.
	pub fn network(endpoint: &'static str, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured endpoint is not a valid absolute URL.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Configuration field that failed to parse.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured endpoint uses a scheme other than http or https.
	#[error("The {field} URL must use http or https, got `{scheme}`.")]
	UnsupportedScheme {
		/// Configuration field carrying the URL.
		field: &'static str,
		/// Offending scheme.
		scheme: String,
	},
	/// A numeric setting must be greater than zero.
	#[error("The {field} setting must be greater than zero.")]
	Zero {
		/// Configuration field that was zero.
		field: &'static str,
	},
	/// Client identifier is empty.
	#[error("Client identifier must not be empty.")]
	EmptyClientId,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
