//! Issued credential record and its lifecycle helpers.

// self
use crate::{_prelude::*, auth::AccessToken, error::IssuanceError};

/// Lifecycle status of a [`Credential`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialStatus {
	/// The credential may still be presented.
	Active,
	/// The credential's declared lifetime has elapsed.
	Expired,
}

/// Access credential issued by the token endpoint.
#[derive(Clone)]
pub struct Credential {
	/// Bearer token value; callers must avoid logging it.
	pub access_token: AccessToken,
	/// Token type declared by the issuer, normally `Bearer`.
	pub token_type: String,
	/// Instant the issuance response was accepted.
	pub issued_at: OffsetDateTime,
	/// Instant after which the credential is no longer presented.
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Creates a credential valid for `expires_in` after `issued_at`.
	///
	/// Fails when the expiry instant is not representable.
	pub fn new(
		access_token: AccessToken,
		token_type: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Result<Self, IssuanceError> {
		let expires_at =
			issued_at.checked_add(expires_in).ok_or(IssuanceError::ExpiresInOutOfRange)?;

		Ok(Self { access_token, token_type: token_type.into(), issued_at, expires_at })
	}

	/// Computes the lifecycle status at `instant`.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		if instant >= self.expires_at { CredentialStatus::Expired } else { CredentialStatus::Active }
	}

	/// Returns `true` if the credential has expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}

	/// Time left before expiry, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &self.access_token)
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
