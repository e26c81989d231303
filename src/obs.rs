//! Observability helpers shared by the token manager, API service, and scheduler.
//!
//! - Every operation runs inside a `token_poller.op` span carrying the `op` field.
//! - Enable the `metrics` feature to increment the `token_poller_op_total` counter for every
//!   outcome, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the poller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Credential acquisition, including any issuance call.
	Issuance,
	/// One authenticated request against the protected resource.
	Fetch,
	/// One scheduler tick.
	Tick,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Issuance => "issuance",
			OpKind::Fetch => "fetch",
			OpKind::Tick => "tick",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// A network call was about to be made.
	Attempt,
	/// A cached credential satisfied the request.
	CacheHit,
	/// The quota refused the attempt before any network call.
	Refused,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::CacheHit => "cache_hit",
			OpOutcome::Refused => "refused",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
