//! Issuance quota bookkeeping consulted before every call to the token endpoint.
//!
//! The window charges one unit per issuance *attempt*, successful or not. Once the cap is
//! reached, attempts are refused until the window resets. Whether it ever resets is a policy
//! decision captured by [`QuotaReset`].

// self
use crate::_prelude::*;

/// When an exhausted quota window becomes usable again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum QuotaReset {
	/// The count resets every window length, measured from startup.
	#[default]
	Rolling,
	/// The window end is fixed at startup and never advances, making the cap a lifetime cap.
	Never,
}
impl QuotaReset {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			QuotaReset::Rolling => "rolling",
			QuotaReset::Never => "never",
		}
	}
}
impl Display for QuotaReset {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Static limits applied by a [`QuotaWindow`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaPolicy {
	/// Maximum issuance attempts per window.
	pub cap: u32,
	/// Window length.
	pub window: Duration,
	/// Reset behavior once the window end passes.
	pub reset: QuotaReset,
}
impl QuotaPolicy {
	/// Five attempts per hour.
	pub const DEFAULT_CAP: u32 = 5;
	/// One hour.
	pub const DEFAULT_WINDOW: Duration = Duration::HOUR;

	/// Creates a policy allowing `cap` attempts per `window`.
	pub fn new(cap: u32, window: Duration) -> Self {
		Self { cap, window, reset: QuotaReset::default() }
	}

	/// Overrides the reset behavior.
	pub fn with_reset(mut self, reset: QuotaReset) -> Self {
		self.reset = reset;

		self
	}
}
impl Default for QuotaPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_CAP, Self::DEFAULT_WINDOW)
	}
}

/// Result of charging a [`QuotaWindow`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuotaDecision {
	/// The attempt was charged and may proceed.
	Allow {
		/// One-based attempt number within the current window.
		attempt: u32,
	},
	/// The window is exhausted; nothing was charged.
	Refuse {
		/// Instant the window resets, or `None` when it never does.
		retry_at: Option<OffsetDateTime>,
	},
}

/// Read-only view of a [`QuotaWindow`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaSnapshot {
	/// Attempts charged in the current window.
	pub issued_count: u32,
	/// Attempts still available in the current window.
	pub remaining: u32,
	/// Instant the current window ends.
	pub window_reset_at: OffsetDateTime,
}

/// Issuance counter for the current window.
#[derive(Clone, Debug)]
pub struct QuotaWindow {
	policy: QuotaPolicy,
	issued_count: u32,
	window_reset_at: OffsetDateTime,
}
impl QuotaWindow {
	/// Opens the first window at `started_at`.
	pub fn new(policy: QuotaPolicy, started_at: OffsetDateTime) -> Self {
		Self { policy, issued_count: 0, window_reset_at: started_at + policy.window }
	}

	/// Returns the policy this window enforces.
	pub fn policy(&self) -> QuotaPolicy {
		self.policy
	}

	/// Charges one attempt at `now`, or refuses if the cap is reached.
	pub fn charge_at(&mut self, now: OffsetDateTime) -> QuotaDecision {
		self.roll(now);

		if self.issued_count >= self.policy.cap {
			let retry_at = match self.policy.reset {
				QuotaReset::Rolling => Some(self.window_reset_at),
				QuotaReset::Never => None,
			};

			return QuotaDecision::Refuse { retry_at };
		}

		self.issued_count += 1;

		QuotaDecision::Allow { attempt: self.issued_count }
	}

	/// Returns the window state as observed at `now`, without charging.
	pub fn snapshot_at(&self, now: OffsetDateTime) -> QuotaSnapshot {
		let mut view = self.clone();

		view.roll(now);

		QuotaSnapshot {
			issued_count: view.issued_count,
			remaining: view.policy.cap.saturating_sub(view.issued_count),
			window_reset_at: view.window_reset_at,
		}
	}

	fn roll(&mut self, now: OffsetDateTime) {
		if self.policy.reset == QuotaReset::Never || !self.policy.window.is_positive() {
			return;
		}
		if now < self.window_reset_at {
			return;
		}

		self.issued_count = 0;

		while self.window_reset_at <= now {
			self.window_reset_at += self.policy.window;
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const START: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

	#[test]
	fn cap_refuses_after_five_attempts() {
		let mut window = QuotaWindow::new(QuotaPolicy::default(), START);

		for expected in 1..=5 {
			assert_eq!(window.charge_at(START), QuotaDecision::Allow { attempt: expected });
		}

		assert_eq!(
			window.charge_at(START + Duration::minutes(59)),
			QuotaDecision::Refuse { retry_at: Some(macros::datetime!(2025-01-01 01:00 UTC)) }
		);
		assert_eq!(window.snapshot_at(START).remaining, 0);
	}

	#[test]
	fn rolling_window_resets_and_realigns() {
		let mut window = QuotaWindow::new(QuotaPolicy::new(1, Duration::HOUR), START);

		assert!(matches!(window.charge_at(START), QuotaDecision::Allow { attempt: 1 }));
		assert!(matches!(window.charge_at(START), QuotaDecision::Refuse { .. }));

		let later = macros::datetime!(2025-01-01 03:30 UTC);

		assert_eq!(window.charge_at(later), QuotaDecision::Allow { attempt: 1 });
		assert_eq!(
			window.snapshot_at(later).window_reset_at,
			macros::datetime!(2025-01-01 04:00 UTC)
		);
	}

	#[test]
	fn never_reset_is_a_lifetime_cap() {
		let policy = QuotaPolicy::new(2, Duration::HOUR).with_reset(QuotaReset::Never);
		let mut window = QuotaWindow::new(policy, START);

		window.charge_at(START);
		window.charge_at(START);

		assert_eq!(
			window.charge_at(START + Duration::days(3)),
			QuotaDecision::Refuse { retry_at: None }
		);
	}

	#[test]
	fn snapshot_does_not_charge() {
		let window = QuotaWindow::new(QuotaPolicy::default(), START);
		let snapshot = window.snapshot_at(START);

		assert_eq!(snapshot.issued_count, 0);
		assert_eq!(snapshot.remaining, QuotaPolicy::DEFAULT_CAP);
	}
}
