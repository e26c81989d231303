// crates.io
use tracing::{Span, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::OpKind};

/// Span wrapper used by every poller operation.
#[derive(Clone, Debug)]
pub struct OpSpan {
	span: Span,
}
impl OpSpan {
	/// Creates a new span tagged with the operation kind.
	pub fn new(kind: OpKind) -> Self {
		Self { span: tracing::info_span!("token_poller.op", op = kind.as_str()) }
	}

	/// Creates a span for one scheduler tick, tagged with its sequence number.
	pub fn tick(sequence: u64) -> Self {
		Self { span: tracing::info_span!("token_poller.op", op = OpKind::Tick.as_str(), sequence) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OpSpan::new(OpKind::Fetch);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
