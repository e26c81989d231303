//! Fixed-cadence driver for [`ApiService::fetch_data`].
//!
//! Ticks never overlap: each tick runs its calls sequentially to completion before the
//! ticker is awaited again, and ticks missed while a slow tick was running are skipped
//! rather than replayed in a burst.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::time::{self, MissedTickBehavior};
// self
use crate::{
	_prelude::*,
	api::{ApiService, FetchOutcome},
	http::HttpClient,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Runs the API service immediately and then every interval until shutdown.
pub struct Scheduler<C>
where
	C: ?Sized + HttpClient,
{
	api: Arc<ApiService<C>>,
	interval: StdDuration,
	calls_per_tick: u32,
}
impl<C> Scheduler<C>
where
	C: ?Sized + HttpClient,
{
	/// Five minutes.
	pub const DEFAULT_INTERVAL: StdDuration = StdDuration::from_secs(300);
	/// Two back-to-back calls per tick.
	pub const DEFAULT_CALLS_PER_TICK: u32 = 2;

	/// Creates a scheduler firing every `interval`.
	///
	/// A zero `interval` is raised to one millisecond.
	pub fn new(api: Arc<ApiService<C>>, interval: StdDuration) -> Self {
		Self {
			api,
			interval: interval.max(StdDuration::from_millis(1)),
			calls_per_tick: Self::DEFAULT_CALLS_PER_TICK,
		}
	}

	/// Overrides how many times `fetch_data` runs per tick.
	pub fn with_calls_per_tick(mut self, calls: u32) -> Self {
		self.calls_per_tick = calls;

		self
	}

	/// Returns the tick period.
	pub fn interval(&self) -> StdDuration {
		self.interval
	}

	/// Runs one tick: `calls_per_tick` sequential fetches.
	pub async fn tick(&self, sequence: u64) -> Vec<FetchOutcome> {
		let span = OpSpan::tick(sequence);

		span.instrument(async move {
			let mut outcomes = Vec::with_capacity(self.calls_per_tick as usize);

			for _ in 0..self.calls_per_tick {
				outcomes.push(self.api.fetch_data().await);
			}

			let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
			let failed = outcomes.len() - succeeded;

			tracing::info!(succeeded, failed, "Tick complete.");
			obs::record_op_outcome(
				OpKind::Tick,
				if failed == 0 { OpOutcome::Success } else { OpOutcome::Failure },
			);

			outcomes
		})
		.await
	}

	/// Ticks until `shutdown` resolves and returns the number of completed ticks.
	///
	/// A tick that is still running when `shutdown` resolves is dropped; its in-flight
	/// requests are abandoned.
	pub async fn run_until<F>(&self, shutdown: F) -> u64
	where
		F: Future<Output = ()>,
	{
		let mut ticker = time::interval(self.interval);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		tokio::pin!(shutdown);

		tracing::info!(
			interval_secs = self.interval.as_secs(),
			calls_per_tick = self.calls_per_tick,
			"Scheduler started."
		);

		let mut completed = 0_u64;

		loop {
			tokio::select! {
				biased;
				_ = &mut shutdown => break,
				_ = ticker.tick() => {},
			}
			tokio::select! {
				biased;
				_ = &mut shutdown => {
					tracing::warn!(
						sequence = completed + 1,
						"Shutdown during tick, abandoning in-flight requests."
					);

					break;
				},
				_ = self.tick(completed + 1) => completed += 1,
			}
		}

		tracing::info!(completed, "Scheduler stopped.");

		completed
	}
}
impl<C> Debug for Scheduler<C>
where
	C: ?Sized + HttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Scheduler")
			.field("api", &self.api)
			.field("interval", &self.interval)
			.field("calls_per_tick", &self.calls_per_tick)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, auth::QuotaPolicy, http::HttpResponse, token_manager::TokenManager};

	fn scheduler(client: &Arc<ScriptedHttpClient>, calls: u32) -> Scheduler<ScriptedHttpClient> {
		let tokens: Arc<TokenManager<ScriptedHttpClient>> =
			Arc::new(TokenManager::new(client.clone(), issuer_settings(), QuotaPolicy::default()));
		let api = ApiService::new(
			client.clone(),
			tokens,
			Url::parse("https://api.example.com/data").expect("Fixture URL should parse."),
		);

		Scheduler::new(Arc::new(api), Scheduler::<ScriptedHttpClient>::DEFAULT_INTERVAL)
			.with_calls_per_tick(calls)
	}

	#[tokio::test]
	async fn tick_runs_configured_call_count() {
		let client = Arc::new(ScriptedHttpClient::new());

		client.push_token(token_reply("abc", 3600));

		let outcomes = scheduler(&client, 3).tick(1).await;

		assert_eq!(outcomes.len(), 3);
		assert!(outcomes.iter().all(FetchOutcome::is_success));
		assert_eq!(client.token_calls(), 1);
		assert_eq!(client.resource_calls(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn runs_immediately_then_every_interval() {
		let client = Arc::new(ScriptedHttpClient::new());

		client.push_token(token_reply("abc", 3600));

		let scheduler = scheduler(&client, 2);
		let completed = scheduler.run_until(time::sleep(StdDuration::from_secs(601))).await;

		assert_eq!(completed, 3);
		assert_eq!(client.resource_calls(), 6);
		assert_eq!(client.token_calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn failures_do_not_stop_the_loop() {
		let client = Arc::new(ScriptedHttpClient::new());

		client
			.push_token(token_reply("abc", 3600))
			.push_resource(Ok(HttpResponse::new(503, "")))
			.push_resource(Err(ScriptedTransportError));

		let scheduler = scheduler(&client, 1);
		let completed = scheduler.run_until(time::sleep(StdDuration::from_secs(301))).await;

		assert_eq!(completed, 2);
		assert_eq!(client.resource_calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn resolved_shutdown_stops_before_first_tick() {
		let client = Arc::new(ScriptedHttpClient::new());
		let completed = scheduler(&client, 2).run_until(async {}).await;

		assert_eq!(completed, 0);
		assert_eq!(client.resource_calls(), 0);
	}
}
