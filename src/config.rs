//! Command-line and environment configuration.
//!
//! Every setting can be passed as a flag or through the environment variable named next to
//! it. [`Cli`] holds the raw values; [`Config`] is the validated form handed to the runtime.

// std
use std::time::Duration as StdDuration;
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::{ClientSecret, QuotaPolicy, QuotaReset},
	error::ConfigError,
	issuance::IssuerSettings,
};

/// Raw poller settings.
#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Token endpoint URL
	#[arg(long, env = "TOKEN_URL")]
	pub token_url: String,

	/// Protected resource URL polled on every tick
	#[arg(long, env = "RESOURCE_URL")]
	pub resource_url: String,

	/// OAuth client identifier
	#[arg(long, env = "CLIENT_ID")]
	pub client_id: String,

	/// OAuth client secret
	#[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: String,

	/// Seconds between ticks
	#[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 300)]
	pub poll_interval_secs: u64,

	/// Authenticated requests per tick
	#[arg(long, env = "CALLS_PER_TICK", default_value_t = 2)]
	pub calls_per_tick: u32,

	/// Issuance attempts allowed per quota window
	#[arg(long, env = "ISSUANCE_CAP", default_value_t = QuotaPolicy::DEFAULT_CAP)]
	pub issuance_cap: u32,

	/// Quota window length in seconds
	#[arg(long, env = "QUOTA_WINDOW_SECS", default_value_t = 3600)]
	pub quota_window_secs: u32,

	/// Whether the quota window resets every window length (rolling, the default) or is a
	/// lifetime cap that never resets (never)
	#[arg(long, env = "QUOTA_RESET", value_enum, default_value_t = QuotaReset::Rolling)]
	pub quota_reset: QuotaReset,

	/// Per-request HTTP timeout in seconds
	#[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
	pub http_timeout_secs: u64,

	/// Log filter used when RUST_LOG is unset (trace, debug, info, warn, error)
	#[arg(long, env = "LOG_FILTER", default_value = "info")]
	pub log_filter: String,
}

/// Validated poller settings.
#[derive(Clone, Debug)]
pub struct Config {
	/// Client-credentials grant parameters.
	pub issuer: IssuerSettings,
	/// Protected resource URL.
	pub resource_url: Url,
	/// Tick period.
	pub poll_interval: StdDuration,
	/// Authenticated requests per tick.
	pub calls_per_tick: u32,
	/// Issuance quota.
	pub quota: QuotaPolicy,
	/// Per-request HTTP timeout.
	pub http_timeout: StdDuration,
	/// Fallback log filter.
	pub log_filter: String,
}
impl TryFrom<Cli> for Config {
	type Error = ConfigError;

	fn try_from(cli: Cli) -> Result<Self, Self::Error> {
		let token_url = parse_url("token", &cli.token_url)?;
		let resource_url = parse_url("resource", &cli.resource_url)?;

		if cli.client_id.trim().is_empty() {
			return Err(ConfigError::EmptyClientId);
		}

		let poll_interval_secs = non_zero("poll_interval_secs", cli.poll_interval_secs)?;
		let calls_per_tick = non_zero("calls_per_tick", cli.calls_per_tick)?;
		let issuance_cap = non_zero("issuance_cap", cli.issuance_cap)?;
		let quota_window_secs = non_zero("quota_window_secs", cli.quota_window_secs)?;
		let http_timeout_secs = non_zero("http_timeout_secs", cli.http_timeout_secs)?;

		Ok(Self {
			issuer: IssuerSettings::new(
				token_url,
				cli.client_id,
				ClientSecret::new(cli.client_secret),
			),
			resource_url,
			poll_interval: StdDuration::from_secs(poll_interval_secs),
			calls_per_tick,
			quota: QuotaPolicy::new(issuance_cap, Duration::seconds(i64::from(quota_window_secs)))
				.with_reset(cli.quota_reset),
			http_timeout: StdDuration::from_secs(http_timeout_secs),
			log_filter: cli.log_filter,
		})
	}
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })?;

	match url.scheme() {
		"http" | "https" => Ok(url),
		scheme => Err(ConfigError::UnsupportedScheme { field, scheme: scheme.to_owned() }),
	}
}

fn non_zero<T>(field: &'static str, value: T) -> Result<T, ConfigError>
where
	T: Default + PartialEq,
{
	if value == T::default() { Err(ConfigError::Zero { field }) } else { Ok(value) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const REQUIRED: [&str; 9] = [
		"token-poller",
		"--token-url",
		"https://auth.example.com/token",
		"--resource-url",
		"https://api.example.com/data",
		"--client-id",
		"api_client_id",
		"--client-secret",
		"api_client_secret",
	];

	fn parse(extra: &[&str]) -> Result<Config, ConfigError> {
		let cli = Cli::try_parse_from(REQUIRED.iter().chain(extra).copied())
			.expect("Fixture arguments should parse.");

		Config::try_from(cli)
	}

	#[test]
	fn defaults_match_reference_behavior() {
		let config = parse(&[]).expect("Defaults should validate.");

		assert_eq!(config.poll_interval, StdDuration::from_secs(300));
		assert_eq!(config.calls_per_tick, 2);
		assert_eq!(config.quota, QuotaPolicy::default());
		assert_eq!(config.issuer.client_secret.expose(), "api_client_secret");
		assert!(!format!("{config:?}").contains("api_client_secret"));
	}

	#[test]
	fn overrides_are_applied() {
		let config = parse(&[
			"--poll-interval-secs",
			"60",
			"--calls-per-tick",
			"1",
			"--issuance-cap",
			"3",
			"--quota-reset",
			"never",
		])
		.expect("Overrides should validate.");

		assert_eq!(config.poll_interval, StdDuration::from_secs(60));
		assert_eq!(config.calls_per_tick, 1);
		assert_eq!(config.quota.cap, 3);
		assert_eq!(config.quota.reset, QuotaReset::Never);
	}

	#[test]
	fn zero_values_are_rejected() {
		let err = parse(&["--calls-per-tick", "0"]).expect_err("Zero calls should be rejected.");

		assert!(matches!(err, ConfigError::Zero { field: "calls_per_tick" }));
	}

	#[test]
	fn non_http_urls_are_rejected() {
		let cli = Cli::try_parse_from([
			"token-poller",
			"--token-url",
			"ftp://auth.example.com/token",
			"--resource-url",
			"https://api.example.com/data",
			"--client-id",
			"id",
			"--client-secret",
			"secret",
		])
		.expect("Arguments should parse.");
		let err = Config::try_from(cli).expect_err("ftp should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { field: "token", .. }));
	}
}
