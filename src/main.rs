//! Polls the configured resource on a fixed cadence until interrupted.

// std
use std::sync::Arc;
// crates.io
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use token_poller::{
	api::ApiService,
	config::{Cli, Config},
	http::ReqwestHttpClient,
	scheduler::Scheduler,
	token_manager::TokenManager,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = Config::try_from(Cli::parse())?;

	init_tracing(&config.log_filter);

	let http_client = Arc::new(ReqwestHttpClient::with_timeout(config.http_timeout)?);
	let tokens: Arc<TokenManager<ReqwestHttpClient>> =
		Arc::new(TokenManager::new(http_client.clone(), config.issuer.clone(), config.quota));
	let api = Arc::new(ApiService::new(http_client, tokens, config.resource_url.clone()));
	let scheduler =
		Scheduler::new(api, config.poll_interval).with_calls_per_tick(config.calls_per_tick);

	tracing::info!(
		resource_url = %config.resource_url,
		interval_secs = scheduler.interval().as_secs(),
		token_url = %config.issuer.token_url,
		quota_cap = config.quota.cap,
		quota_reset = %config.quota.reset,
		"Polling the resource until interrupted."
	);

	scheduler.run_until(shutdown_signal()).await;

	Ok(())
}

fn init_tracing(fallback: &str) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

	tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Unable to listen for the interrupt signal.");

		std::future::pending::<()>().await;
	}

	tracing::info!("Interrupt received, shutting down.");
}
