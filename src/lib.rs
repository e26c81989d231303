//! Scheduled API poller that keeps a single client-credentials bearer token alive, bounds how
//! often it may be issued, and drops it as soon as the protected endpoint answers `401`.
//!
//! The crate is split along the call chain: [`token_manager::TokenManager`] owns the credential
//! and the issuance quota, [`api::ApiService`] performs authenticated requests, and
//! [`scheduler::Scheduler`] drives the service on a fixed cadence.

#![deny(clippy::all, missing_docs)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod issuance;
pub mod obs;
pub mod scheduler;
pub mod token_manager;


mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
