//! Credential, secret, and quota models owned by the token manager.

pub mod credential;
pub mod quota;
pub mod secret;

pub use credential::*;
pub use quota::*;
pub use secret::*;
