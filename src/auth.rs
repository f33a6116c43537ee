//! Credentials, claims, and per-request context shared by the client and the validator.

pub mod claims;
pub mod context;
pub mod credential;
pub mod secret;

pub use claims::*;
pub use context::*;
pub use credential::*;
pub use secret::*;
