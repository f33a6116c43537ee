//! Background orchestration of the service-user credential.

pub mod refresh;

pub use refresh::*;
