//! Authenticated HAL/HATEOAS client and bearer-token gatekeeper for composite services.
//!
//! The crate couples two engines. [`client::HalClient`] talks to a remote HAL API either as the
//! caller (token taken from the per-request [`auth::RequestContext`]) or as a service user
//! whose client-credentials token is kept fresh by a background [`flows::TokenRefresher`].
//! [`validator::TokenValidator`] verifies inbound bearer tokens (HS256 or RS256), extracts the
//! license claims, and authorizes the request against a required entitlement.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod flows;
pub mod hal;
pub mod http;
pub mod interceptor;
#[cfg(feature = "axum")] pub mod middleware;
pub mod oauth;
pub mod obs;
pub mod store;
pub mod validator;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use {jsonwebtoken, url};
#[cfg(test)] use {color_eyre as _, httpmock as _, tower as _};
