//! Per-request context: caller token, user ID, forwarding metadata, and deadline.

// crates.io
use oauth2::http::{HeaderMap, header::AUTHORIZATION};
use tokio::time::Instant;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// `X-Forwarded-For` header name.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// `X-Forwarded-Host` header name.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
/// `X-Forwarded-Port` header name.
pub const X_FORWARDED_PORT: &str = "x-forwarded-port";
/// `X-Forwarded-Proto` header name.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
/// `X-Forwarded-Prefix` header name.
pub const X_FORWARDED_PREFIX: &str = "x-forwarded-prefix";

/// Forwarding metadata of the inbound request, replayed on outbound calls.
///
/// Empty strings mean "not present"; the executor never emits empty forwarding headers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingContext {
	/// Originating client address (`X-Forwarded-For`).
	pub for_host: String,
	/// Public host (`X-Forwarded-Host`).
	pub host: String,
	/// Public port (`X-Forwarded-Port`).
	pub port: String,
	/// Public scheme (`X-Forwarded-Proto`).
	pub proto: String,
}
impl ForwardingContext {
	/// Captures the `X-Forwarded-*` headers of an inbound request.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		Self {
			for_host: header_string(headers, X_FORWARDED_FOR),
			host: header_string(headers, X_FORWARDED_HOST),
			port: header_string(headers, X_FORWARDED_PORT),
			proto: header_string(headers, X_FORWARDED_PROTO),
		}
	}
}

/// Context handed to every client call.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
	/// Caller's bearer token without the scheme prefix.
	pub access_token: Option<TokenSecret>,
	/// Caller's user ID, filled in once the token has been validated.
	pub user_id: Option<String>,
	/// Forwarding metadata of the inbound request.
	pub forwarding: ForwardingContext,
	/// Instant after which outbound calls are abandoned.
	pub deadline: Option<Instant>,
}
impl RequestContext {
	/// Deadline attached by [`RequestContext::from_headers`].
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

	/// Builds a context from inbound request headers with the default deadline.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		let access_token = headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(TokenSecret::from_bearer_header);

		Self {
			access_token,
			user_id: None,
			forwarding: ForwardingContext::from_headers(headers),
			deadline: Some(Instant::now() + Self::DEFAULT_TIMEOUT),
		}
	}

	/// Context for background work: no caller, no forwarding, no deadline.
	pub fn detached() -> Self {
		Self::default()
	}

	/// Replaces the caller token.
	pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the validated user ID.
	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());

		self
	}

	/// Replaces the deadline with `now + timeout`.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.deadline = Some(Instant::now() + timeout);

		self
	}

	/// Replaces the forwarding metadata.
	pub fn with_forwarding(mut self, forwarding: ForwardingContext) -> Self {
		self.forwarding = forwarding;

		self
	}
}

fn header_string(headers: &HeaderMap, name: &str) -> String {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.map(|value| value.trim().to_owned())
		.unwrap_or_default()
}
