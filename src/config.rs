//! Deserializable configuration for the client and the validator.
//!
//! Loading the values (environment, files) is the embedding service's job; these types only
//! define the shape, the defaults, and validation.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Configuration of [`crate::client::HalClient`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Service-user credentials; `None` disables service-user calls.
	pub service_user: Option<ServiceUserConfig>,
	/// Value of `X-Forwarded-Prefix` in full forwarding mode.
	pub external_base_path: String,
	/// Retry policy for idempotent verbs.
	pub retry: RetryPolicy,
	/// Scheduling of the background refresh loop.
	pub refresh: RefreshPolicy,
}
impl ClientConfig {
	/// Enables the service user.
	pub fn with_service_user(mut self, service_user: ServiceUserConfig) -> Self {
		self.service_user = Some(service_user);

		self
	}

	/// Sets the external base path.
	pub fn with_external_base_path(mut self, path: impl Into<String>) -> Self {
		self.external_base_path = path.into();

		self
	}

	/// Replaces the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Replaces the refresh policy.
	pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
		self.refresh = refresh;

		self
	}

	/// Validates the nested service-user configuration, if any.
	pub fn validate(&self) -> Result<(), ConfigError> {
		match &self.service_user {
			Some(service_user) => service_user.validate(),
			None => Ok(()),
		}
	}
}

/// Client-credentials configuration of the service user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceUserConfig {
	/// Token endpoint of the identity provider.
	pub token_url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
}
impl ServiceUserConfig {
	/// Parses the token URL and builds a service-user configuration.
	pub fn new(
		token_url: &str,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let token_url =
			Url::parse(token_url).map_err(|source| ConfigError::InvalidTokenUrl { source })?;
		let config = Self {
			token_url,
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
		};

		config.validate()?;

		Ok(config)
	}

	/// Checks the token URL scheme and the client identifier.
	pub fn validate(&self) -> Result<(), ConfigError> {
		match self.token_url.scheme() {
			"http" | "https" => {},
			scheme => return Err(ConfigError::UnsupportedScheme { scheme: scheme.into() }),
		}

		if self.client_id.trim().is_empty() {
			return Err(ConfigError::EmptyClientId);
		}

		Ok(())
	}
}

/// Bounded retry policy applied to GET and DELETE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Total number of attempts, including the first.
	pub max_attempts: u32,
	/// Fixed pause between attempts in milliseconds.
	pub delay_millis: u64,
}
impl RetryPolicy {
	/// Pause between attempts.
	pub fn delay(&self) -> Duration {
		Duration::from_millis(self.delay_millis)
	}

	/// Number of attempts, never less than one.
	pub fn attempts(&self) -> u32 {
		self.max_attempts.max(1)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_attempts: 3, delay_millis: 100 }
	}
}

/// Scheduling of the service-credential refresh loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshPolicy {
	/// Seconds subtracted from `expires_in` when scheduling the next refresh.
	pub safety_margin_secs: u64,
	/// Lower bound for the scheduled refresh interval.
	pub minimum_interval_secs: u64,
	/// Pause before retrying a failed refresh.
	pub startup_backoff_secs: u64,
	/// Timeout of a single token endpoint call.
	pub request_timeout_secs: u64,
}
impl RefreshPolicy {
	/// Interval until the next refresh for a token living `expires_in` seconds.
	pub fn next_interval(&self, expires_in: u64) -> Duration {
		let secs = expires_in.saturating_sub(self.safety_margin_secs).max(self.minimum_interval_secs);

		Duration::from_secs(secs)
	}

	/// Pause before retrying a failed refresh.
	pub fn backoff(&self) -> Duration {
		Duration::from_secs(self.startup_backoff_secs)
	}

	/// Timeout of a single token endpoint call.
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}
impl Default for RefreshPolicy {
	fn default() -> Self {
		Self {
			safety_margin_secs: 30,
			minimum_interval_secs: 30,
			startup_backoff_secs: 30,
			request_timeout_secs: 10,
		}
	}
}

/// Configuration of [`crate::validator::TokenValidator`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
	/// HS256 shared secret.
	pub signing_key: Option<TokenSecret>,
	/// RS256 public key as an SPKI PEM document.
	pub public_key_pem: Option<String>,
	/// Clock skew tolerated when checking `exp`.
	pub leeway_secs: u64,
}
impl ValidatorConfig {
	/// Sets the HS256 shared secret.
	pub fn with_signing_key(mut self, secret: impl Into<String>) -> Self {
		self.signing_key = Some(TokenSecret::new(secret));

		self
	}

	/// Sets the RS256 public key.
	pub fn with_public_key_pem(mut self, pem: impl Into<String>) -> Self {
		self.public_key_pem = Some(pem.into());

		self
	}

	/// Sets the clock-skew leeway.
	pub fn with_leeway_secs(mut self, leeway_secs: u64) -> Self {
		self.leeway_secs = leeway_secs;

		self
	}
}
