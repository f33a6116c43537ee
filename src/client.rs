//! Authenticated client façade over the request executor.
//!
//! Each verb takes a [`RequestContext`] and [`CallOptions`]. The options pick whose token is
//! attached (caller or service user), which forwarding headers are replayed, whether the call
//! is authenticated at all, and the `Accept` mode. Outcomes are returned as produced by the
//! executor; HAL documents are not interpreted here.

// self
use crate::{
	_prelude::*,
	auth::{RequestContext, TokenSecret},
	config::ClientConfig,
	executor::{
		Accept, ForwardingMode, OutboundRequest, RequestExecutor, RequestFailure, RequestOutcome,
		Verb,
	},
	flows::{RefreshHandle, RefreshMetrics, TokenRefresher},
	http::HttpTransport,
	store::CredentialCache,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

/// Client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestHalClient = HalClient<ReqwestTransport>;

/// Whose token accompanies a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Identity {
	/// Token of the inbound request, taken from the [`RequestContext`].
	Caller,
	/// Service-user token from the credential cache.
	ServiceUser,
}
impl Identity {
	/// Label used in logs and failures.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Caller => "caller",
			Self::ServiceUser => "service user",
		}
	}
}

/// Per-call choices of identity, forwarding, authentication, and content negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallOptions {
	/// Whose token to attach.
	pub identity: Identity,
	/// Which forwarding headers to emit.
	pub forwarding: ForwardingMode,
	/// `false` skips credential resolution and omits `Authorization`.
	pub authenticate: bool,
	/// Value of the `Accept` header.
	pub accept: Accept,
}
impl CallOptions {
	/// Authenticated call as the caller, without full forwarding.
	pub const fn caller() -> Self {
		Self {
			identity: Identity::Caller,
			forwarding: ForwardingMode::Off,
			authenticate: true,
			accept: Accept::Json,
		}
	}

	/// Authenticated call as the service user, without full forwarding.
	pub const fn service_user() -> Self {
		Self { identity: Identity::ServiceUser, ..Self::caller() }
	}

	/// Sets the forwarding mode.
	pub const fn with_forwarding(mut self, forwarding: ForwardingMode) -> Self {
		self.forwarding = forwarding;

		self
	}

	/// Sends the call without credentials.
	pub const fn unauthenticated(mut self) -> Self {
		self.authenticate = false;

		self
	}

	/// Sets the `Accept` mode.
	pub const fn with_accept(mut self, accept: Accept) -> Self {
		self.accept = accept;

		self
	}
}

struct ClientInner<T>
where
	T: ?Sized + HttpTransport,
{
	executor: RequestExecutor<T>,
	cache: CredentialCache,
	refresher: Option<TokenRefresher>,
	refresh_handle: Option<RefreshHandle>,
}

/// Authenticated HAL client owning the service credential and its refresh schedule.
///
/// Cloning is cheap; the refresh schedule stops when the last clone is dropped.
pub struct HalClient<T>
where
	T: ?Sized + HttpTransport,
{
	inner: Arc<ClientInner<T>>,
}
impl<T> HalClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a client over `transport`.
	///
	/// When a service user is configured, the refresh schedule is spawned on the current
	/// tokio runtime, so this must be called from within one.
	pub fn with_transport(config: ClientConfig, transport: impl Into<Arc<T>>) -> Result<Self> {
		config.validate()?;

		let transport = transport.into();
		let cache = CredentialCache::default();
		let refresher = match &config.service_user {
			Some(service_user) => Some(TokenRefresher::new(
				service_user,
				config.refresh,
				cache.clone(),
				transport.clone(),
			)?),
			None => None,
		};
		let refresh_handle = refresher.as_ref().map(TokenRefresher::spawn);
		let executor = RequestExecutor::new(transport, config.retry, config.external_base_path);

		Ok(Self { inner: Arc::new(ClientInner { executor, cache, refresher, refresh_handle }) })
	}

	/// `GET` a resource.
	pub async fn get(
		&self,
		context: &RequestContext,
		url: &str,
		options: CallOptions,
	) -> RequestOutcome {
		self.call(context, Verb::Get, url, None, options).await
	}

	/// `POST` a payload.
	pub async fn post(
		&self,
		context: &RequestContext,
		url: &str,
		payload: impl Into<Vec<u8>>,
		content_type: &str,
		options: CallOptions,
	) -> RequestOutcome {
		self.call(context, Verb::Post, url, Some((payload.into(), content_type)), options).await
	}

	/// `PATCH` a payload.
	pub async fn patch(
		&self,
		context: &RequestContext,
		url: &str,
		payload: impl Into<Vec<u8>>,
		content_type: &str,
		options: CallOptions,
	) -> RequestOutcome {
		self.call(context, Verb::Patch, url, Some((payload.into(), content_type)), options).await
	}

	/// `DELETE` a resource.
	pub async fn delete(
		&self,
		context: &RequestContext,
		url: &str,
		options: CallOptions,
	) -> RequestOutcome {
		self.call(context, Verb::Delete, url, None, options).await
	}

	/// Credential cache shared with the refresh schedule.
	pub fn credential_cache(&self) -> &CredentialCache {
		&self.inner.cache
	}

	/// Refresh counters; `None` without a service user.
	pub fn refresh_metrics(&self) -> Option<Arc<RefreshMetrics>> {
		self.inner.refresher.as_ref().map(|refresher| refresher.refresh_metrics.clone())
	}

	/// Refreshes the service credential immediately.
	pub async fn refresh_now(&self) -> Result<()> {
		let refresher = self.inner.refresher.as_ref().ok_or(Error::ServiceUserDisabled)?;

		refresher.refresh().await.map(|_| ())
	}

	/// Stops the background refresh schedule; the cached credential stays usable.
	pub fn stop_refresh(&self) {
		if let Some(handle) = &self.inner.refresh_handle {
			handle.cancellation_token().cancel();
		}
	}

	async fn call(
		&self,
		context: &RequestContext,
		verb: Verb,
		url: &str,
		payload: Option<(Vec<u8>, &str)>,
		options: CallOptions,
	) -> RequestOutcome {
		let token = if options.authenticate {
			match self.resolve_token(context, options.identity) {
				Ok(token) => Some(token),
				Err(failure) => {
					tracing::warn!(
						verb = %verb,
						url,
						identity = options.identity.as_str(),
						user_id = context.user_id.as_deref().unwrap_or_default(),
						"No credential available for outbound request."
					);

					return RequestOutcome::failed(failure);
				},
			}
		} else {
			None
		};
		let mut request = OutboundRequest::new(verb, url)
			.with_accept(options.accept)
			.with_token(token)
			.with_forwarding(context.forwarding.clone(), options.forwarding)
			.with_deadline(context.deadline);

		if let Some((payload, content_type)) = payload {
			request = request.with_payload(payload, content_type);
		}

		self.inner.executor.execute(request).await
	}

	fn resolve_token(
		&self,
		context: &RequestContext,
		identity: Identity,
	) -> Result<TokenSecret, RequestFailure> {
		let token = match identity {
			Identity::Caller => context.access_token.clone(),
			Identity::ServiceUser if self.inner.refresher.is_some() =>
				self.inner.cache.access_token(),
			Identity::ServiceUser => None,
		};

		token
			.filter(|token| !token.is_empty())
			.ok_or(RequestFailure::MissingCredential { identity: identity.as_str() })
	}
}
#[cfg(feature = "reqwest")]
impl HalClient<ReqwestTransport> {
	/// Builds a client with its own reqwest transport.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Self::with_transport(config, ReqwestTransport::with_client(client))
	}
}
impl<T> Clone for HalClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<T> Debug for HalClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HalClient")
			.field("executor", &self.inner.executor)
			.field("service_user", &self.inner.refresher.is_some())
			.finish()
	}
}
