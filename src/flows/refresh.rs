//! Client-credentials refresh of the service token with a single-flight guard and a
//! cancellable background schedule.
//!
//! [`TokenRefresher::refresh`] performs one grant and swaps the result into the
//! [`CredentialCache`]. [`TokenRefresher::spawn`] runs the schedule: refresh immediately,
//! retry every `startup_backoff` until the first success, then refresh `expires_in` minus the
//! safety margin after each success (never sooner than the minimum interval).

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	auth::ServiceCredential,
	config::{RefreshPolicy, ServiceUserConfig},
	error::TransientError,
	http::HttpTransport,
	oauth::{BasicFacade, OAuth2Facade},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::CredentialCache,
};

/// Keeps the service credential in a [`CredentialCache`] fresh.
#[derive(Clone)]
pub struct TokenRefresher {
	facade: Arc<dyn OAuth2Facade>,
	cache: CredentialCache,
	policy: RefreshPolicy,
	guard: Arc<AsyncMutex<()>>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
}
impl TokenRefresher {
	/// Creates a refresher that writes into `cache` using `transport` for the grant.
	pub fn new<T>(
		config: &ServiceUserConfig,
		policy: RefreshPolicy,
		cache: CredentialCache,
		transport: Arc<T>,
	) -> Result<Self>
	where
		T: ?Sized + HttpTransport,
	{
		let facade = BasicFacade::from_config(config, transport)?;

		Ok(Self {
			facade: Arc::new(facade),
			cache,
			policy,
			guard: Default::default(),
			refresh_metrics: Default::default(),
		})
	}

	/// Cache the refresher writes into.
	pub fn cache(&self) -> &CredentialCache {
		&self.cache
	}

	/// Scheduling policy.
	pub fn policy(&self) -> &RefreshPolicy {
		&self.policy
	}

	/// Performs one client-credentials grant and replaces the cached credential.
	///
	/// Concurrent callers are serialized. The grant is bounded by the policy's request
	/// timeout; on failure the previously cached credential stays in place.
	pub async fn refresh(&self) -> Result<Arc<ServiceCredential>> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "refresh");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let _singleflight = self.guard.lock().await;
				let timeout = self.policy.request_timeout();

				self.refresh_metrics.record_attempt();

				let credential =
					match tokio::time::timeout(timeout, self.facade.exchange_client_credentials())
						.await
					{
						Ok(Ok(credential)) => Arc::new(credential),
						Ok(Err(e)) => {
							self.refresh_metrics.record_failure();

							return Err(e);
						},
						Err(_) => {
							self.refresh_metrics.record_failure();

							return Err(TransientError::TimedOut { timeout }.into());
						},
					};

				self.cache.store(credential.clone());
				self.refresh_metrics.record_success();
				tracing::debug!(expires_in = credential.expires_in, "Service credential refreshed.");

				Ok(credential)
			})
			.await;

		obs::record_op_outcome(KIND, OpOutcome::from_success(result.is_ok()));

		result
	}

	/// Starts the background refresh schedule on the current tokio runtime.
	pub fn spawn(&self) -> RefreshHandle {
		let cancel = CancellationToken::new();
		let task = tokio::spawn(self.clone().run(cancel.clone()));

		RefreshHandle { cancel, task: Some(task) }
	}

	async fn run(self, cancel: CancellationToken) {
		let mut delay = Duration::ZERO;

		loop {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				_ = tokio::time::sleep(delay) => {},
			}

			let outcome = tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				outcome = self.refresh() => outcome,
			};

			delay = match outcome {
				Ok(credential) => self.policy.next_interval(credential.expires_in),
				Err(e) => {
					tracing::warn!(
						error = %e,
						consecutive_failures = self.refresh_metrics.consecutive_failures(),
						"Service credential refresh failed."
					);

					self.policy.backoff()
				},
			};
		}

		tracing::debug!("Service credential refresh loop stopped.");
	}
}
impl Debug for TokenRefresher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefresher")
			.field("policy", &self.policy)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}

/// Handle of a running refresh schedule; dropping it cancels the schedule.
#[derive(Debug)]
pub struct RefreshHandle {
	cancel: CancellationToken,
	task: Option<JoinHandle<()>>,
}
impl RefreshHandle {
	/// Cancels the schedule and waits for the task to exit.
	pub async fn stop(mut self) {
		self.cancel.cancel();

		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}

	/// Returns `true` once the background task has exited.
	pub fn is_finished(&self) -> bool {
		self.task.as_ref().is_none_or(JoinHandle::is_finished)
	}

	/// Token that cancels the schedule.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}
}
impl Drop for RefreshHandle {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
