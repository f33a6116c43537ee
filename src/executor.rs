//! Request executor: header assembly, bounded retries, and outcome classification.
//!
//! GET and DELETE are retried on HTTP 408 and on transport failures, up to
//! [`RetryPolicy::max_attempts`] with a fixed pause. POST and PATCH are sent exactly once. A
//! POST answered with 409 is reported as a success carrying the response body. When the
//! request carries a deadline, attempts and pauses are abandoned once it elapses.

mod headers;
mod outcome;

pub use outcome::*;

// crates.io
use oauth2::http::Method;
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::{ForwardingContext, TokenSecret},
	config::RetryPolicy,
	http::HttpTransport,
	obs::{self, OpKind, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Executor specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestExecutor = RequestExecutor<ReqwestTransport>;

/// HTTP verbs supported against the resource API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Verb {
	/// Returns `true` for verbs that may be retried automatically.
	pub const fn is_idempotent(self) -> bool {
		matches!(self, Self::Get | Self::Delete)
	}

	/// HTTP method of the verb.
	pub fn method(self) -> Method {
		match self {
			Self::Get => Method::GET,
			Self::Post => Method::POST,
			Self::Patch => Method::PATCH,
			Self::Delete => Method::DELETE,
		}
	}

	/// Observability label of the verb.
	pub const fn op_kind(self) -> OpKind {
		match self {
			Self::Get => OpKind::Get,
			Self::Post => OpKind::Post,
			Self::Patch => OpKind::Patch,
			Self::Delete => OpKind::Delete,
		}
	}
}
impl Display for Verb {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.method().as_str())
	}
}

/// Value of the `Accept` header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Accept {
	/// `application/json`
	#[default]
	Json,
	/// `application/octet-stream`, for file downloads.
	OctetStream,
}
impl Accept {
	/// Header value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Json => "application/json",
			Self::OctetStream => "application/octet-stream",
		}
	}
}

/// Which forwarding headers accompany an outbound call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForwardingMode {
	/// Only `X-Forwarded-For`.
	#[default]
	Off,
	/// `X-Forwarded-For/Host/Port/Proto/Prefix`.
	Full,
}

/// Fully described outbound call.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// Verb of the call.
	pub verb: Verb,
	/// Absolute target URL.
	pub url: String,
	/// Request body.
	pub payload: Option<Vec<u8>>,
	/// Value of the `Content-Type` header.
	pub content_type: String,
	/// Value of the `Accept` header.
	pub accept: Accept,
	/// Bearer token; `None` omits `Authorization`.
	pub token: Option<TokenSecret>,
	/// Forwarding metadata of the inbound request.
	pub forwarding: ForwardingContext,
	/// Which forwarding headers to emit.
	pub forwarding_mode: ForwardingMode,
	/// Instant after which the call is abandoned.
	pub deadline: Option<Instant>,
}
impl OutboundRequest {
	/// Default `Content-Type` of every call.
	pub const JSON_CONTENT_TYPE: &'static str = "application/json";

	/// Creates a request with JSON content negotiation and no credentials.
	pub fn new(verb: Verb, url: impl Into<String>) -> Self {
		Self {
			verb,
			url: url.into(),
			payload: None,
			content_type: Self::JSON_CONTENT_TYPE.into(),
			accept: Accept::Json,
			token: None,
			forwarding: ForwardingContext::default(),
			forwarding_mode: ForwardingMode::Off,
			deadline: None,
		}
	}

	/// Attaches a body and its content type.
	pub fn with_payload(
		mut self,
		payload: impl Into<Vec<u8>>,
		content_type: impl Into<String>,
	) -> Self {
		self.payload = Some(payload.into());
		self.content_type = content_type.into();

		self
	}

	/// Sets the `Accept` header.
	pub fn with_accept(mut self, accept: Accept) -> Self {
		self.accept = accept;

		self
	}

	/// Sets or clears the bearer token.
	pub fn with_token(mut self, token: Option<TokenSecret>) -> Self {
		self.token = token;

		self
	}

	/// Sets the forwarding metadata and mode.
	pub fn with_forwarding(mut self, forwarding: ForwardingContext, mode: ForwardingMode) -> Self {
		self.forwarding = forwarding;
		self.forwarding_mode = mode;

		self
	}

	/// Sets or clears the deadline.
	pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
		self.deadline = deadline;

		self
	}
}

/// Sends [`OutboundRequest`]s through an [`HttpTransport`] and classifies the responses.
pub struct RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	retry: RetryPolicy,
	external_base_path: String,
}
impl<T> RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an executor over `transport`.
	pub fn new(
		transport: impl Into<Arc<T>>,
		retry: RetryPolicy,
		external_base_path: impl Into<String>,
	) -> Self {
		Self { transport: transport.into(), retry, external_base_path: external_base_path.into() }
	}

	/// Shared transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Performs the call, retrying where the verb allows, and returns its outcome.
	pub async fn execute(&self, request: OutboundRequest) -> RequestOutcome {
		let kind = request.verb.op_kind();
		let span = OpSpan::new(kind, "execute");

		obs::record_op_outcome(kind, OpOutcome::Attempt);

		let outcome = span
			.instrument(async {
				match request.deadline {
					Some(deadline) => tokio::time::timeout_at(deadline, self.attempt_all(&request))
						.await
						.unwrap_or_else(|_| {
							tracing::warn!(
								verb = %request.verb,
								url = %request.url,
								"Outbound request abandoned at deadline."
							);

							RequestOutcome::failed(RequestFailure::DeadlineExceeded)
						}),
					None => self.attempt_all(&request).await,
				}
			})
			.await;

		obs::record_op_outcome(kind, OpOutcome::from_success(outcome.is_success()));

		outcome
	}

	async fn attempt_all(&self, request: &OutboundRequest) -> RequestOutcome {
		let attempts = if request.verb.is_idempotent() { self.retry.attempts() } else { 1 };
		let mut attempt = 1;

		loop {
			let retryable = attempt < attempts;
			let http_request = match headers::build_request(request, &self.external_base_path) {
				Ok(http_request) => http_request,
				Err(e) => {
					tracing::warn!(
						verb = %request.verb,
						url = %request.url,
						error = %e,
						"Outbound request could not be built."
					);

					return RequestOutcome::failed(RequestFailure::InvalidRequest);
				},
			};

			match self.transport.execute(http_request).await {
				Ok(response) => {
					let status = response.status().as_u16();

					if status == 408 && retryable {
						tracing::debug!(
							verb = %request.verb,
							url = %request.url,
							attempt,
							"Upstream answered 408; retrying."
						);
					} else {
						let file_name = if matches!(request.verb, Verb::Get) {
							headers::file_name_from_headers(response.headers())
						} else {
							None
						};
						let failure = classify(request.verb, status, attempt);

						if let Some(failure) = &failure {
							tracing::warn!(
								verb = %request.verb,
								url = %request.url,
								status,
								attempt,
								%failure,
								"Outbound request failed."
							);
						}

						return RequestOutcome {
							body: response.into_body(),
							status,
							failure,
							file_name,
						};
					}
				},
				Err(e) => {
					let timed_out = T::is_timeout(&e);

					if retryable {
						tracing::debug!(
							verb = %request.verb,
							url = %request.url,
							attempt,
							error = %e,
							"Transport failure; retrying."
						);
					} else {
						tracing::warn!(
							verb = %request.verb,
							url = %request.url,
							attempt,
							error = %e,
							"Outbound request failed at the transport."
						);

						return RequestOutcome::failed(if timed_out {
							RequestFailure::TimedOut { attempts: attempt }
						} else {
							RequestFailure::Transport
						});
					}
				},
			}

			tokio::time::sleep(self.retry.delay()).await;

			attempt += 1;
		}
	}
}
impl<T> Debug for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor")
			.field("retry", &self.retry)
			.field("external_base_path", &self.external_base_path)
			.finish()
	}
}

fn classify(verb: Verb, status: u16, attempts: u32) -> Option<RequestFailure> {
	match status {
		200..=299 => None,
		409 if matches!(verb, Verb::Post) => None,
		408 => Some(RequestFailure::TimedOut { attempts }),
		400..=499 => Some(RequestFailure::Rejected { status }),
		500..=599 => Some(RequestFailure::ServerError { status }),
		_ => Some(RequestFailure::Unexpected { status }),
	}
}
