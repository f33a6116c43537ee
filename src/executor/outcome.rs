//! Normalized result of one outbound call.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, hal::RemoteStatus};

/// Why an outbound call did not succeed.
///
/// The `Display` strings are short and safe to hand back to end users; details (URL, body)
/// are only written to the logs.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RequestFailure {
	/// No token was available for the requested identity.
	#[error("Missing credential for the {identity} identity.")]
	MissingCredential {
		/// Identity label (`caller` or `service user`).
		identity: &'static str,
	},
	/// Connection-level failure after all permitted attempts.
	#[error("Upstream service is unreachable.")]
	Transport,
	/// The upstream kept timing out (HTTP 408 or transport timeout).
	#[error("Upstream request timed out after {attempts} attempt(s).")]
	TimedOut {
		/// Number of attempts made.
		attempts: u32,
	},
	/// The inbound request's deadline elapsed before the call completed.
	#[error("Request deadline exceeded.")]
	DeadlineExceeded,
	/// Non-retryable 4xx response.
	#[error("Upstream rejected the request with status {status}.")]
	Rejected {
		/// Response status.
		status: u16,
	},
	/// 5xx response.
	#[error("Upstream failed with status {status}.")]
	ServerError {
		/// Response status.
		status: u16,
	},
	/// Status outside the 2xx/4xx/5xx ranges.
	#[error("Upstream returned unexpected status {status}.")]
	Unexpected {
		/// Response status.
		status: u16,
	},
	/// The request could not be built (invalid URL or header value).
	#[error("Request could not be built.")]
	InvalidRequest,
}
impl RequestFailure {
	/// HTTP status reported to the caller for this failure.
	pub fn status(&self) -> u16 {
		match self {
			Self::MissingCredential { .. } => 403,
			Self::Transport => 502,
			Self::TimedOut { .. } => 408,
			Self::DeadlineExceeded => 504,
			Self::Rejected { status } | Self::ServerError { status } | Self::Unexpected { status } =>
				*status,
			Self::InvalidRequest => 500,
		}
	}
}

/// Body, status, and failure of one outbound call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOutcome {
	/// Response body, empty when no response was received.
	pub body: Vec<u8>,
	/// HTTP status of the response, or the status mapped from [`RequestFailure::status`].
	pub status: u16,
	/// `None` on success (including POST 409).
	pub failure: Option<RequestFailure>,
	/// Filename suggested by `Content-Disposition`, when present.
	pub file_name: Option<String>,
}
impl RequestOutcome {
	/// Outcome for a call that never produced a response.
	pub fn failed(failure: RequestFailure) -> Self {
		Self { body: Vec::new(), status: failure.status(), failure: Some(failure), file_name: None }
	}

	/// Returns `true` when the call succeeded.
	pub fn is_success(&self) -> bool {
		self.failure.is_none()
	}

	/// Suggested filename, or `default` when the response did not carry one.
	pub fn file_name_or(&self, default: &str) -> String {
		self.file_name.clone().filter(|name| !name.is_empty()).unwrap_or_else(|| default.to_owned())
	}

	/// Parses the body as the resource API's error document.
	pub fn remote_status(&self) -> Option<RemoteStatus> {
		if self.is_success() { None } else { RemoteStatus::parse(&self.body) }
	}

	/// Deserializes the body as JSON.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: DeserializeOwned,
	{
		serde_json::from_slice(&self.body)
	}

	/// Converts the outcome into the body on success or the failure otherwise.
	pub fn into_result(self) -> Result<Vec<u8>, RequestFailure> {
		match self.failure {
			None => Ok(self.body),
			Some(failure) => Err(failure),
		}
	}
}
