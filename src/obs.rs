//! Observability helpers for client calls, refreshes, and token validation.
//!
//! Every operation runs inside a `hal_broker.op` span carrying the `op` and `stage` fields.
//! With the `metrics` feature, the `hal_broker_op_total` counter is incremented for every
//! attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Client-credentials refresh of the service token.
	Refresh,
	/// Outbound GET.
	Get,
	/// Outbound POST.
	Post,
	/// Outbound PATCH.
	Patch,
	/// Outbound DELETE.
	Delete,
	/// Inbound bearer-token validation.
	Validate,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Refresh => "refresh",
			OpKind::Get => "get",
			OpKind::Post => "post",
			OpKind::Patch => "patch",
			OpKind::Delete => "delete",
			OpKind::Validate => "validate",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}

	/// Maps a success flag to an outcome label.
	pub const fn from_success(success: bool) -> Self {
		if success { OpOutcome::Success } else { OpOutcome::Failure }
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
