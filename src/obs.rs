//! Optional observability helpers for credential acquisition.
//!
//! # Feature Flags
//!
//! - `tracing` wraps every acquisition in a `credential_broker.acquire` span carrying `strategy`
//!   and `stage` fields, and emits `warn`/`debug` events when the cache or a cached session is
//!   skipped.
//! - `metrics` increments `credential_broker_acquire_total` for every attempt, success, and
//!   failure, labelled by `strategy` and `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireOutcome {
	/// Entry to [`CredentialProvider::acquire`](crate::provider::CredentialProvider::acquire).
	Attempt,
	/// A credential was returned.
	Success,
	/// An error was returned.
	Failure,
}
impl AcquireOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}
impl Display for AcquireOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
