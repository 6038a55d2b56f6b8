// self
use crate::{_prelude::*, cache::CacheError, strategy::StrategyKind};

/// Instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedAcquire<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedAcquire<F> = F;

/// Span wrapping one acquisition.
#[derive(Clone, Debug)]
pub struct AcquireSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AcquireSpan {
	/// Creates a span tagged with the strategy and the call site stage.
	pub fn new(strategy: StrategyKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"credential_broker.acquire",
				strategy = strategy.as_str(),
				stage
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (strategy, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedAcquire<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn cache_load_failed(error: &CacheError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, "token cache load failed; continuing without cached state");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

pub(crate) fn snapshot_discarded(error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, "cached session snapshot is unreadable; starting a fresh session");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

pub(crate) fn cached_session_rejected(error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::debug!(%error, "cached session was rejected; falling back to a prompt");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = AcquireSpan::new(StrategyKind::SecretKey, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn event_helpers_accept_errors() {
		cache_load_failed(&CacheError::Load { message: "denied".into() });
		snapshot_discarded(&"bad json");
		cached_session_rejected(&Error::UserCancelled);
	}
}
