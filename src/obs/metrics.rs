// self
use crate::{obs::AcquireOutcome, strategy::StrategyKind};

/// Records an acquisition outcome via the global metrics recorder (when enabled).
pub fn record_acquire_outcome(strategy: StrategyKind, outcome: AcquireOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"credential_broker_acquire_total",
			"strategy" => strategy.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (strategy, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_recorder_is_harmless() {
		record_acquire_outcome(StrategyKind::CertificateAssertion, AcquireOutcome::Failure);
	}
}
