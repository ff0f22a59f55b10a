use std::time::Duration;

/// Monotonically accumulating connection counters.
///
/// Reset only by explicit caller action (`reset_metrics`), never implicitly
/// on reconnect or disconnect.
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
	pub messages_received: u64,
	pub messages_sent: u64,
	pub reconnection_count: u64,
	pub error_count: u64,
	pub average_latency: Option<Duration>,
	/// Total time spent in the `Connected` state across sessions
	pub connection_uptime: Duration,
	latency_samples: u32,
}

impl PerformanceMetrics {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_received(&mut self) {
		self.messages_received += 1;
	}

	pub fn record_sent(&mut self) {
		self.messages_sent += 1;
	}

	pub fn record_reconnection(&mut self) {
		self.reconnection_count += 1;
	}

	pub fn record_error(&mut self) {
		self.error_count += 1;
	}

	/// Fold a ping round-trip sample into the running average
	pub fn record_latency(&mut self, sample: Duration) {
		self.latency_samples += 1;
		let avg = match self.average_latency {
			Some(current) => {
				let n = f64::from(self.latency_samples);
				current.as_secs_f64() + (sample.as_secs_f64() - current.as_secs_f64()) / n
			}
			None => sample.as_secs_f64(),
		};
		self.average_latency = Some(Duration::from_secs_f64(avg));
	}

	pub fn record_uptime(&mut self, session: Duration) {
		self.connection_uptime += session;
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_latency_running_average() {
		let mut metrics = PerformanceMetrics::new();
		metrics.record_latency(Duration::from_millis(10));
		metrics.record_latency(Duration::from_millis(30));

		let avg = metrics.average_latency.unwrap();
		assert_eq!(avg.as_millis(), 20);
	}

	#[test]
	fn test_reset_zeroes_everything() {
		let mut metrics = PerformanceMetrics::new();
		metrics.record_sent();
		metrics.record_error();
		metrics.record_latency(Duration::from_millis(5));

		metrics.reset();

		assert_eq!(metrics.messages_sent, 0);
		assert_eq!(metrics.error_count, 0);
		assert!(metrics.average_latency.is_none());
	}
}
