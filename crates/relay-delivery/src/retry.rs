//! Backoff schedule for relay retries.

use std::time::Duration;

/// Fixed backoff table: the delay before retry `n` is entry `n - 1`, and
/// retries beyond the table reuse the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(vec![
			Duration::from_millis(1_000),
			Duration::from_millis(5_000),
			Duration::from_millis(15_000),
		])
	}
}

impl RetryPolicy {
	pub fn new(backoff: Vec<Duration>) -> Self {
		Self { backoff }
	}

	/// Delay to wait before the attempt with the given zero-based index.
	/// The very first attempt of a job never waits.
	pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
		if attempt == 0 {
			return None;
		}
		let index = (attempt - 1) as usize;
		self.backoff
			.get(index)
			.or_else(|| self.backoff.last())
			.copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_schedule() {
		let policy = RetryPolicy::default();
		assert_eq!(policy.delay_before(0), None);
		assert_eq!(policy.delay_before(1), Some(Duration::from_secs(1)));
		assert_eq!(policy.delay_before(2), Some(Duration::from_secs(5)));
		assert_eq!(policy.delay_before(3), Some(Duration::from_secs(15)));
		assert_eq!(policy.delay_before(9), Some(Duration::from_secs(15)));
	}

	#[test]
	fn test_empty_schedule_never_waits() {
		let policy = RetryPolicy::new(vec![]);
		assert_eq!(policy.delay_before(4), None);
	}
}
