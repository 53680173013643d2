// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic quota auto-refresh with exponential backoff capped at 15
//! minutes (§9 "Runtime-driven flows"). Runs for the lifetime of the
//! process; the caller aborts the task handle on shutdown.

use std::sync::Arc;
use std::time::Duration;

use broker_api::ProcessController;
use broker_manager::Manager;

const BASE_INTERVAL: Duration = Duration::from_secs(60);
const MAX_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub async fn run(manager: Arc<Manager>, controller: Arc<ProcessController>) {
	let mut interval = BASE_INTERVAL;

	loop {
		tokio::time::sleep(jittered(interval)).await;

		if controller.is_shutting_down() {
			return;
		}

		match manager.sync_all_quotas_from_upstream().await {
			Ok(result) if result.failed == 0 => {
				tracing::debug!(total = result.total, "quota auto-refresh succeeded");
				interval = BASE_INTERVAL;
			}
			Ok(result) => {
				tracing::warn!(failed = result.failed, total = result.total, "quota auto-refresh had failures");
				interval = next_backoff(interval);
			}
			Err(err) => {
				tracing::warn!(error = %err, "quota auto-refresh failed");
				interval = next_backoff(interval);
			}
		}
	}
}

fn next_backoff(current: Duration) -> Duration {
	std::cmp::min(current * 2, MAX_INTERVAL)
}

fn jittered(interval: Duration) -> Duration {
	let jitter_ms = fastrand::u64(0..=1000);
	interval + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_doubles_up_to_cap() {
		let mut interval = BASE_INTERVAL;
		for _ in 0..10 {
			interval = next_backoff(interval);
		}
		assert_eq!(interval, MAX_INTERVAL);
	}

	#[test]
	fn jitter_never_shrinks_the_interval() {
		for _ in 0..20 {
			assert!(jittered(BASE_INTERVAL) >= BASE_INTERVAL);
		}
	}
}
