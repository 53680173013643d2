// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client for the account broker.
//!
//! Every outbound call the broker makes — token refresh, quota polling, the
//! OAuth code exchange — goes through a client built here so the timeout and
//! User-Agent stay consistent no matter which component is calling out.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

/// Default timeout applied to every outbound HTTP call (§5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Creates a new HTTP client with the broker's default 20s timeout.
pub fn new_client() -> Client {
	builder().build().expect("failed to build HTTP client")
}

/// Creates a client builder pre-configured with the default timeout and
/// User-Agent, for callers that need to customize further.
pub fn builder() -> ClientBuilder {
	Client::builder()
		.user_agent(user_agent())
		.timeout(DEFAULT_TIMEOUT)
}

/// Creates a new HTTP client with a caller-supplied timeout.
pub fn new_client_with_timeout(timeout: Duration) -> Client {
	Client::builder()
		.user_agent(user_agent())
		.timeout(timeout)
		.build()
		.expect("failed to build HTTP client")
}

/// The User-Agent string sent on every outbound request.
pub fn user_agent() -> String {
	format!("account-broker/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_expected_prefix() {
		assert!(user_agent().starts_with("account-broker/"));
	}

	#[test]
	fn client_builds_successfully() {
		let _ = new_client();
		let _ = new_client_with_timeout(Duration::from_secs(5));
	}
}
