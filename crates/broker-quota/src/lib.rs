// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Component E: reads one account's current quota windows from the
//! upstream usage endpoint (§4.E).

use broker_core::{BrokerError, BrokerResult, QuotaSnapshot, QuotaWindow};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

const USAGE_ENDPOINT: &str = "https://chatgpt.com/backend-api/codex/usage";
const QUOTA_BODY_BOUND_BYTES: usize = 512;

#[derive(Debug, Deserialize)]
struct UsageResponse {
	rate_limit: RateLimit,
}

#[derive(Debug, Deserialize)]
struct RateLimit {
	#[serde(default)]
	limit_reached: bool,
	primary_window: Option<RawWindow>,
	secondary_window: Option<RawWindow>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawWindow {
	used_percent: f64,
	reset_at: i64,
}

/// Issues the GET and applies the §4.E mapping rule.
pub async fn fetch_quota(
	client: &reqwest::Client,
	access_token: &str,
	provider_account_id: Option<&str>,
) -> BrokerResult<QuotaSnapshot> {
	let mut request = client.get(USAGE_ENDPOINT).bearer_auth(access_token);
	if let Some(account_id) = provider_account_id {
		request = request.header("ChatGPT-Account-Id", account_id);
	}

	let response = request
		.send()
		.await
		.map_err(|e| BrokerError::UpstreamHttp { status: 0, body: e.to_string() })?;

	let status = response.status();
	let body = response.text().await.unwrap_or_default();

	if !status.is_success() {
		let trimmed: String = body.chars().take(QUOTA_BODY_BOUND_BYTES).collect();
		return Err(BrokerError::UpstreamHttp { status: status.as_u16(), body: trimmed });
	}

	let parsed: UsageResponse = serde_json::from_str(&body)
		.map_err(|e| BrokerError::UpstreamHttp { status: status.as_u16(), body: e.to_string() })?;

	Ok(map_rate_limit(&parsed.rate_limit, Utc::now()))
}

/// The §4.E mapping rule, pulled out for direct unit testing.
fn map_rate_limit(rate_limit: &RateLimit, now: DateTime<Utc>) -> QuotaSnapshot {
	let primary = rate_limit.primary_window.map(|w| to_window(w));
	let mut secondary = rate_limit.secondary_window.map(|w| to_window(w));

	if let (Some(sec), Some(pri)) = (rate_limit.secondary_window, rate_limit.primary_window) {
		let sec_is_placeholder = sec.used_percent == 0.0 && sec.reset_at == 0;
		let primary_far_out = reset_instant(pri.reset_at).map(|t| t > now + chrono::Duration::hours(24)).unwrap_or(false);
		if sec_is_placeholder && primary_far_out {
			secondary = None;
		}
	}

	let (session, weekly, session_supported) = if let Some(secondary_window) = secondary {
		(primary, Some(secondary_window), Some(true))
	} else if let Some(pri_raw) = rate_limit.primary_window {
		let primary_far_out = reset_instant(pri_raw.reset_at).map(|t| t > now + chrono::Duration::hours(24)).unwrap_or(false);
		if primary_far_out {
			(None, primary, Some(false))
		} else {
			(primary, None, None)
		}
	} else {
		(None, None, None)
	};

	let derived_limit_reached = session.as_ref().map(|w| w.used_percent >= 100).unwrap_or(false)
		|| weekly.as_ref().map(|w| w.used_percent >= 100).unwrap_or(false);

	QuotaSnapshot {
		session,
		weekly,
		limit_reached: rate_limit.limit_reached || derived_limit_reached,
		session_supported,
		last_updated: Some(now),
	}
}

fn to_window(raw: RawWindow) -> QuotaWindow {
	QuotaWindow::new(raw.used_percent, reset_instant(raw.reset_at))
}

fn reset_instant(unix_seconds: i64) -> Option<DateTime<Utc>> {
	if unix_seconds <= 0 {
		return None;
	}
	Utc.timestamp_opt(unix_seconds, 0).single()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn window(used_percent: f64, reset_at: i64) -> RawWindow {
		RawWindow { used_percent, reset_at }
	}

	#[test]
	fn placeholder_secondary_with_far_primary_is_discarded() {
		let now = Utc::now();
		let rate_limit = RateLimit {
			limit_reached: false,
			primary_window: Some(window(2.1, (now + chrono::Duration::days(7)).timestamp())),
			secondary_window: Some(window(0.0, 0)),
		};
		let snapshot = map_rate_limit(&rate_limit, now);
		assert!(snapshot.session.is_none());
		assert_eq!(snapshot.weekly.unwrap().used_percent, 2);
		assert_eq!(snapshot.session_supported, Some(false));
	}

	#[test]
	fn present_secondary_maps_to_session_and_weekly() {
		let now = Utc::now();
		let rate_limit = RateLimit {
			limit_reached: false,
			primary_window: Some(window(50.0, (now + chrono::Duration::hours(2)).timestamp())),
			secondary_window: Some(window(10.0, (now + chrono::Duration::days(5)).timestamp())),
		};
		let snapshot = map_rate_limit(&rate_limit, now);
		assert_eq!(snapshot.session.unwrap().used_percent, 50);
		assert_eq!(snapshot.weekly.unwrap().used_percent, 10);
		assert_eq!(snapshot.session_supported, Some(true));
	}

	#[test]
	fn primary_within_24h_with_no_secondary_is_session_only() {
		let now = Utc::now();
		let rate_limit = RateLimit {
			limit_reached: false,
			primary_window: Some(window(33.0, (now + chrono::Duration::hours(1)).timestamp())),
			secondary_window: None,
		};
		let snapshot = map_rate_limit(&rate_limit, now);
		assert_eq!(snapshot.session.unwrap().used_percent, 33);
		assert!(snapshot.weekly.is_none());
		assert!(snapshot.session_supported.is_none());
	}

	#[test]
	fn primary_past_24h_with_no_secondary_is_weekly_only_and_session_unsupported() {
		let now = Utc::now();
		let rate_limit = RateLimit {
			limit_reached: false,
			primary_window: Some(window(5.0, (now + chrono::Duration::days(3)).timestamp())),
			secondary_window: None,
		};
		let snapshot = map_rate_limit(&rate_limit, now);
		assert!(snapshot.session.is_none());
		assert_eq!(snapshot.weekly.unwrap().used_percent, 5);
		assert_eq!(snapshot.session_supported, Some(false));
	}

	#[test]
	fn derives_limit_reached_from_saturated_window() {
		let now = Utc::now();
		let rate_limit = RateLimit {
			limit_reached: false,
			primary_window: Some(window(100.0, (now + chrono::Duration::hours(1)).timestamp())),
			secondary_window: None,
		};
		let snapshot = map_rate_limit(&rate_limit, now);
		assert!(snapshot.limit_reached);
	}
}
