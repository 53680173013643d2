// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The switchability predicate and candidate ordering used by
//! `HandleQuotaError` (§4.F).

use broker_core::{Account, RoutingStrategy};
use serde::Serialize;

const SWITCHABLE_STATUS_CODES: [u16; 3] = [429, 500, 503];

const SWITCHABLE_MESSAGE_PATTERNS: [&str; 11] = [
	"quota exceeded",
	"rate limit",
	"limit reached",
	"insufficient_quota",
	"resource_exhausted",
	"overloaded",
	"capacity",
	"too many requests",
	"throttl",
	"authentication",
	"unauthorized",
];

const ACCESS_DENIED_PATTERN: &str = "access denied";

/// Outcome of `HandleQuotaError` (§6 `/v1/switch/on-error`).
#[derive(Debug, Clone, Serialize)]
pub struct SwitchResult {
	pub switched: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from_account_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub to_account_id: Option<String>,
	pub reason: String,
}

/// Whether an upstream failure should trigger account rotation.
pub fn is_switchable(status_code: u16, message: &str) -> bool {
	if SWITCHABLE_STATUS_CODES.contains(&status_code) {
		return true;
	}
	let lower = message.to_ascii_lowercase();
	SWITCHABLE_MESSAGE_PATTERNS.iter().any(|p| lower.contains(p)) || lower.contains(ACCESS_DENIED_PATTERN)
}

/// Orders switch candidates (every account but the current active one) per
/// the registry's routing strategy.
pub fn order_candidates<'a>(
	accounts: impl Iterator<Item = &'a Account>,
	active_id: &str,
	strategy: RoutingStrategy,
) -> Vec<String> {
	let mut candidates: Vec<&Account> = accounts.filter(|a| a.id != active_id).collect();
	match strategy {
		RoutingStrategy::FillFirst => {
			candidates.sort_by(|a, b| {
				let a_used = a.quota.session_used() as u32 + a.quota.weekly_used() as u32;
				let b_used = b.quota.session_used() as u32 + b.quota.weekly_used() as u32;
				a_used.cmp(&b_used).then_with(|| a.id.cmp(&b.id))
			});
		}
		RoutingStrategy::RoundRobin => {
			candidates.sort_by(|a, b| a.id.cmp(&b.id));
		}
	}
	candidates.into_iter().map(|a| a.id.clone()).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use broker_core::{AccountStatus, QuotaSnapshot, QuotaWindow};
	use chrono::Utc;

	fn account(id: &str, session_used: u8, weekly_used: u8) -> Account {
		Account {
			id: id.into(),
			provider: "codex".into(),
			email: String::new(),
			status: AccountStatus::Ready,
			access_expires_at: None,
			refresh_expires_at: None,
			last_refresh_at: None,
			last_applied_at: None,
			last_error: String::new(),
			quota: QuotaSnapshot {
				session: Some(QuotaWindow::new(session_used as f64, None)),
				weekly: Some(QuotaWindow::new(weekly_used as f64, None)),
				..Default::default()
			},
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn should_switch_on_rate_limited_status_code() {
		assert!(is_switchable(429, ""));
	}

	#[test]
	fn should_switch_on_insufficient_quota_message() {
		assert!(is_switchable(400, "insufficient_quota"));
	}

	#[test]
	fn should_switch_on_message_regardless_of_status_code() {
		assert!(is_switchable(200, "Rate limit exceeded"));
	}

	#[test]
	fn should_not_switch_on_unrelated_ok_message() {
		assert!(!is_switchable(200, "ok"));
	}

	#[test]
	fn fill_first_orders_by_ascending_combined_usage_then_id() {
		let accounts = vec![account("A", 50, 10), account("B", 70, 10), account("C", 20, 10)];
		let ordered = order_candidates(accounts.iter(), "A", RoutingStrategy::FillFirst);
		assert_eq!(ordered, vec!["C".to_string(), "B".to_string()]);
	}

	#[test]
	fn round_robin_orders_lexicographically_by_id() {
		let accounts = vec![account("C", 0, 0), account("A", 0, 0), account("B", 0, 0)];
		let ordered = order_candidates(accounts.iter(), "A", RoutingStrategy::RoundRobin);
		assert_eq!(ordered, vec!["B".to_string(), "C".to_string()]);
	}

	#[test]
	fn active_account_is_excluded_from_candidates() {
		let accounts = vec![account("A", 0, 0), account("B", 0, 0)];
		let ordered = order_candidates(accounts.iter(), "A", RoutingStrategy::RoundRobin);
		assert_eq!(ordered, vec!["B".to_string()]);
	}
}
