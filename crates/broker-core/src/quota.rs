// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Quota windows and snapshots (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clamp a fractional used-percent into `[0, 100]`, rounding to the nearest
/// integer. Inputs from the wire always pass through this before storage.
pub fn clamp_percent(value: f64) -> u8 {
	let rounded = value.round();
	if rounded < 0.0 {
		0
	} else if rounded > 100.0 {
		100
	} else {
		rounded as u8
	}
}

/// A single `(used_percent, reset_at)` pair describing one reset horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaWindow {
	pub used_percent: u8,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reset_at: Option<DateTime<Utc>>,
}

impl QuotaWindow {
	pub fn new(used_percent: f64, reset_at: Option<DateTime<Utc>>) -> Self {
		Self {
			used_percent: clamp_percent(used_percent),
			reset_at,
		}
	}
}

/// A snapshot of an account's quota state (§3, §4.E).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session: Option<QuotaWindow>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub weekly: Option<QuotaWindow>,
	#[serde(default)]
	pub limit_reached: bool,
	/// `false` when the provider reports only a weekly window for this
	/// account tier (no session window is meaningful to show).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_supported: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_updated: Option<DateTime<Utc>>,
}

impl QuotaSnapshot {
	/// Merge an incoming snapshot into the current one (§4.F merge rule).
	///
	/// A window missing from `incoming` never overwrites a window already
	/// held in `self` — this is what preserves a last-known session percent
	/// when the upstream later reports a weekly-only response.
	/// `limit_reached` is the OR of the incoming flag and any derivation
	/// from the merged percents (session or weekly >= 100).
	/// `session_supported` is only updated when `incoming` explicitly sets it.
	pub fn merge(&self, incoming: &QuotaSnapshot) -> QuotaSnapshot {
		let session = incoming.session.clone().or_else(|| self.session.clone());
		let weekly = incoming.weekly.clone().or_else(|| self.weekly.clone());

		let derived_limit_reached = session.as_ref().is_some_and(|w| w.used_percent >= 100)
			|| weekly.as_ref().is_some_and(|w| w.used_percent >= 100);

		QuotaSnapshot {
			session,
			weekly,
			limit_reached: incoming.limit_reached || derived_limit_reached,
			session_supported: incoming.session_supported.or(self.session_supported),
			last_updated: incoming.last_updated.or(self.last_updated),
		}
	}

	pub fn session_used(&self) -> u8 {
		self.session.as_ref().map(|w| w.used_percent).unwrap_or(0)
	}

	pub fn weekly_used(&self) -> u8 {
		self.weekly.as_ref().map(|w| w.used_percent).unwrap_or(0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clamp_negative_rounds_to_zero() {
		assert_eq!(clamp_percent(-1.0), 0);
	}

	#[test]
	fn clamp_rounds_to_nearest() {
		assert_eq!(clamp_percent(12.6), 13);
		assert_eq!(clamp_percent(100.4), 100);
	}

	#[test]
	fn clamp_above_range_saturates() {
		assert_eq!(clamp_percent(101.0), 100);
	}

	#[test]
	fn merge_missing_window_preserves_existing() {
		let current = QuotaSnapshot {
			session: Some(QuotaWindow::new(42.0, None)),
			weekly: Some(QuotaWindow::new(10.0, None)),
			..Default::default()
		};
		let incoming = QuotaSnapshot {
			session: None,
			weekly: Some(QuotaWindow::new(15.0, None)),
			..Default::default()
		};

		let merged = current.merge(&incoming);
		assert_eq!(merged.session_used(), 42);
		assert_eq!(merged.weekly_used(), 15);
	}

	#[test]
	fn merge_with_empty_snapshot_is_identity() {
		let current = QuotaSnapshot {
			session: Some(QuotaWindow::new(30.0, None)),
			weekly: Some(QuotaWindow::new(60.0, None)),
			..Default::default()
		};
		let empty = QuotaSnapshot::default();

		let merged = current.merge(&empty);
		assert_eq!(merged.session, current.session);
		assert_eq!(merged.weekly, current.weekly);
	}

	#[test]
	fn merge_derives_limit_reached_from_percents() {
		let current = QuotaSnapshot::default();
		let incoming = QuotaSnapshot {
			session: Some(QuotaWindow::new(100.0, None)),
			..Default::default()
		};
		let merged = current.merge(&incoming);
		assert!(merged.limit_reached);
	}

	#[test]
	fn merge_session_supported_only_when_explicit() {
		let current = QuotaSnapshot {
			session_supported: Some(true),
			..Default::default()
		};
		let incoming = QuotaSnapshot::default();
		let merged = current.merge(&incoming);
		assert_eq!(merged.session_supported, Some(true));

		let incoming_explicit = QuotaSnapshot {
			session_supported: Some(false),
			..Default::default()
		};
		let merged2 = current.merge(&incoming_explicit);
		assert_eq!(merged2.session_supported, Some(false));
	}
}
