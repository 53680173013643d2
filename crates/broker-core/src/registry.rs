// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The account registry document (§3), persisted whole by the state store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::Account;

/// Routing strategy tag selecting the candidate ordering rule (§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
	RoundRobin,
	FillFirst,
}

impl Default for RoutingStrategy {
	fn default() -> Self {
		Self::RoundRobin
	}
}

impl RoutingStrategy {
	pub fn parse(tag: &str) -> Option<Self> {
		match tag {
			"round-robin" => Some(Self::RoundRobin),
			"fill-first" => Some(Self::FillFirst),
			_ => None,
		}
	}
}

const SCHEMA_VERSION: u32 = 1;

/// The durable account registry document (§3, component A).
///
/// The account map is unordered; iteration order is never observable through
/// the API — `ListAccounts` always sorts explicitly before returning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRegistry {
	#[serde(default = "default_schema_version")]
	pub schema_version: u32,
	#[serde(default)]
	pub active_account_id: Option<String>,
	#[serde(default)]
	pub strategy: RoutingStrategy,
	#[serde(default)]
	pub accounts: HashMap<String, Account>,
	#[serde(default = "Utc::now")]
	pub updated_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
	SCHEMA_VERSION
}

impl Default for AccountRegistry {
	fn default() -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			active_account_id: None,
			strategy: RoutingStrategy::default(),
			accounts: HashMap::new(),
			updated_at: Utc::now(),
		}
	}
}

impl AccountRegistry {
	pub fn active_account(&self) -> Option<&Account> {
		self
			.active_account_id
			.as_ref()
			.and_then(|id| self.accounts.get(id))
	}

	/// Accounts sorted by `updated_at` descending, ties broken by id ascending.
	pub fn list_sorted(&self) -> Vec<&Account> {
		let mut accounts: Vec<&Account> = self.accounts.values().collect();
		accounts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
		accounts
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::account::AccountStatus;
	use crate::quota::QuotaSnapshot;
	use chrono::Duration;

	fn account(id: &str, updated_at: DateTime<Utc>) -> Account {
		Account {
			id: id.to_string(),
			provider: "codex".into(),
			email: String::new(),
			status: AccountStatus::Ready,
			access_expires_at: None,
			refresh_expires_at: None,
			last_refresh_at: None,
			last_applied_at: None,
			last_error: String::new(),
			quota: QuotaSnapshot::default(),
			created_at: updated_at,
			updated_at,
		}
	}

	#[test]
	fn default_registry_has_round_robin_and_empty_map() {
		let registry = AccountRegistry::default();
		assert_eq!(registry.strategy, RoutingStrategy::RoundRobin);
		assert!(registry.accounts.is_empty());
		assert!(registry.active_account_id.is_none());
	}

	#[test]
	fn list_sorted_orders_by_updated_at_desc_then_id() {
		let now = Utc::now();
		let mut registry = AccountRegistry::default();
		registry.accounts.insert("b".into(), account("b", now));
		registry
			.accounts
			.insert("a".into(), account("a", now + Duration::seconds(10)));
		registry.accounts.insert("c".into(), account("c", now));

		let sorted = registry.list_sorted();
		let ids: Vec<&str> = sorted.iter().map(|a| a.id.as_str()).collect();
		assert_eq!(ids, vec!["a", "b", "c"]);
	}

	#[test]
	fn strategy_parse_accepts_known_tags_only() {
		assert_eq!(
			RoutingStrategy::parse("round-robin"),
			Some(RoutingStrategy::RoundRobin)
		);
		assert_eq!(
			RoutingStrategy::parse("fill-first"),
			Some(RoutingStrategy::FillFirst)
		);
		assert_eq!(RoutingStrategy::parse("bogus"), None);
	}
}
