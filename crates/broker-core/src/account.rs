// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Account records (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quota::QuotaSnapshot;

/// Runtime status of an account (§4.F state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
	Ready,
	NeedReauth,
	Disabled,
}

impl Default for AccountStatus {
	fn default() -> Self {
		Self::Ready
	}
}

/// A provider tag. Lowercased; initially only `"codex"` is recognized.
pub type Provider = String;

/// An account entry in the registry. The access token itself never appears
/// here — it lives in the secret store, keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
	pub id: String,
	pub provider: Provider,
	#[serde(default)]
	pub email: String,
	pub status: AccountStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub access_expires_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_expires_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_refresh_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_applied_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub last_error: String,
	#[serde(default)]
	pub quota: QuotaSnapshot,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Account {
	pub fn is_usable(&self) -> bool {
		matches!(self.status, AccountStatus::Ready)
	}

	pub fn mark_need_reauth(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
		self.status = AccountStatus::NeedReauth;
		self.last_error = error.into();
		self.updated_at = now;
	}

	pub fn mark_ready(&mut self, now: DateTime<Utc>) {
		self.status = AccountStatus::Ready;
		self.last_error.clear();
		self.updated_at = now;
	}
}

/// Input payload to `AddAccount` (§4.F).
#[derive(Debug, Clone, Deserialize)]
pub struct AddAccountInput {
	pub id: String,
	pub provider: Provider,
	#[serde(default)]
	pub email: String,
	pub access_token: String,
	#[serde(default)]
	pub refresh_token: Option<String>,
	#[serde(default)]
	pub id_token: Option<String>,
	#[serde(default)]
	pub account_id: Option<String>,
	#[serde(default)]
	pub access_expires_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub refresh_expires_at: Option<DateTime<Utc>>,
}
