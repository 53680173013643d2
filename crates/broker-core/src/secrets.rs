// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Auth secrets record (§3) — the part of an account that lives only in the
//! secret store, never in the registry document.

use broker_secret::SecretString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-account secret record persisted by the secret store (component B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSecrets {
	pub access_token: SecretString,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<SecretString>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<SecretString>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider_account_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_expires_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl PartialEq for AuthSecrets {
	fn eq(&self, other: &Self) -> bool {
		self.access_token == other.access_token
			&& self.refresh_token == other.refresh_token
			&& self.id_token == other.id_token
			&& self.provider_account_id == other.provider_account_id
			&& self.access_expires_at == other.access_expires_at
			&& self.refresh_expires_at == other.refresh_expires_at
	}
}
