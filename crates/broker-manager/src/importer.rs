// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component H: discovers an existing upstream CLI login on disk and
//! materializes it as an account (§4.H).

use std::path::Path;

use broker_core::{Account, AddAccountInput, BrokerError, BrokerResult};
use broker_oauth::parse_id_token;
use serde::Serialize;

use crate::manager::Manager;

const PROVIDER: &str = "codex";

/// One candidate discovered in the upstream CLI's own credential file.
#[derive(Debug, Clone, Serialize)]
pub struct ImportCandidate {
	pub id: String,
	pub email: String,
}

/// `GET /v1/accounts/import/codex/candidate` response shape (§6).
#[derive(Debug, Clone, Serialize)]
pub struct ImportDiscovery {
	pub found: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub candidate: Option<ImportCandidate>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub already_exists: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub enum ImportAction {
	#[serde(rename = "created")]
	Created,
	#[serde(rename = "updated")]
	Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
	pub status: &'static str,
	pub action: ImportAction,
	pub account: Account,
}

/// Parses the upstream CLI's `tokens` document into an `AddAccountInput`,
/// without touching the registry. Returns `None` when the file does not
/// exist — that is not an error (§4.H).
async fn read_local_credentials(credentials_file: &Path) -> BrokerResult<Option<AddAccountInput>> {
	let bytes = match tokio::fs::read(credentials_file).await {
		Ok(bytes) => bytes,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(err) => return Err(BrokerError::Internal(err.to_string())),
	};

	let doc: serde_json::Value =
		serde_json::from_slice(&bytes).map_err(|e| BrokerError::Internal(format!("parsing codex credentials file: {e}")))?;

	let tokens = doc.get("tokens").cloned().unwrap_or(serde_json::Value::Null);
	let access_token = tokens.get("access_token").and_then(|v| v.as_str()).unwrap_or_default().to_string();
	if access_token.is_empty() {
		return Ok(None);
	}
	let refresh_token = tokens.get("refresh_token").and_then(|v| v.as_str()).map(str::to_string);
	let id_token = tokens.get("id_token").and_then(|v| v.as_str()).map(str::to_string);

	let (email, account_id) = id_token.as_deref().map(parse_id_token).unwrap_or_default();

	let id = if !email.is_empty() {
		format!("{PROVIDER}:{}", email.to_ascii_lowercase())
	} else if !account_id.is_empty() {
		format!("{PROVIDER}:{account_id}")
	} else {
		format!("{PROVIDER}:{}", chrono::Utc::now().format("%Y%m%dT%H%M%SZ"))
	};

	Ok(Some(AddAccountInput {
		id,
		provider: PROVIDER.to_string(),
		email,
		access_token,
		refresh_token,
		id_token,
		account_id: if account_id.is_empty() { None } else { Some(account_id) },
		access_expires_at: None,
		refresh_expires_at: None,
	}))
}

impl Manager {
	/// Candidate discovery half of component H.
	pub async fn discover_codex_import_candidate(&self, credentials_file: &Path) -> BrokerResult<ImportDiscovery> {
		let Some(input) = read_local_credentials(credentials_file).await? else {
			return Ok(ImportDiscovery { found: false, candidate: None, already_exists: None });
		};

		let registry = self.state_store().load().await?;
		let already_exists = registry.accounts.contains_key(&input.id);

		Ok(ImportDiscovery {
			found: true,
			candidate: Some(ImportCandidate { id: input.id, email: input.email }),
			already_exists: Some(already_exists),
		})
	}

	/// Import half of component H.
	pub async fn import_codex_local_credentials(&self, credentials_file: &Path, overwrite_existing: bool) -> BrokerResult<ImportResult> {
		let Some(input) = read_local_credentials(credentials_file).await? else {
			return Err(BrokerError::NotFound("no local codex credentials found".into()));
		};

		let registry = self.state_store().load().await?;
		let already_exists = registry.accounts.contains_key(&input.id);

		if already_exists && !overwrite_existing {
			return Err(BrokerError::Conflict(format!("account {} already exists", input.id)));
		}

		let account = self.add_account(input).await?;
		let action = if already_exists { ImportAction::Updated } else { ImportAction::Created };

		Ok(ImportResult { status: "ok", action, account })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use base64::engine::general_purpose::URL_SAFE_NO_PAD;
	use base64::Engine;
	use broker_applier::NoopApplier;
	use broker_store::{FileSecretStore, FileStateStore, IdentityProtector};
	use std::sync::Arc;

	fn manager(dir: &Path) -> Manager {
		let state_store = Arc::new(FileStateStore::new(dir.join("registry.json")));
		let secret_store = Arc::new(FileSecretStore::new(dir.join("secrets"), Arc::new(IdentityProtector)));
		Manager::new(state_store, secret_store, Arc::new(NoopApplier))
	}

	#[tokio::test]
	async fn discover_returns_not_found_when_file_missing() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());
		let discovery = manager.discover_codex_import_candidate(&dir.path().join("auth.json")).await.unwrap();
		assert!(!discovery.found);
	}

	#[tokio::test]
	async fn discover_finds_candidate_with_email_derived_id() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());

		let file = dir.path().join("auth.json");
		let header = URL_SAFE_NO_PAD.encode(b"{}");
		let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({"email": "u@x"}).to_string());
		let id_token = format!("{header}.{payload}.sig");

		tokio::fs::write(&file, serde_json::json!({"tokens": {"access_token": "at-1", "id_token": id_token}}).to_string())
			.await
			.unwrap();

		let discovery = manager.discover_codex_import_candidate(&file).await.unwrap();
		assert!(discovery.found);
		assert_eq!(discovery.candidate.unwrap().id, "codex:u@x");
		assert_eq!(discovery.already_exists, Some(false));
	}

	#[tokio::test]
	async fn import_without_overwrite_conflicts_on_existing_id() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());

		manager
			.add_account(AddAccountInput {
				id: "codex:u@x".into(),
				provider: "codex".into(),
				email: "u@x".into(),
				access_token: "existing".into(),
				refresh_token: None,
				id_token: None,
				account_id: None,
				access_expires_at: None,
				refresh_expires_at: None,
			})
			.await
			.unwrap();

		let file = dir.path().join("auth.json");
		let header = URL_SAFE_NO_PAD.encode(b"{}");
		let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({"email": "u@x"}).to_string());
		let id_token = format!("{header}.{payload}.sig");
		tokio::fs::write(&file, serde_json::json!({"tokens": {"access_token": "at-new", "id_token": id_token}}).to_string())
			.await
			.unwrap();

		let result = manager.import_codex_local_credentials(&file, false).await;
		assert!(matches!(result, Err(BrokerError::Conflict(_))));

		let updated = manager.import_codex_local_credentials(&file, true).await.unwrap();
		assert!(matches!(updated.action, ImportAction::Updated));
	}
}
