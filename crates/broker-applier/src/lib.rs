// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Component C: materializes an account's tokens into the upstream CLI's
//! own credential file so that CLI can use them directly (§4.C).

use std::path::PathBuf;

use async_trait::async_trait;
use broker_core::{Account, AuthSecrets, BrokerError, BrokerResult};
use serde_json::{Map, Value};

/// `Apply(account, secrets)`: writes `secrets` into whatever on-disk form
/// `account.provider`'s CLI expects. Never mutates registry/secret-store
/// state — the Manager gates activation on its return value alone.
#[async_trait]
pub trait CredentialApplier: Send + Sync {
	async fn apply(&self, account: &Account, secrets: &AuthSecrets) -> BrokerResult<()>;
}

/// Applies to the one provider this installation knows how to drive
/// end-to-end today. Unknown providers are a no-op success so adding a
/// provider to the registry never requires touching this component first.
pub struct CodexApplier {
	credentials_file: PathBuf,
}

impl CodexApplier {
	pub fn new(credentials_file: impl Into<PathBuf>) -> Self {
		Self {
			credentials_file: credentials_file.into(),
		}
	}
}

#[async_trait]
impl CredentialApplier for CodexApplier {
	async fn apply(&self, account: &Account, secrets: &AuthSecrets) -> BrokerResult<()> {
		if account.provider != "codex" {
			return Ok(());
		}

		let dir = self
			.credentials_file
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| PathBuf::from("."));
		tokio::fs::create_dir_all(&dir)
			.await
			.map_err(|e| BrokerError::Internal(format!("creating codex credentials dir: {e}")))?;

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			if let Ok(meta) = tokio::fs::metadata(&dir).await {
				let mut perms = meta.permissions();
				perms.set_mode(0o700);
				let _ = tokio::fs::set_permissions(&dir, perms).await;
			}
		}

		let mut doc = match tokio::fs::read(&self.credentials_file).await {
			Ok(bytes) => serde_json::from_slice::<Value>(&bytes)
				.map_err(|e| BrokerError::Internal(format!("parsing codex credentials file: {e}")))?,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Value::Object(Map::new()),
			Err(err) => return Err(BrokerError::Internal(format!("reading codex credentials file: {err}"))),
		};

		let root = doc
			.as_object_mut()
			.ok_or_else(|| BrokerError::Internal("codex credentials file is not a JSON object".into()))?;

		let mut tokens = root
			.remove("tokens")
			.and_then(|v| v.as_object().cloned())
			.unwrap_or_default();

		tokens.insert("access_token".into(), Value::String(secrets.access_token.expose().to_string()));
		if let Some(refresh) = &secrets.refresh_token {
			tokens.insert("refresh_token".into(), Value::String(refresh.expose().to_string()));
		}
		if let Some(id_token) = &secrets.id_token {
			tokens.insert("id_token".into(), Value::String(id_token.expose().to_string()));
		}
		if let Some(account_id) = &secrets.provider_account_id {
			tokens.insert("account_id".into(), Value::String(account_id.clone()));
		}

		root.insert("tokens".into(), Value::Object(tokens));

		let bytes = serde_json::to_vec_pretty(&doc)
			.map_err(|e| BrokerError::Internal(format!("serializing codex credentials file: {e}")))?;

		write_owner_only(&self.credentials_file, &bytes)
			.await
			.map_err(|e| BrokerError::Internal(format!("writing codex credentials file: {e}")))
	}
}

async fn write_owner_only(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
	tokio::fs::write(path, bytes).await?;
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		let perms = std::fs::Permissions::from_mode(0o600);
		tokio::fs::set_permissions(path, perms).await?;
	}
	Ok(())
}

/// Applier that always succeeds without writing anything. Useful for
/// providers without a local CLI counterpart, and in tests that don't care
/// about the filesystem side effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopApplier;

#[async_trait]
impl CredentialApplier for NoopApplier {
	async fn apply(&self, _account: &Account, _secrets: &AuthSecrets) -> BrokerResult<()> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use broker_core::AccountStatus;
	use broker_secret::SecretString;
	use chrono::Utc;

	fn account(provider: &str) -> Account {
		Account {
			id: "codex:alice@example.com".into(),
			provider: provider.into(),
			email: "alice@example.com".into(),
			status: AccountStatus::Ready,
			access_expires_at: None,
			refresh_expires_at: None,
			last_refresh_at: None,
			last_applied_at: None,
			last_error: String::new(),
			quota: Default::default(),
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn secrets() -> AuthSecrets {
		AuthSecrets {
			access_token: SecretString::new("at-1"),
			refresh_token: Some(SecretString::new("rt-1")),
			id_token: None,
			provider_account_id: Some("acct-1".into()),
			access_expires_at: None,
			refresh_expires_at: None,
		}
	}

	#[tokio::test]
	async fn unknown_provider_is_noop_success() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("nonexistent").join("auth.json");
		let applier = CodexApplier::new(&file);
		applier.apply(&account("other"), &secrets()).await.unwrap();
		assert!(!file.exists());
	}

	#[tokio::test]
	async fn creates_file_and_dir_when_missing() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("codex").join("auth.json");
		let applier = CodexApplier::new(&file);
		applier.apply(&account("codex"), &secrets()).await.unwrap();

		let contents = tokio::fs::read_to_string(&file).await.unwrap();
		let doc: Value = serde_json::from_str(&contents).unwrap();
		assert_eq!(doc["tokens"]["access_token"], "at-1");
		assert_eq!(doc["tokens"]["refresh_token"], "rt-1");
	}

	#[tokio::test]
	async fn preserves_unrelated_top_level_fields_and_merges_tokens() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("auth.json");
		tokio::fs::write(
			&file,
			serde_json::json!({
				"OPENAI_API_KEY": "sk-unrelated",
				"tokens": {"access_token": "stale", "scope": "keep-me"},
			})
			.to_string(),
		)
		.await
		.unwrap();

		let applier = CodexApplier::new(&file);
		applier.apply(&account("codex"), &secrets()).await.unwrap();

		let contents = tokio::fs::read_to_string(&file).await.unwrap();
		let doc: Value = serde_json::from_str(&contents).unwrap();
		assert_eq!(doc["OPENAI_API_KEY"], "sk-unrelated");
		assert_eq!(doc["tokens"]["access_token"], "at-1");
		assert_eq!(doc["tokens"]["scope"], "keep-me");
	}
}
