// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component B: per-account secret blobs (§4.B).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use broker_core::{AuthSecrets, BrokerError, BrokerResult};

use crate::protect::SecretProtector;

/// Put/Get/Delete of one account's `AuthSecrets`, keyed by account id.
///
/// `delete` of an id that was never stored is a no-op success, not an
/// error — callers don't need to distinguish "already gone" from "removed
/// just now". An `unprotect` failure on `get` is surfaced distinctly from
/// "not found" so the manager can mark the account `need_reauth` instead of
/// treating the account as absent.
#[async_trait]
pub trait SecretStore: Send + Sync {
	async fn put(&self, account_id: &str, secrets: &AuthSecrets) -> BrokerResult<()>;
	async fn get(&self, account_id: &str) -> BrokerResult<Option<AuthSecrets>>;
	async fn delete(&self, account_id: &str) -> BrokerResult<()>;
}

/// File-backed `SecretStore`. One file per account under `secrets_dir`,
/// named by URL-safe-base64-no-padding encoding of the raw account id, so
/// ids containing `/` or other path-hostile characters never collide or
/// escape the directory.
pub struct FileSecretStore {
	secrets_dir: PathBuf,
	protector: Arc<dyn SecretProtector>,
}

impl FileSecretStore {
	pub fn new(secrets_dir: impl Into<PathBuf>, protector: Arc<dyn SecretProtector>) -> Self {
		Self {
			secrets_dir: secrets_dir.into(),
			protector,
		}
	}

	fn path_for(&self, account_id: &str) -> PathBuf {
		let encoded = URL_SAFE_NO_PAD.encode(account_id.as_bytes());
		self.secrets_dir.join(format!("{encoded}.secret"))
	}
}

#[async_trait]
impl SecretStore for FileSecretStore {
	async fn put(&self, account_id: &str, secrets: &AuthSecrets) -> BrokerResult<()> {
		tokio::fs::create_dir_all(&self.secrets_dir)
			.await
			.map_err(|e| BrokerError::PersistSecrets(e.to_string()))?;

		let json = serde_json::to_vec(secrets).map_err(|e| BrokerError::PersistSecrets(e.to_string()))?;
		let protected = self.protector.protect(&json)?;

		let path = self.path_for(account_id);
		write_atomic(&path, &protected)
			.await
			.map_err(|e| BrokerError::PersistSecrets(e.to_string()))
	}

	async fn get(&self, account_id: &str) -> BrokerResult<Option<AuthSecrets>> {
		let path = self.path_for(account_id);
		let protected = match tokio::fs::read(&path).await {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(BrokerError::PersistSecrets(err.to_string())),
		};

		// Unprotect failure is a distinct error from "not found": the caller
		// must not treat a corrupted or re-keyed blob as an absent account.
		let plaintext = self.protector.unprotect(&protected).map_err(|e| BrokerError::SecretCorrupt(e.to_string()))?;

		let secrets =
			serde_json::from_slice(&plaintext).map_err(|e| BrokerError::PersistSecrets(e.to_string()))?;
		Ok(Some(secrets))
	}

	async fn delete(&self, account_id: &str) -> BrokerResult<()> {
		let path = self.path_for(account_id);
		match tokio::fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(BrokerError::PersistSecrets(err.to_string())),
		}
	}
}

async fn write_atomic(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
	let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
	let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("secret");
	let tmp_path = dir.join(format!(".{file_name}.tmp-{}", std::process::id()));

	tokio::fs::write(&tmp_path, bytes).await?;

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		let perms = std::fs::Permissions::from_mode(0o600);
		tokio::fs::set_permissions(&tmp_path, perms).await?;
	}

	tokio::fs::rename(&tmp_path, path).await
}
