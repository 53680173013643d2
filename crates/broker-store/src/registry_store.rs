// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component A: whole-document registry persistence (§4.A).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use broker_core::{AccountRegistry, BrokerError, BrokerResult};
use chrono::Utc;

/// Load/save of the single account registry document.
///
/// A missing file is not an error: `load` returns a fresh default registry
/// so the first-ever run of the daemon has somewhere to start from.
#[async_trait]
pub trait StateStore: Send + Sync {
	async fn load(&self) -> BrokerResult<AccountRegistry>;
	async fn save(&self, registry: &AccountRegistry) -> BrokerResult<()>;
}

/// File-backed `StateStore`. Writes go to a temp file in the same directory
/// followed by a rename, so a reader never observes a partial document
/// (§3 invariant: "a Save made durable after a concurrent Load yields a
/// consistent snapshot").
pub struct FileStateStore {
	path: PathBuf,
}

impl FileStateStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

#[async_trait]
impl StateStore for FileStateStore {
	async fn load(&self) -> BrokerResult<AccountRegistry> {
		let path = self.path.clone();
		let bytes = match tokio::fs::read(&path).await {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				return Ok(AccountRegistry::default());
			}
			Err(err) => return Err(BrokerError::PersistState(err.to_string())),
		};
		serde_json::from_slice(&bytes).map_err(|e| BrokerError::PersistState(e.to_string()))
	}

	async fn save(&self, registry: &AccountRegistry) -> BrokerResult<()> {
		let mut registry = registry.clone();
		registry.updated_at = Utc::now();

		let dir = self
			.path
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| PathBuf::from("."));
		tokio::fs::create_dir_all(&dir)
			.await
			.map_err(|e| BrokerError::PersistState(e.to_string()))?;

		let json = serde_json::to_vec_pretty(&registry).map_err(|e| BrokerError::PersistState(e.to_string()))?;

		write_atomic(&self.path, &json).await.map_err(|e| BrokerError::PersistState(e.to_string()))
	}
}

/// Write `bytes` to `path` via write-temp-then-rename, owner-only permissions
/// on Unix.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
	let dir = path.parent().unwrap_or_else(|| Path::new("."));
	let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("state");
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
