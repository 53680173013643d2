// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution for the broker's on-disk
//! state (§6 "Persisted state layout").

use std::path::PathBuf;

use crate::error::ConfigError;

/// Resolved on-disk locations for the broker's durable state.
#[derive(Debug, Clone)]
pub struct PathsConfig {
	/// The account registry document: `~/.config/account-broker/registry.json`
	pub registry_file: PathBuf,
	/// Sibling directory holding one encrypted blob per account.
	pub secrets_dir: PathBuf,
}

impl PathsConfig {
	pub fn config_dir(&self) -> PathBuf {
		self
			.registry_file
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| self.registry_file.clone())
	}
}

/// Resolve XDG paths according to the Base Directory Specification.
///
/// Uses `XDG_CONFIG_HOME` if set, otherwise falls back to `~/.config`.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;

	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".config"));

	let base = config_home.join("account-broker");

	tracing::debug!(config_dir = %base.display(), "resolved account broker paths");

	Ok(PathsConfig {
		registry_file: base.join("registry.json"),
		secrets_dir: base.join("secrets"),
	})
}

/// The upstream CLI's well-known credential file (§4.C, §4.H).
///
/// Honors `CODEX_HOME` the way the upstream CLI itself does, falling back to
/// `~/.codex`.
pub fn codex_credentials_file() -> Result<PathBuf, ConfigError> {
	let codex_home = match std::env::var_os("CODEX_HOME") {
		Some(dir) => PathBuf::from(dir),
		None => dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?.join(".codex"),
	};
	Ok(codex_home.join("auth.json"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolve_xdg_paths_succeeds() {
		let paths = resolve_xdg_paths().unwrap();
		assert!(paths
			.registry_file
			.to_string_lossy()
			.contains("account-broker"));
		assert!(paths.secrets_dir.to_string_lossy().ends_with("secrets"));
	}

	#[test]
	fn config_dir_is_parent_of_registry_file() {
		let paths = resolve_xdg_paths().unwrap();
		let dir = paths.config_dir();
		assert!(paths.registry_file.starts_with(&dir));
	}

	#[test]
	fn codex_credentials_file_honors_env_override() {
		std::env::set_var("CODEX_HOME", "/tmp/codex-test-home");
		let path = codex_credentials_file().unwrap();
		assert_eq!(path, PathBuf::from("/tmp/codex-test-home/auth.json"));
		std::env::remove_var("CODEX_HOME");
	}
}
