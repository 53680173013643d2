// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration error types.

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Could not determine home directory")]
	HomeDirNotFound,

	#[error("invalid listen address {0}: {1}")]
	InvalidListenAddr(String, String),
}
