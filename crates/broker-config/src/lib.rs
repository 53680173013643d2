// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Path resolution and CLI flags for the account broker daemon.

pub mod cli;
pub mod error;
pub mod paths;

pub use cli::DaemonArgs;
pub use error::ConfigError;
pub use paths::{codex_credentials_file, resolve_xdg_paths, PathsConfig};
