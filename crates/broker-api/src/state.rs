// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared application state threaded through every handler via axum's
//! `State` extractor (§9 "Global mutable state": one Manager, one OAuth
//! engine, constructed at startup).

use std::path::PathBuf;
use std::sync::Arc;

use broker_manager::Manager;
use broker_oauth::OAuthEngine;

use crate::controller::ProcessController;

#[derive(Clone)]
pub struct AppState {
	pub manager: Arc<Manager>,
	pub oauth: Arc<OAuthEngine>,
	pub controller: Arc<ProcessController>,
	pub codex_credentials_file: PathBuf,
}
