// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use broker_core::AddAccountInput;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{account_not_found_as_400, ApiError};
use crate::state::AppState;

pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	let accounts = state.manager.list_accounts().await?;
	Ok(Json(json!({ "accounts": accounts })))
}

pub async fn add_account(State(state): State<AppState>, Json(input): Json<AddAccountInput>) -> Result<impl IntoResponse, ApiError> {
	let account = state.manager.add_account(input).await?;
	Ok((StatusCode::CREATED, Json(account)))
}

pub async fn activate_account(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
	state.manager.set_active_account(&id).await.map_err(account_not_found_as_400)?;
	Ok(Json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct ImportBody {
	#[serde(default = "default_overwrite")]
	pub overwrite_existing: bool,
}

fn default_overwrite() -> bool {
	true
}

pub async fn import_candidate(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	let discovery = state.manager.discover_codex_import_candidate(&state.codex_credentials_file).await?;
	Ok(Json(serde_json::to_value(discovery).expect("ImportDiscovery always serializes")))
}

pub async fn import_run(State(state): State<AppState>, body: Option<Json<ImportBody>>) -> Result<Json<Value>, ApiError> {
	let overwrite_existing = body.map(|Json(b)| b.overwrite_existing).unwrap_or(true);
	let result = state.manager.import_codex_local_credentials(&state.codex_credentials_file, overwrite_existing).await?;
	Ok(Json(serde_json::to_value(result).expect("ImportResult always serializes")))
}
