// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::extract::{Path, State};
use axum::Json;
use broker_core::QuotaSnapshot;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{account_not_found_as_400, ApiError};
use crate::state::AppState;

pub async fn update_quota(State(state): State<AppState>, Path(id): Path<String>, Json(snapshot): Json<QuotaSnapshot>) -> Result<Json<Value>, ApiError> {
	state.manager.update_quota(&id, snapshot).await.map_err(account_not_found_as_400)?;
	Ok(Json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize, Default)]
pub struct SyncBody {
	#[serde(default)]
	pub account_id: Option<String>,
}

pub async fn sync_one(State(state): State<AppState>, body: Option<Json<SyncBody>>) -> Result<Json<QuotaSnapshot>, ApiError> {
	let account_id = body.and_then(|Json(b)| b.account_id).filter(|id| !id.is_empty());
	let snapshot = state.manager.sync_quota_from_upstream(account_id.as_deref()).await?;
	Ok(Json(snapshot))
}

pub async fn sync_all(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	let result = state.manager.sync_all_quotas_from_upstream().await?;
	Ok(Json(serde_json::to_value(result).expect("SyncAllResult always serializes")))
}
