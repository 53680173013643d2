// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health_check() -> Json<Value> {
	Json(json!({ "status": "ok" }))
}

pub async fn status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	let registry = state.manager.status().await?;
	Ok(Json(json!({
		"active_account_id": registry.active_account_id,
		"strategy": registry.strategy,
		"accounts": registry.list_sorted(),
	})))
}

#[derive(Debug, serde::Deserialize)]
pub struct SetStrategyBody {
	pub strategy: String,
}

pub async fn set_strategy(State(state): State<AppState>, Json(body): Json<SetStrategyBody>) -> Result<Json<Value>, ApiError> {
	state.manager.set_strategy(&body.strategy).await?;
	Ok(Json(json!({ "status": "ok" })))
}
