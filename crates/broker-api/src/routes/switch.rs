// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;
use broker_manager::SwitchResult;

#[derive(Debug, Deserialize)]
pub struct OnErrorBody {
	pub status_code: u16,
	#[serde(default)]
	pub message: String,
}

pub async fn on_error(State(state): State<AppState>, Json(body): Json<OnErrorBody>) -> Result<Json<SwitchResult>, ApiError> {
	let result = state.manager.handle_quota_error(body.status_code, &body.message).await?;
	Ok(Json(result))
}
