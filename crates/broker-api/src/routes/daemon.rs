// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn info(State(state): State<AppState>) -> Json<Value> {
	Json(serde_json::to_value(state.controller.info()).expect("DaemonInfo always serializes"))
}

pub async fn shutdown(State(state): State<AppState>) -> Json<Value> {
	tracing::info!("shutdown requested via API");
	state.controller.shutdown();
	Json(json!({ "status": "shutting_down" }))
}

#[derive(Debug, Deserialize, Default)]
pub struct RestartBody {
	#[serde(default)]
	pub start_cmd: Option<String>,
}

pub async fn restart(State(state): State<AppState>, body: Option<Json<RestartBody>>) -> (StatusCode, Json<Value>) {
	let start_cmd = body.and_then(|Json(b)| b.start_cmd);
	match state.controller.restart(start_cmd) {
		Ok(()) => (StatusCode::OK, Json(json!({ "status": "restarting" }))),
		Err(message) => {
			tracing::warn!(%message, "restart request rejected");
			(StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
		}
	}
}
