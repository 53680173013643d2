// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::Json;
use broker_oauth::{known_tags, OAuthStatus};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn providers() -> Json<Value> {
	Json(json!({ "providers": known_tags() }))
}

#[derive(Debug, Deserialize)]
pub struct StartBody {
	pub provider: String,
}

pub async fn start(State(state): State<AppState>, Json(body): Json<StartBody>) -> Result<Json<Value>, ApiError> {
	let snapshot = state.oauth.start(&body.provider).await?;
	Ok(Json(serde_json::to_value(snapshot).expect("OAuthSessionSnapshot always serializes")))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
	pub state: String,
}

pub async fn status(State(state): State<AppState>, Query(q): Query<StatusQuery>) -> Result<Json<Value>, ApiError> {
	let snapshot = state.oauth.status(&q.state).await?;
	Ok(Json(serde_json::to_value(snapshot).expect("OAuthSessionSnapshot always serializes")))
}

/// Backs both `GET /v1/oauth/callback` and `GET /auth/callback` (§9: both
/// paths must be honored since the upstream redirect target is fixed).
pub async fn callback(State(state): State<AppState>, Query(query): Query<HashMap<String, String>>) -> Html<String> {
	let snapshot = match state.oauth.handle_callback(&query).await {
		Ok(snapshot) => snapshot,
		Err(err) => {
			tracing::warn!(error = %err, "oauth callback rejected");
			return Html(render_error_page(&err.to_string()));
		}
	};

	match snapshot.status {
		OAuthStatus::Success => {
			tracing::info!(account_id = snapshot.account_id.as_deref().unwrap_or(""), "oauth login succeeded");
			Html(render_success_page(snapshot.account_id.as_deref().unwrap_or("")))
		}
		_ => Html(render_error_page(snapshot.error.as_deref().unwrap_or("oauth login failed"))),
	}
}

fn render_success_page(account_id: &str) -> String {
	format!(
		"<!DOCTYPE html><html><head><title>Login successful</title></head><body><h1>Login successful</h1><p>Account <code>{account_id}</code> is ready. You may close this tab.</p></body></html>"
	)
}

fn render_error_page(message: &str) -> String {
	let escaped = message.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
	format!(
		"<!DOCTYPE html><html><head><title>Login failed</title></head><body><h1>Login failed</h1><p>{escaped}</p></body></html>"
	)
}
