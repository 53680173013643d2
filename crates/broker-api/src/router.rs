// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route table assembly (§6). CORS is wide open and methods/headers are
//! unrestricted — this daemon only ever binds to loopback for a single
//! local user, there is no cross-origin threat model to narrow against.

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/health", get(routes::health::health_check))
		.route("/v1/status", get(routes::health::status))
		.route("/v1/accounts", get(routes::accounts::list_accounts).post(routes::accounts::add_account))
		.route("/v1/accounts/{id}/activate", post(routes::accounts::activate_account))
		.route("/v1/accounts/{id}/quota", patch(routes::quota::update_quota))
		.route("/v1/accounts/import/codex/candidate", get(routes::accounts::import_candidate))
		.route("/v1/accounts/import/codex", post(routes::accounts::import_run))
		.route("/v1/strategy", patch(routes::health::set_strategy))
		.route("/v1/quota/sync", post(routes::quota::sync_one))
		.route("/v1/quota/sync-all", post(routes::quota::sync_all))
		.route("/v1/switch/on-error", post(routes::switch::on_error))
		.route("/v1/oauth/providers", get(routes::oauth::providers))
		.route("/v1/oauth/start", post(routes::oauth::start))
		.route("/v1/oauth/status", get(routes::oauth::status))
		.route("/v1/oauth/callback", get(routes::oauth::callback))
		.route("/auth/callback", get(routes::oauth::callback))
		.route("/v1/daemon/info", get(routes::daemon::info))
		.route("/v1/daemon/shutdown", post(routes::daemon::shutdown))
		.route("/v1/daemon/restart", post(routes::daemon::restart))
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
		.with_state(state)
}
