// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Account broker daemon binary: wires the Manager, OAuth engine, and HTTP
//! API surface together and runs the quota auto-refresh background task
//! (§9 "Runtime-driven flows").

use std::sync::Arc;

use broker_api::{build_router, AppState, ProcessController, SHUTDOWN_DEADLINE};
use broker_applier::CodexApplier;
use broker_config::DaemonArgs;
use broker_manager::Manager;
use broker_oauth::OAuthEngine;
use broker_store::{FileSecretStore, FileStateStore, IdentityProtector};
use clap::Parser;

mod quota_refresh;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = DaemonArgs::parse();

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
		.init();

	let paths = broker_config::resolve_xdg_paths()?;
	let codex_credentials_file = broker_config::codex_credentials_file()?;

	tracing::info!(
		registry_file = %paths.registry_file.display(),
		secrets_dir = %paths.secrets_dir.display(),
		codex_credentials_file = %codex_credentials_file.display(),
		"starting account broker"
	);

	let state_store = Arc::new(FileStateStore::new(paths.registry_file.clone()));
	let secret_store = Arc::new(FileSecretStore::new(paths.secrets_dir.clone(), Arc::new(IdentityProtector)));
	let applier = Arc::new(CodexApplier::new(codex_credentials_file.clone()));

	let manager = Arc::new(Manager::new(state_store, secret_store, applier));
	let oauth = Arc::new(OAuthEngine::new(manager.clone()));

	let addr = args.socket_addr()?;
	let restart_supported = args.restart_cmd.is_some();
	let controller = Arc::new(ProcessController::new(addr.to_string(), args.public_base_url(), args.restart_cmd.clone(), restart_supported));

	let refresh_handle = tokio::spawn(quota_refresh::run(manager.clone(), controller.clone()));

	let app_state = AppState { manager, oauth, controller: controller.clone(), codex_credentials_file };
	let app = build_router(app_state);

	let listener = tokio::net::TcpListener::bind(addr).await?;
	tracing::info!(%addr, "listening");

	let graceful_signal_controller = controller.clone();
	let serve_task = tokio::spawn(async move {
		axum::serve(listener, app)
			.with_graceful_shutdown(async move { graceful_signal_controller.wait_for_shutdown().await })
			.await
	});

	tokio::select! {
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received interrupt signal");
			controller.shutdown();
		}
		_ = controller.wait_for_shutdown() => {
			tracing::info!("shutdown requested via API");
		}
	}

	match tokio::time::timeout(SHUTDOWN_DEADLINE, serve_task).await {
		Ok(Ok(Ok(()))) => {}
		Ok(Ok(Err(err))) => tracing::error!(error = %err, "server error"),
		Ok(Err(join_err)) => tracing::error!(error = %join_err, "server task panicked"),
		Err(_) => tracing::warn!("shutdown drain deadline exceeded, forcing exit"),
	}

	refresh_handle.abort();
	tracing::info!("account broker shutdown complete");
	Ok(())
}
