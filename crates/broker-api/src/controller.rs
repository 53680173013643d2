// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process Controller half of component I: `info`, `shutdown`, `restart`
//! (§4.I).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;

const SHUTDOWN_DELAY: Duration = Duration::from_millis(150);
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct DaemonInfo {
	pub pid: u32,
	pub addr: String,
	pub public_base_url: String,
	pub restart_supported: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default_restart_cmd: Option<String>,
}

pub struct ProcessController {
	addr: String,
	public_base_url: String,
	restart_cmd: Option<String>,
	restart_supported: bool,
	shutting_down: AtomicBool,
	shutdown_notify: Notify,
}

impl ProcessController {
	pub fn new(addr: String, public_base_url: String, restart_cmd: Option<String>, restart_supported: bool) -> Self {
		Self {
			addr,
			public_base_url,
			restart_cmd,
			restart_supported,
			shutting_down: AtomicBool::new(false),
			shutdown_notify: Notify::new(),
		}
	}

	pub fn info(&self) -> DaemonInfo {
		DaemonInfo {
			pid: std::process::id(),
			addr: self.addr.clone(),
			public_base_url: self.public_base_url.clone(),
			restart_supported: self.restart_supported,
			default_restart_cmd: self.restart_cmd.clone(),
		}
	}

	/// Flips the shutting-down flag (idempotent) and schedules the actual
	/// stop signal after `SHUTDOWN_DELAY` so the HTTP response for this
	/// call has a chance to flush.
	pub fn shutdown(self: &std::sync::Arc<Self>) {
		if self.shutting_down.swap(true, Ordering::SeqCst) {
			return;
		}
		let this = std::sync::Arc::clone(self);
		tokio::spawn(async move {
			tokio::time::sleep(SHUTDOWN_DELAY).await;
			this.shutdown_notify.notify_waiters();
		});
	}

	/// Resolves when `shutdown` has fired. Callers race this against their
	/// own server-drain future.
	pub async fn wait_for_shutdown(&self) {
		self.shutdown_notify.notified().await;
	}

	pub fn is_shutting_down(&self) -> bool {
		self.shutting_down.load(Ordering::SeqCst)
	}

	/// Spawns a replacement process then triggers shutdown. Only
	/// meaningful when the daemon was started as a stable executable.
	pub fn restart(self: &std::sync::Arc<Self>, start_cmd: Option<String>) -> Result<(), String> {
		if !self.restart_supported {
			return Err("restart is not supported from this build".into());
		}
		let cmd_line = start_cmd.or_else(|| self.restart_cmd.clone()).ok_or_else(|| "no restart command configured".to_string())?;

		let mut parts = cmd_line.split_whitespace();
		let program = parts.next().ok_or_else(|| "empty restart command".to_string())?;
		let args: Vec<&str> = parts.collect();

		std::process::Command::new(program)
			.args(args)
			.spawn()
			.map_err(|e| format!("failed to spawn replacement process: {e}"))?;

		self.shutdown();
		Ok(())
	}
}
