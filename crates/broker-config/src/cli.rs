// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Daemon command-line flags (§6 "Environment variables").
//!
//! The daemon itself is configured only by flags — no config file, no
//! environment variables besides the ones the CLI client reads to find it.

use std::net::SocketAddr;

use clap::Parser;

use crate::error::ConfigError;

/// Local account broker daemon.
#[derive(Parser, Debug, Clone)]
#[command(name = "account-broker", about = "Local credential broker daemon", version)]
pub struct DaemonArgs {
	/// Address the HTTP API binds to.
	#[arg(long, default_value = "127.0.0.1:4765")]
	pub listen: String,

	/// Base URL used when constructing OAuth redirect URIs, if the provider
	/// config does not pin one of its own.
	#[arg(long)]
	pub public_base_url: Option<String>,

	/// Command line used by `POST /v1/daemon/restart` when the caller does
	/// not supply one. Only meaningful when the daemon was started as a
	/// stable executable (see `restart_supported`).
	#[arg(long)]
	pub restart_cmd: Option<String>,
}

impl DaemonArgs {
	pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
		self
			.listen
			.parse()
			.map_err(|e: std::net::AddrParseError| ConfigError::InvalidListenAddr(self.listen.clone(), e.to_string()))
	}

	pub fn public_base_url(&self) -> String {
		self
			.public_base_url
			.clone()
			.unwrap_or_else(|| format!("http://{}", self.listen))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_default_listen_addr() {
		let args = DaemonArgs::parse_from(["account-broker"]);
		assert_eq!(args.socket_addr().unwrap().port(), 4765);
	}

	#[test]
	fn public_base_url_falls_back_to_listen_addr() {
		let args = DaemonArgs::parse_from(["account-broker", "--listen", "127.0.0.1:9000"]);
		assert_eq!(args.public_base_url(), "http://127.0.0.1:9000");
	}

	#[test]
	fn public_base_url_honors_override() {
		let args = DaemonArgs::parse_from([
			"account-broker",
			"--public-base-url",
			"https://broker.example",
		]);
		assert_eq!(args.public_base_url(), "https://broker.example");
	}

	#[test]
	fn rejects_invalid_listen_addr() {
		let args = DaemonArgs::parse_from(["account-broker", "--listen", "not-an-addr"]);
		assert!(args.socket_addr().is_err());
	}
}
