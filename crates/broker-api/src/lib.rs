// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Component I: the HTTP API surface and the Process Controller that backs
//! its daemon-lifecycle endpoints (§4.I, §6).

pub mod controller;
pub mod error;
pub mod routes;
pub mod router;
pub mod state;

pub use controller::{DaemonInfo, ProcessController, SHUTDOWN_DEADLINE};
pub use error::{account_not_found_as_400, ApiError};
pub use router::build_router;
pub use state::AppState;
