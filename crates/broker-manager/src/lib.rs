// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Component F (central coordinator) and component H (local-credential
//! importer): the only place a mutation to the registry or secrets
//! happens.

pub mod importer;
pub mod manager;
pub mod switch;

pub use importer::{ImportAction, ImportCandidate, ImportDiscovery, ImportResult};
pub use manager::{AccountSyncResult, Manager, SyncAllResult};
pub use switch::{is_switchable, order_candidates, SwitchResult};
