// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared domain types for the account broker: accounts, the registry
//! document, quota snapshots, auth secrets, and the taxonomic error kinds
//! every other broker crate propagates.

pub mod account;
pub mod error;
pub mod quota;
pub mod registry;
pub mod secrets;

pub use account::{Account, AccountStatus, AddAccountInput, Provider};
pub use error::{BrokerError, BrokerResult};
pub use quota::{clamp_percent, QuotaSnapshot, QuotaWindow};
pub use registry::{AccountRegistry, RoutingStrategy};
pub use secrets::AuthSecrets;
