// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Durable state for the account broker: the registry document (component
//! A) and per-account secret blobs (component B).

pub mod protect;
pub mod registry_store;
pub mod secret_store;

pub use protect::{FailingProtector, IdentityProtector, SecretProtector};
pub use registry_store::{FileStateStore, StateStore};
pub use secret_store::{FileSecretStore, SecretStore};
