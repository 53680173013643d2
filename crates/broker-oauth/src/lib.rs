// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! PKCE-based OAuth authorization-code flow (component G) and token
//! refresh against a provider's token endpoint (component D).

pub mod id_token;
pub mod pkce;
pub mod provider;
pub mod session;
pub mod token_exchange;

pub use id_token::parse_id_token;
pub use pkce::{challenge_for, generate_state, Pkce};
pub use provider::{known_tags, lookup, ProviderConfig};
pub use session::{AccountRegistrar, OAuthEngine, OAuthSessionSnapshot, OAuthStatus};
pub use token_exchange::{exchange_code, refresh, ExchangedTokens};
