//! Ouf assistant gateway.
//!
//! Resolves public assistant slugs, authenticates callers with a wallet
//! signature challenge, threads conversations through the upstream AI
//! service, and gates knowledge-file mutation on the assistant's admin
//! wallet. All durable state lives in the upstream registry; the gateway
//! only holds request-scoped copies.

pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod directory;
pub mod error;
pub mod files;
pub mod gateway;
pub mod registry;
pub mod settings;
pub mod wallet;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{GatewayError, Result};
pub use gateway::{AssistantGateway, Session};
pub use wallet::WalletAddress;
