//! Route handlers, grouped by resource.

pub mod assistants;
pub mod auth;
pub mod chat;
pub mod files;
