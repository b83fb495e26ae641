//! # Vidhub Shared Library
//!
//! Domain types, persistence and integrations used by the Vidhub API server.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, JWT issuance and token extraction
//! - `db`: connection pool and migrations
//! - `media`: remote media host uploads
//! - `models`: users, subscriptions and videos with their SQL
//! - `store`: the persistence seam used by route handlers

pub mod auth;
pub mod db;
pub mod media;
pub mod models;
pub mod store;

/// Current version of the Vidhub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
