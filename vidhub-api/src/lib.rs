//! # Vidhub API Server Library
//!
//! Account, session and channel endpoints for the Vidhub video platform.
//!
//! ## Modules
//!
//! - `app`: application state, router and JWT middleware
//! - `config`: configuration from the environment
//! - `cookies`: token cookies
//! - `error`: error handling and HTTP response mapping
//! - `response`: success envelope
//! - `routes`: route handlers
//! - `uploads`: multipart staging

pub mod app;
pub mod config;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod uploads;
