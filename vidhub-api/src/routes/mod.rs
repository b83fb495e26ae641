/// API route handlers
///
/// - `health`: health check endpoint
/// - `users`: registration, sessions, profile and channel endpoints

pub mod health;
pub mod users;
