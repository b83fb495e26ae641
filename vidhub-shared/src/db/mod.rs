/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Queries live next to their types in [`crate::models`].

pub mod migrations;
pub mod pool;
