/// Database models for Vidhub
///
/// Each model owns its SQL; the [`crate::store`] seam decides whether those
/// queries or the in-memory store serve a request.
///
/// # Models
///
/// - `user`: accounts, credentials, profile fields, refresh token
/// - `subscription`: subscriber -> channel edges and the channel profile aggregate
/// - `video`: videos as referenced from a user's watch history
///
/// # Example
///
/// ```no_run
/// use vidhub_shared::models::user::{NewUser, User};
/// use vidhub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = NewUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     full_name: "Alice Liddell".to_string(),
///     password: "wonderland".to_string(),
///     avatar: "https://media.example.com/alice.png".to_string(),
///     cover_image: None,
/// };
///
/// let user = User::create(&pool, new_user.into_create()?).await?;
/// # Ok(())
/// # }
/// ```

pub mod subscription;
pub mod user;
pub mod video;
