/// Persistence seam for accounts, subscriptions and watch history
///
/// Route handlers only see [`UserStore`]. Production uses [`PgStore`], which
/// delegates to the model queries; tests and local runs use
/// [`MemoryStore`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use vidhub_shared::db::pool::{create_pool, DatabaseConfig};
/// use vidhub_shared::store::{PgStore, UserStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store: Arc<dyn UserStore> = Arc::new(PgStore::new(pool));
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    subscription::ChannelProfile,
    user::{CreateUser, User},
    video::WatchedVideo,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique field already taken ("username" or "email")
    #[error("{0} already exists")]
    Duplicate(&'static str),

    /// Mutation targeted a user that does not exist
    #[error("User not found")]
    UserNotFound,

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Everything the API needs from persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; `Duplicate` when username or email is taken
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// First user whose username or email matches (normalized values)
    async fn find_user_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>>;

    /// Overwrites the stored refresh token; `UserNotFound` if the user is gone
    async fn set_refresh_token(&self, id: Uuid, refresh_token: &str) -> StoreResult<()>;

    /// Removes the stored refresh token; succeeds even if none was stored
    async fn clear_refresh_token(&self, id: Uuid) -> StoreResult<()>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

    /// Replaces full name and email; `Duplicate("email")` on a clash
    async fn update_account(&self, id: Uuid, full_name: &str, email: &str) -> StoreResult<User>;

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> StoreResult<User>;

    async fn update_cover_image(&self, id: Uuid, cover_image: &str) -> StoreResult<User>;

    /// Channel profile of `username` as seen by `viewer_id`
    async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Uuid,
    ) -> StoreResult<Option<ChannelProfile>>;

    /// Watched videos of `user_id` in list order
    async fn watch_history(&self, user_id: Uuid) -> StoreResult<Vec<WatchedVideo>>;

    /// Connectivity check
    async fn ping(&self) -> StoreResult<()>;
}
