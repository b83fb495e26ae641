/// PostgreSQL-backed [`UserStore`]

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{StoreError, StoreResult, UserStore};
use crate::db::pool::health_check;
use crate::models::{
    subscription::{ChannelProfile, Subscription},
    user::{CreateUser, User},
    video::{Video, WatchedVideo},
};

/// Store over a sqlx connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique-constraint violations on `users` to `Duplicate`
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(constraint) = db_err.constraint() {
            if constraint.contains("username") {
                return StoreError::Duplicate("username");
            }
            if constraint.contains("email") {
                return StoreError::Duplicate("email");
            }
        }
    }

    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        Ok(User::find_by_username_or_email(&self.pool, username, email).await?)
    }

    async fn set_refresh_token(&self, id: Uuid, refresh_token: &str) -> StoreResult<()> {
        if User::set_refresh_token(&self.pool, id, refresh_token).await? {
            Ok(())
        } else {
            Err(StoreError::UserNotFound)
        }
    }

    async fn clear_refresh_token(&self, id: Uuid) -> StoreResult<()> {
        let cleared = User::clear_refresh_token(&self.pool, id).await?;
        debug!(user_id = %id, cleared, "Cleared refresh token");
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        if User::update_password(&self.pool, id, password_hash).await? {
            Ok(())
        } else {
            Err(StoreError::UserNotFound)
        }
    }

    async fn update_account(&self, id: Uuid, full_name: &str, email: &str) -> StoreResult<User> {
        User::update_account(&self.pool, id, full_name, email)
            .await
            .map_err(map_unique_violation)?
            .ok_or(StoreError::UserNotFound)
    }

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> StoreResult<User> {
        User::update_avatar(&self.pool, id, avatar)
            .await?
            .ok_or(StoreError::UserNotFound)
    }

    async fn update_cover_image(&self, id: Uuid, cover_image: &str) -> StoreResult<User> {
        User::update_cover_image(&self.pool, id, cover_image)
            .await?
            .ok_or(StoreError::UserNotFound)
    }

    async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Uuid,
    ) -> StoreResult<Option<ChannelProfile>> {
        Ok(Subscription::channel_profile(&self.pool, username, viewer_id).await?)
    }

    async fn watch_history(&self, user_id: Uuid) -> StoreResult<Vec<WatchedVideo>> {
        Ok(Video::watch_history(&self.pool, user_id).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
