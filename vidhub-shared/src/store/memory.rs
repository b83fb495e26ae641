/// In-process [`UserStore`]
///
/// Keeps the same semantics as [`PgStore`](super::PgStore): unique username
/// and email, idempotent logout, watch history in list order. Subscriptions
/// and videos have no write path in the API, so seeding helpers are provided
/// for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult, UserStore};
use crate::models::{
    subscription::{ChannelProfile, Subscription},
    user::{CreateUser, User},
    video::{Video, VideoOwner, WatchedVideo},
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    subscriptions: Vec<Subscription>,
    videos: HashMap<Uuid, Video>,
}

impl Inner {
    fn user_mut(&mut self, id: Uuid) -> StoreResult<&mut User> {
        self.users.get_mut(&id).ok_or(StoreError::UserNotFound)
    }
}

/// Store holding everything in memory behind an async `RwLock`
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `subscriber` follows `channel`
    pub async fn insert_subscription(&self, subscriber: Uuid, channel: Uuid) -> Subscription {
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            subscriber,
            channel,
            created_at: now,
            updated_at: now,
        };

        self.inner.write().await.subscriptions.push(subscription.clone());
        subscription
    }

    /// Adds a video to the catalogue
    pub async fn insert_video(&self, video: Video) {
        self.inner.write().await.videos.insert(video.id, video);
    }

    /// Appends a video to a user's watch history
    pub async fn push_watch_history(&self, user_id: Uuid, video_id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_mut(user_id)?.watch_history.push(video_id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.username == data.username) {
            return Err(StoreError::Duplicate("username"));
        }
        if inner.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Duplicate("email"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            full_name: data.full_name,
            avatar: data.avatar,
            cover_image: data.cover_image,
            watch_history: Vec::new(),
            password_hash: data.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;

        let found = inner
            .users
            .values()
            .filter(|u| {
                username.is_some_and(|name| u.username == name)
                    || email.is_some_and(|mail| u.email == mail)
            })
            .min_by_key(|u| u.created_at)
            .cloned();

        Ok(found)
    }

    async fn set_refresh_token(&self, id: Uuid, refresh_token: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_mut(id)?.refresh_token = Some(refresh_token.to_string());
        Ok(())
    }

    async fn clear_refresh_token(&self, id: Uuid) -> StoreResult<()> {
        if let Some(user) = self.inner.write().await.users.get_mut(&id) {
            user.refresh_token = None;
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_account(&self, id: Uuid, full_name: &str, email: &str) -> StoreResult<User> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.id != id && u.email == email) {
            return Err(StoreError::Duplicate("email"));
        }

        let user = inner.user_mut(id)?;
        user.full_name = full_name.to_string();
        user.email = email.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.avatar = avatar.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_cover_image(&self, id: Uuid, cover_image: &str) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let user = inner.user_mut(id)?;
        user.cover_image = Some(cover_image.to_string());
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Uuid,
    ) -> StoreResult<Option<ChannelProfile>> {
        let inner = self.inner.read().await;

        let Some(channel) = inner.users.values().find(|u| u.username == username) else {
            return Ok(None);
        };

        let subscribers = inner
            .subscriptions
            .iter()
            .filter(|s| s.channel == channel.id);

        Ok(Some(ChannelProfile {
            id: channel.id,
            full_name: channel.full_name.clone(),
            username: channel.username.clone(),
            email: channel.email.clone(),
            avatar: channel.avatar.clone(),
            cover_image: channel.cover_image.clone(),
            subscribers_count: subscribers.clone().count() as i64,
            channels_subscribed_to_count: inner
                .subscriptions
                .iter()
                .filter(|s| s.subscriber == channel.id)
                .count() as i64,
            is_subscribed: subscribers.clone().any(|s| s.subscriber == viewer_id),
        }))
    }

    async fn watch_history(&self, user_id: Uuid) -> StoreResult<Vec<WatchedVideo>> {
        let inner = self.inner.read().await;

        let Some(user) = inner.users.get(&user_id) else {
            return Ok(Vec::new());
        };

        let history = user
            .watch_history
            .iter()
            .filter_map(|video_id| inner.videos.get(video_id))
            .map(|video| {
                let owner = inner.users.get(&video.owner).map(|owner| VideoOwner {
                    full_name: owner.full_name.clone(),
                    username: owner.username.clone(),
                    avatar: owner.avatar.clone(),
                });
                WatchedVideo::new(video.clone(), owner)
            })
            .collect();

        Ok(history)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
