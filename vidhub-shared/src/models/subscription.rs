/// Subscription edges and the channel profile aggregate
///
/// A subscription is a directed edge `subscriber -> channel`. Rows are only
/// read here; the channel profile query counts edges in both directions for
/// one user and checks whether the viewer holds an edge to that user.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subscriptions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     subscriber UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     channel UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// One follows-relationship
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,

    /// User who subscribes
    pub subscriber: Uuid,

    /// User being subscribed to
    pub channel: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user seen as a channel, from the point of view of a viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,

    /// Number of users subscribed to this channel
    pub subscribers_count: i64,

    /// Number of channels this user subscribes to
    pub channels_subscribed_to_count: i64,

    /// Whether the viewer subscribes to this channel
    pub is_subscribed: bool,
}

impl Subscription {
    /// Loads the channel profile for `username` as seen by `viewer_id`
    ///
    /// Returns `None` when no user has that username.
    pub async fn channel_profile(
        pool: &PgPool,
        username: &str,
        viewer_id: Uuid,
    ) -> Result<Option<ChannelProfile>, sqlx::Error> {
        sqlx::query_as::<_, ChannelProfile>(
            r#"
            SELECT u.id, u.full_name, u.username, u.email, u.avatar, u.cover_image,
                   (SELECT COUNT(*) FROM subscriptions s WHERE s.channel = u.id)
                       AS subscribers_count,
                   (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber = u.id)
                       AS channels_subscribed_to_count,
                   EXISTS (
                       SELECT 1 FROM subscriptions s
                       WHERE s.channel = u.id AND s.subscriber = $2
                   ) AS is_subscribed
            FROM users u
            WHERE u.username = $1
            "#,
        )
        .bind(username)
        .bind(viewer_id)
        .fetch_optional(pool)
        .await
    }
}
