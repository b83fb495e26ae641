/// Videos and the watch history lookup
///
/// Videos are owned by another part of the platform; this crate only reads
/// them to resolve a user's watch history.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE videos (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     video_file VARCHAR(1024) NOT NULL,
///     thumbnail VARCHAR(1024) NOT NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     duration DOUBLE PRECISION NOT NULL,
///     views BIGINT NOT NULL DEFAULT 0,
///     is_published BOOLEAN NOT NULL DEFAULT TRUE,
///     owner UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Stored video
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,

    /// Length in seconds
    pub duration: f64,

    pub views: i64,
    pub is_published: bool,

    /// Uploading user
    pub owner: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reduced uploader profile attached to watch history entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

/// A watched video with its uploader in place of the owner id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,

    /// `None` when the uploader no longer exists
    pub owner: Option<VideoOwner>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchedVideo {
    /// Combines a video with its (optional) uploader
    pub fn new(video: Video, owner: Option<VideoOwner>) -> Self {
        Self {
            id: video.id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            owner,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WatchedVideoRow {
    #[sqlx(flatten)]
    video: Video,
    owner_full_name: Option<String>,
    owner_username: Option<String>,
    owner_avatar: Option<String>,
}

impl From<WatchedVideoRow> for WatchedVideo {
    fn from(row: WatchedVideoRow) -> Self {
        let owner = match (row.owner_full_name, row.owner_username, row.owner_avatar) {
            (Some(full_name), Some(username), Some(avatar)) => Some(VideoOwner {
                full_name,
                username,
                avatar,
            }),
            _ => None,
        };

        WatchedVideo::new(row.video, owner)
    }
}

impl Video {
    /// Resolves a user's watch history into full videos, in list order
    ///
    /// IDs that no longer resolve to a video are skipped.
    pub async fn watch_history(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<WatchedVideo>, sqlx::Error> {
        let rows = sqlx::query_as::<_, WatchedVideoRow>(
            r#"
            SELECT v.id, v.video_file, v.thumbnail, v.title, v.description, v.duration,
                   v.views, v.is_published, v.owner, v.created_at, v.updated_at,
                   o.full_name AS owner_full_name,
                   o.username AS owner_username,
                   o.avatar AS owner_avatar
            FROM users u
            CROSS JOIN LATERAL unnest(u.watch_history) WITH ORDINALITY AS h(video_id, ord)
            JOIN videos v ON v.id = h.video_id
            LEFT JOIN users o ON o.id = v.owner
            WHERE u.id = $1
            ORDER BY h.ord
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(WatchedVideo::from).collect())
    }
}
