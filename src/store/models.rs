use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account row. `last_posted` drives the participation window; `kudos` is the
/// running total of kudos received across all of this user's posts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub last_posted: Option<OffsetDateTime>,
    pub kudos: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "post_status", rename_all = "lowercase")]
pub enum PostStatus {
    Available,
    Partial,
    Taken,
}

impl Default for PostStatus {
    fn default() -> Self {
        Self::Available
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "item_status", rename_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Taken,
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self::Available
    }
}

/// A find. Coordinates are kept as decimal text so storage never rounds them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub description: Option<String>,
    pub status: PostStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A single thing inside a find. Item status and post status are set
/// independently; marking one item taken does not touch the post.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub post_id: Uuid,
    pub name: String,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: Uuid,
    pub post_id: Uuid,
    pub url: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
}

/// Endorsement fact. At most one row per (post_id, user_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Kudos {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub description: Option<String>,
    pub status: PostStatus,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub post_id: Uuid,
    pub name: String,
    pub status: ItemStatus,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub post_id: Uuid,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}
