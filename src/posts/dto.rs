use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Comment, Image, Item, ItemStatus, Post, PostStatus, User};

/// The fully assembled read model of a post. Rebuilt from current state on
/// every read, never cached. `user_kudos` is specific to the requesting
/// viewer; anonymous viewers always get `false`.
#[derive(Debug, Serialize)]
pub struct PostWithDetails {
    #[serde(flatten)]
    pub post: Post,
    pub user: User,
    pub items: Vec<Item>,
    pub images: Vec<Image>,
    pub comments: Vec<Comment>,
    pub kudos_count: i64,
    pub user_kudos: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    /// Item names; each becomes an available item on the new post.
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemStatusUpdate {
    pub id: Uuid,
    pub status: ItemStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub items: Vec<ItemStatusUpdate>,
    #[serde(default)]
    pub new_image_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_radius() -> f64 {
    5.0
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// Comment echoed back with just enough of its author to render.
#[derive(Debug, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: CommentAuthor,
}

#[derive(Debug, Serialize)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}
