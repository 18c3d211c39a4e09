mod memory;
mod models;
mod postgres;

pub use memory::MemStore;
pub use models::{
    Comment, Image, Item, ItemStatus, Kudos, NewComment, NewImage, NewItem, NewPost, NewUser,
    Post, PostStatus, User,
};
pub use postgres::PgStore;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Persistence contract for the six entity kinds. Two interchangeable
/// backends implement it: [`PgStore`] for production and [`MemStore`] for
/// tests and database-less runs; the binary picks one at startup.
///
/// No policy lives behind this trait. Id-based reads report absence as
/// `Ok(None)`, creation assigns ids and timestamps at insertion, and deleting
/// a user or post cascades to everything it owns.
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, new: NewUser) -> anyhow::Result<User>;
    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn touch_last_posted(&self, user_id: Uuid, at: OffsetDateTime) -> anyhow::Result<()>;
    /// Moves the user's received-kudos total by `delta`, clamped at zero.
    async fn adjust_user_kudos(&self, user_id: Uuid, delta: i32) -> anyhow::Result<()>;
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;

    // Posts
    async fn create_post(&self, new: NewPost) -> anyhow::Result<Post>;
    async fn post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>>;
    async fn update_post_status(
        &self,
        id: Uuid,
        status: PostStatus,
    ) -> anyhow::Result<Option<Post>>;
    async fn all_posts(&self) -> anyhow::Result<Vec<Post>>;
    /// Newest first, truncated to `limit` before any caller-side filtering.
    async fn recent_posts(&self, limit: i64) -> anyhow::Result<Vec<Post>>;
    async fn posts_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Post>>;
    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool>;

    // Items
    async fn create_item(&self, new: NewItem) -> anyhow::Result<Item>;
    async fn update_item_status(
        &self,
        id: Uuid,
        status: ItemStatus,
    ) -> anyhow::Result<Option<Item>>;
    async fn items_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Item>>;

    // Images
    async fn create_image(&self, new: NewImage) -> anyhow::Result<Image>;
    /// Insertion order.
    async fn images_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Image>>;

    // Comments
    async fn create_comment(&self, new: NewComment) -> anyhow::Result<Comment>;
    async fn comments_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Comment>>;

    // Kudos
    /// Atomic insert-if-absent. Returns `None` when the (post, user) pair
    /// already holds a kudos, without touching anything.
    async fn insert_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Kudos>>;
    /// Returns whether a row was actually removed.
    async fn delete_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
    /// Live row count; the post side is never denormalized.
    async fn kudos_count_for_post(&self, post_id: Uuid) -> anyhow::Result<i64>;
    async fn has_user_given_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
}
