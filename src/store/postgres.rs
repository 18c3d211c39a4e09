use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::models::{
    Comment, Image, Item, ItemStatus, Kudos, NewComment, NewImage, NewItem, NewPost, NewUser,
    Post, PostStatus, User,
};
use super::Store;

/// Durable backend. Cascade deletes are delegated to the foreign keys set up
/// in the migrations; kudos uniqueness is the `(post_id, user_id)` unique
/// index, so the insert is a single conditional round trip.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at, last_posted, kudos
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, last_posted, kudos
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, last_posted, kudos
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, last_posted, kudos
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn touch_last_posted(&self, user_id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET last_posted = $2 WHERE id = $1"#)
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn adjust_user_kudos(&self, user_id: Uuid, delta: i32) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET kudos = GREATEST(kudos + $2, 0) WHERE id = $1"#)
            .bind(user_id)
            .bind(delta)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_post(&self, new: NewPost) -> anyhow::Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, user_id, location, latitude, longitude, description, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, location, latitude, longitude, description, status,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.location)
        .bind(&new.latitude)
        .bind(&new.longitude)
        .bind(&new.description)
        .bind(new.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, location, latitude, longitude, description, status,
                   created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn update_post_status(
        &self,
        id: Uuid,
        status: PostStatus,
    ) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, location, latitude, longitude, description, status,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn all_posts(&self) -> anyhow::Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, location, latitude, longitude, description, status,
                   created_at, updated_at
            FROM posts
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn recent_posts(&self, limit: i64) -> anyhow::Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, location, latitude, longitude, description, status,
                   created_at, updated_at
            FROM posts
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn posts_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, location, latitude, longitude, description, status,
                   created_at, updated_at
            FROM posts
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM posts WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_item(&self, new: NewItem) -> anyhow::Result<Item> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (id, post_id, name, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, name, status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.post_id)
        .bind(&new.name)
        .bind(new.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn update_item_status(
        &self,
        id: Uuid,
        status: ItemStatus,
    ) -> anyhow::Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET status = $2
            WHERE id = $1
            RETURNING id, post_id, name, status
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn items_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, post_id, name, status
            FROM items
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn create_image(&self, new: NewImage) -> anyhow::Result<Image> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (id, post_id, url)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.post_id)
        .bind(&new.url)
        .fetch_one(&self.pool)
        .await?;
        Ok(image)
    }

    async fn images_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Image>> {
        let images = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, post_id, url, created_at
            FROM images
            WHERE post_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    async fn create_comment(&self, new: NewComment) -> anyhow::Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, post_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, user_id, content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.post_id)
        .bind(new.user_id)
        .bind(&new.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn comments_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, user_id, content, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn insert_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Kudos>> {
        // ON CONFLICT DO NOTHING + RETURNING yields no row for a duplicate
        // pair, so the uniqueness check and the insert are one statement.
        let kudos = sqlx::query_as::<_, Kudos>(
            r#"
            INSERT INTO kudos (id, post_id, user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id, user_id) DO NOTHING
            RETURNING id, post_id, user_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(kudos)
    }

    async fn delete_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM kudos WHERE post_id = $1 AND user_id = $2"#)
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn kudos_count_for_post(&self, post_id: Uuid) -> anyhow::Result<i64> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM kudos WHERE post_id = $1"#)
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn has_user_given_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM kudos WHERE post_id = $1 AND user_id = $2)"#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
