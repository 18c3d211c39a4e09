use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::models::{
    Comment, Image, Item, ItemStatus, Kudos, NewComment, NewImage, NewItem, NewPost, NewUser,
    Post, PostStatus, User,
};
use super::Store;

/// Map-based backend. Child collections are keyed by the owning post id, so
/// cascades are a matter of dropping map entries. Every operation takes the
/// lock once; `insert_kudos` is atomic because the existence check and the
/// push happen under the same write guard.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    items: HashMap<Uuid, Vec<Item>>,
    images: HashMap<Uuid, Vec<Image>>,
    comments: HashMap<Uuid, Vec<Comment>>,
    kudos: HashMap<Uuid, Vec<Kudos>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> anyhow::Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| anyhow!("store lock poisoned"))
    }

    fn write(&self) -> anyhow::Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| anyhow!("store lock poisoned"))
    }

    /// Rewrites a post's creation time so tests can age it past the
    /// visibility delay.
    #[cfg(test)]
    pub fn backdate_post(&self, id: Uuid, created_at: OffsetDateTime) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if let Some(post) = inner.posts.get_mut(&id) {
            post.created_at = created_at;
            post.updated_at = created_at;
        }
    }
}

#[async_trait]
impl Store for MemStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
            last_posted: None,
            kudos: 0,
        };
        self.write()?.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn touch_last_posted(&self, user_id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        if let Some(user) = self.write()?.users.get_mut(&user_id) {
            user.last_posted = Some(at);
        }
        Ok(())
    }

    async fn adjust_user_kudos(&self, user_id: Uuid, delta: i32) -> anyhow::Result<()> {
        if let Some(user) = self.write()?.users.get_mut(&user_id) {
            user.kudos = (user.kudos + delta).max(0);
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.write()?;
        if inner.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<Uuid> = inner
            .posts
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in owned {
            inner.posts.remove(&post_id);
            inner.items.remove(&post_id);
            inner.images.remove(&post_id);
            inner.comments.remove(&post_id);
            inner.kudos.remove(&post_id);
        }
        for list in inner.comments.values_mut() {
            list.retain(|c| c.user_id != id);
        }
        for list in inner.kudos.values_mut() {
            list.retain(|k| k.user_id != id);
        }
        Ok(true)
    }

    async fn create_post(&self, new: NewPost) -> anyhow::Result<Post> {
        let now = OffsetDateTime::now_utc();
        let post = Post {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            location: new.location,
            latitude: new.latitude,
            longitude: new.longitude,
            description: new.description,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        self.write()?.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        Ok(self.read()?.posts.get(&id).cloned())
    }

    async fn update_post_status(
        &self,
        id: Uuid,
        status: PostStatus,
    ) -> anyhow::Result<Option<Post>> {
        let mut inner = self.write()?;
        Ok(inner.posts.get_mut(&id).map(|post| {
            post.status = status;
            post.updated_at = OffsetDateTime::now_utc();
            post.clone()
        }))
    }

    async fn all_posts(&self) -> anyhow::Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.read()?.posts.values().cloned().collect();
        posts.sort_by_key(|p| p.created_at);
        Ok(posts)
    }

    async fn recent_posts(&self, limit: i64) -> anyhow::Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.read()?.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }

    async fn posts_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .read()?
            .posts
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.write()?;
        if inner.posts.remove(&id).is_none() {
            return Ok(false);
        }
        inner.items.remove(&id);
        inner.images.remove(&id);
        inner.comments.remove(&id);
        inner.kudos.remove(&id);
        Ok(true)
    }

    async fn create_item(&self, new: NewItem) -> anyhow::Result<Item> {
        let item = Item {
            id: Uuid::new_v4(),
            post_id: new.post_id,
            name: new.name,
            status: new.status,
        };
        self.write()?
            .items
            .entry(new.post_id)
            .or_default()
            .push(item.clone());
        Ok(item)
    }

    async fn update_item_status(
        &self,
        id: Uuid,
        status: ItemStatus,
    ) -> anyhow::Result<Option<Item>> {
        let mut inner = self.write()?;
        for list in inner.items.values_mut() {
            if let Some(item) = list.iter_mut().find(|i| i.id == id) {
                item.status = status;
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }

    async fn items_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Item>> {
        Ok(self.read()?.items.get(&post_id).cloned().unwrap_or_default())
    }

    async fn create_image(&self, new: NewImage) -> anyhow::Result<Image> {
        let image = Image {
            id: Uuid::new_v4(),
            post_id: new.post_id,
            url: new.url,
            created_at: OffsetDateTime::now_utc(),
        };
        self.write()?
            .images
            .entry(new.post_id)
            .or_default()
            .push(image.clone());
        Ok(image)
    }

    async fn images_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Image>> {
        Ok(self
            .read()?
            .images
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_comment(&self, new: NewComment) -> anyhow::Result<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: new.post_id,
            user_id: new.user_id,
            content: new.content,
            created_at: OffsetDateTime::now_utc(),
        };
        self.write()?
            .comments
            .entry(new.post_id)
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    async fn comments_by_post(&self, post_id: Uuid) -> anyhow::Result<Vec<Comment>> {
        Ok(self
            .read()?
            .comments
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Kudos>> {
        let mut inner = self.write()?;
        let list = inner.kudos.entry(post_id).or_default();
        if list.iter().any(|k| k.user_id == user_id) {
            return Ok(None);
        }
        let kudos = Kudos {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            created_at: OffsetDateTime::now_utc(),
        };
        list.push(kudos.clone());
        Ok(Some(kudos))
    }

    async fn delete_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.write()?;
        let Some(list) = inner.kudos.get_mut(&post_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|k| k.user_id != user_id);
        Ok(list.len() < before)
    }

    async fn kudos_count_for_post(&self, post_id: Uuid) -> anyhow::Result<i64> {
        Ok(self
            .read()?
            .kudos
            .get(&post_id)
            .map(|l| l.len() as i64)
            .unwrap_or(0))
    }

    async fn has_user_given_kudos(&self, post_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .read()?
            .kudos
            .get(&post_id)
            .map(|l| l.iter().any(|k| k.user_id == user_id))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(n: &str) -> NewUser {
        NewUser {
            username: n.to_string(),
            email: format!("{n}@example.com"),
            password_hash: "hash".to_string(),
        }
    }

    fn new_post(user_id: Uuid) -> NewPost {
        NewPost {
            user_id,
            location: "Maple St curb".to_string(),
            latitude: "52.520008".to_string(),
            longitude: "13.404954".to_string(),
            description: None,
            status: PostStatus::Available,
        }
    }

    #[tokio::test]
    async fn create_user_assigns_identity_and_defaults() {
        let store = MemStore::new();
        let user = store.create_user(new_user("ana")).await.unwrap();
        assert_eq!(user.kudos, 0);
        assert!(user.last_posted.is_none());

        let fetched = store.user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "ana");
        assert!(store
            .user_by_username("nobody")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn deleting_a_post_cascades_to_children() {
        let store = MemStore::new();
        let user = store.create_user(new_user("ana")).await.unwrap();
        let post = store.create_post(new_post(user.id)).await.unwrap();
        store
            .create_item(NewItem {
                post_id: post.id,
                name: "chair".to_string(),
                status: ItemStatus::Available,
            })
            .await
            .unwrap();
        store
            .create_image(NewImage {
                post_id: post.id,
                url: "https://img.example/1.jpg".to_string(),
            })
            .await
            .unwrap();
        store
            .create_comment(NewComment {
                post_id: post.id,
                user_id: user.id,
                content: "still there?".to_string(),
            })
            .await
            .unwrap();
        store.insert_kudos(post.id, user.id).await.unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.post_by_id(post.id).await.unwrap().is_none());
        assert!(store.items_by_post(post.id).await.unwrap().is_empty());
        assert!(store.images_by_post(post.id).await.unwrap().is_empty());
        assert!(store.comments_by_post(post.id).await.unwrap().is_empty());
        assert_eq!(store.kudos_count_for_post(post.id).await.unwrap(), 0);
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_through_their_posts_and_facts() {
        let store = MemStore::new();
        let ana = store.create_user(new_user("ana")).await.unwrap();
        let ben = store.create_user(new_user("ben")).await.unwrap();
        let anas_post = store.create_post(new_post(ana.id)).await.unwrap();
        let bens_post = store.create_post(new_post(ben.id)).await.unwrap();
        // Ana also left traces on Ben's post.
        store
            .create_comment(NewComment {
                post_id: bens_post.id,
                user_id: ana.id,
                content: "nice find".to_string(),
            })
            .await
            .unwrap();
        store.insert_kudos(bens_post.id, ana.id).await.unwrap();

        assert!(store.delete_user(ana.id).await.unwrap());
        assert!(store.post_by_id(anas_post.id).await.unwrap().is_none());
        assert!(store.comments_by_post(bens_post.id).await.unwrap().is_empty());
        assert_eq!(store.kudos_count_for_post(bens_post.id).await.unwrap(), 0);
        assert!(store.post_by_id(bens_post.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn insert_kudos_is_insert_if_absent() {
        let store = MemStore::new();
        let ana = store.create_user(new_user("ana")).await.unwrap();
        let post = store.create_post(new_post(ana.id)).await.unwrap();

        assert!(store.insert_kudos(post.id, ana.id).await.unwrap().is_some());
        assert!(store.insert_kudos(post.id, ana.id).await.unwrap().is_none());
        assert_eq!(store.kudos_count_for_post(post.id).await.unwrap(), 1);
        assert!(store.has_user_given_kudos(post.id, ana.id).await.unwrap());
    }

    #[tokio::test]
    async fn kudos_counter_clamps_at_zero() {
        let store = MemStore::new();
        let ana = store.create_user(new_user("ana")).await.unwrap();
        store.adjust_user_kudos(ana.id, -3).await.unwrap();
        let ana = store.user_by_id(ana.id).await.unwrap().unwrap();
        assert_eq!(ana.kudos, 0);
    }

    #[tokio::test]
    async fn recent_posts_orders_newest_first_and_truncates() {
        let store = MemStore::new();
        let ana = store.create_user(new_user("ana")).await.unwrap();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(store.create_post(new_post(ana.id)).await.unwrap().id);
        }
        let now = OffsetDateTime::now_utc();
        store.backdate_post(ids[0], now - time::Duration::hours(3));
        store.backdate_post(ids[1], now - time::Duration::hours(2));
        store.backdate_post(ids[2], now - time::Duration::hours(1));

        let recent = store.recent_posts(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[2]);
        assert_eq!(recent[1].id, ids[1]);
    }
}
