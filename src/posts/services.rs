use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::posts::dto::{PostWithDetails, UpdatePostRequest};
use crate::posts::{gate, kudos};
use crate::store::{ItemStatus, NewImage, NewItem, NewPost, Post, Store, User};

/// Assembles the full read model for one post, or reports the aggregate
/// absent when the post or its owning user is gone. Never returns a partial
/// aggregate: a post without a resolvable owner does not exist as far as
/// callers are concerned.
pub async fn post_with_details(
    store: &dyn Store,
    post_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Option<PostWithDetails>, ApiError> {
    let Some(post) = store.post_by_id(post_id).await? else {
        return Ok(None);
    };
    let Some(user) = store.user_by_id(post.user_id).await? else {
        return Ok(None);
    };

    let items = store.items_by_post(post_id).await?;
    let images = store.images_by_post(post_id).await?;
    let comments = store.comments_by_post(post_id).await?;
    let kudos_count = kudos::kudos_count_for_post(store, post_id).await?;
    let user_kudos = match viewer {
        Some(viewer_id) => kudos::has_user_given_kudos(store, post_id, viewer_id).await?,
        None => false,
    };

    Ok(Some(PostWithDetails {
        post,
        user,
        items,
        images,
        comments,
        kudos_count,
        user_kudos,
    }))
}

/// Creates a post with its items and images, and bumps the author's
/// `last_posted` — posting is what unlocks the author's own immediate-view
/// privilege.
pub async fn create_post_aggregate(
    store: &dyn Store,
    author_id: Uuid,
    new_post: NewPost,
    item_names: Vec<String>,
    image_urls: Vec<String>,
) -> Result<PostWithDetails, ApiError> {
    let post = store.create_post(new_post).await?;
    store.touch_last_posted(author_id, post.created_at).await?;

    for name in item_names {
        store
            .create_item(NewItem {
                post_id: post.id,
                name,
                status: ItemStatus::Available,
            })
            .await?;
    }
    for url in image_urls {
        store
            .create_image(NewImage {
                post_id: post.id,
                url,
            })
            .await?;
    }

    info!(post_id = %post.id, user_id = %author_id, "post created");
    post_with_details(store, post.id, Some(author_id))
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("freshly created post vanished")))
}

/// Applies a status / item-status / append-images update. Status transitions
/// belong to the post's creator; anyone else is denied.
pub async fn update_post_aggregate(
    store: &dyn Store,
    post_id: Uuid,
    editor_id: Uuid,
    update: UpdatePostRequest,
) -> Result<PostWithDetails, ApiError> {
    let post = store
        .post_by_id(post_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    if post.user_id != editor_id {
        return Err(ApiError::AccessDenied(
            "only the author can update this post".to_string(),
        ));
    }

    if let Some(status) = update.status {
        store.update_post_status(post_id, status).await?;
    }
    for item in update.items {
        store.update_item_status(item.id, item.status).await?;
    }
    for url in update.new_image_urls {
        store
            .create_image(NewImage { post_id, url })
            .await?;
    }

    post_with_details(store, post_id, Some(editor_id))
        .await?
        .ok_or(ApiError::NotFound("post"))
}

/// Candidate posts near a coordinate. There is no real geospatial filter
/// yet: every post is a candidate and only the participation gate narrows
/// the listing. The coordinate and radius parameters are accepted so the
/// interface survives a future bounding query.
pub async fn nearby_posts(
    store: &dyn Store,
    _latitude: &str,
    _longitude: &str,
    _radius_km: f64,
    viewer: Option<Uuid>,
) -> Result<Vec<PostWithDetails>, ApiError> {
    let candidates = store.all_posts().await?;
    gated_aggregates(store, candidates, viewer).await
}

/// Newest posts. The limit is applied to the candidate rows before the gate
/// runs, so a caller asking for `limit` posts can receive fewer once the
/// gate filters the batch.
pub async fn recent_posts(
    store: &dyn Store,
    limit: i64,
    viewer: Option<Uuid>,
) -> Result<Vec<PostWithDetails>, ApiError> {
    let candidates = store.recent_posts(limit).await?;
    gated_aggregates(store, candidates, viewer).await
}

/// One user's authored posts, ungated — an author always sees their own
/// posts regardless of age or qualification. Viewed as "self", so each
/// aggregate's kudos flag reflects the owner.
pub async fn user_posts(
    store: &dyn Store,
    owner_id: Uuid,
) -> Result<Vec<PostWithDetails>, ApiError> {
    let posts = store.posts_by_user(owner_id).await?;
    let mut result = Vec::with_capacity(posts.len());
    for post in posts {
        if let Some(details) = post_with_details(store, post.id, Some(owner_id)).await? {
            result.push(details);
        }
    }
    Ok(result)
}

/// Gate check for a single post read. The viewer row is loaded here so the
/// pure predicate stays storage-free.
pub async fn viewer_may_see(
    store: &dyn Store,
    post: &Post,
    viewer: Option<Uuid>,
) -> Result<bool, ApiError> {
    let viewer_user = load_viewer(store, viewer).await?;
    Ok(gate::visible_now(
        post,
        viewer_user.as_ref(),
        OffsetDateTime::now_utc(),
    ))
}

async fn load_viewer(store: &dyn Store, viewer: Option<Uuid>) -> Result<Option<User>, ApiError> {
    Ok(match viewer {
        Some(id) => store.user_by_id(id).await?,
        None => None,
    })
}

/// Runs the gate over candidate rows and assembles aggregates only for the
/// survivors. The viewer's qualification is loaded once; the per-post part
/// of the predicate is just the age comparison.
async fn gated_aggregates(
    store: &dyn Store,
    candidates: Vec<Post>,
    viewer: Option<Uuid>,
) -> Result<Vec<PostWithDetails>, ApiError> {
    let viewer_user = load_viewer(store, viewer).await?;
    let now = OffsetDateTime::now_utc();

    let mut result = Vec::new();
    for post in candidates {
        if !gate::visible_now(&post, viewer_user.as_ref(), now) {
            continue;
        }
        if let Some(details) = post_with_details(store, post.id, viewer).await? {
            result.push(details);
        }
    }
    Ok(result)
}
