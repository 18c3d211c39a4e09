use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::{Kudos, Store};

/// Records one kudos for (post, user) and bumps the post author's running
/// total. A pair that already holds a kudos is rejected without touching
/// either counter; the store's insert-if-absent makes the check and the
/// write one atomic step.
pub async fn add_kudos(
    store: &dyn Store,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<Kudos, ApiError> {
    let post = store
        .post_by_id(post_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    let Some(kudos) = store.insert_kudos(post_id, user_id).await? else {
        return Err(ApiError::DuplicateKudos);
    };

    store.adjust_user_kudos(post.user_id, 1).await?;
    debug!(post_id = %post_id, user_id = %user_id, "kudos added");
    Ok(kudos)
}

/// Removes the kudos if present and decrements the author's total.
/// Idempotent: a second call finds nothing to delete and changes nothing.
pub async fn remove_kudos(
    store: &dyn Store,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let removed = store.delete_kudos(post_id, user_id).await?;
    if removed {
        if let Some(post) = store.post_by_id(post_id).await? {
            store.adjust_user_kudos(post.user_id, -1).await?;
        }
        debug!(post_id = %post_id, user_id = %user_id, "kudos removed");
    }
    Ok(())
}

/// The viewer's own kudos state, used for rendering and for nothing else —
/// duplicate enforcement lives in the store's conditional insert.
pub async fn has_user_given_kudos(
    store: &dyn Store,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<bool, ApiError> {
    Ok(store.has_user_given_kudos(post_id, user_id).await?)
}

/// Always a live row count. The per-user total is the only denormalized
/// number in the system.
pub async fn kudos_count_for_post(store: &dyn Store, post_id: Uuid) -> Result<i64, ApiError> {
    Ok(store.kudos_count_for_post(post_id).await?)
}
