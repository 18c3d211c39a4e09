use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::{AuthUser, MaybeAuthUser},
    error::ApiError,
    state::AppState,
    store::{Kudos, NewComment, NewPost},
};

use super::dto::{
    CommentAuthor, CommentRequest, CommentWithAuthor, CreatePostRequest, NearbyQuery,
    PostWithDetails, RecentQuery, StatusMessage, UpdatePostRequest,
};
use super::{kudos, services};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/nearby", get(nearby_posts))
        .route("/posts/recent", get(recent_posts))
        .route("/posts/user/:user_id", get(user_posts))
        .route("/posts/:id", get(get_post).patch(update_post))
        .route("/posts/:id/comments", post(create_comment))
        .route("/posts/:id/kudos", post(give_kudos).delete(revoke_kudos))
}

const GATE_DENIED_MESSAGE: &str =
    "You need to participate by posting to view recent finds immediately";

fn validated_coordinate(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.parse::<f64>().is_err() {
        return Err(ApiError::Validation(format!(
            "{field} must be a decimal number"
        )));
    }
    Ok(trimmed.to_string())
}

#[instrument(skip(state, body))]
async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostWithDetails>), ApiError> {
    let location = body.location.trim().to_string();
    if location.is_empty() {
        return Err(ApiError::Validation("location is required".to_string()));
    }
    let latitude = validated_coordinate(&body.latitude, "latitude")?;
    let longitude = validated_coordinate(&body.longitude, "longitude")?;

    let items: Vec<String> = body
        .items
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();
    if items.iter().any(|name| name.is_empty()) {
        return Err(ApiError::Validation("item names must not be empty".to_string()));
    }

    let details = services::create_post_aggregate(
        state.store.as_ref(),
        user_id,
        NewPost {
            user_id,
            location,
            latitude,
            longitude,
            description: body.description,
            status: body.status.unwrap_or_default(),
        },
        items,
        body.image_urls,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(details)))
}

#[instrument(skip(state))]
async fn nearby_posts(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<PostWithDetails>>, ApiError> {
    let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) else {
        return Err(ApiError::Validation(
            "latitude and longitude are required".to_string(),
        ));
    };

    let posts = services::nearby_posts(
        state.store.as_ref(),
        &latitude,
        &longitude,
        query.radius,
        viewer,
    )
    .await?;
    Ok(Json(posts))
}

#[instrument(skip(state))]
async fn recent_posts(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<PostWithDetails>>, ApiError> {
    if !(1..=100).contains(&query.limit) {
        return Err(ApiError::Validation(
            "limit must be between 1 and 100".to_string(),
        ));
    }
    let posts = services::recent_posts(state.store.as_ref(), query.limit, viewer).await?;
    Ok(Json(posts))
}

#[instrument(skip(state))]
async fn user_posts(
    State(state): State<AppState>,
    AuthUser(_viewer): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<PostWithDetails>>, ApiError> {
    let posts = services::user_posts(state.store.as_ref(), user_id).await?;
    Ok(Json(posts))
}

#[instrument(skip(state))]
async fn get_post(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PostWithDetails>, ApiError> {
    let details = services::post_with_details(state.store.as_ref(), id, viewer)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if !services::viewer_may_see(state.store.as_ref(), &details.post, viewer).await? {
        return Err(ApiError::AccessDenied(GATE_DENIED_MESSAGE.to_string()));
    }

    Ok(Json(details))
}

#[instrument(skip(state, body))]
async fn update_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostWithDetails>, ApiError> {
    let details =
        services::update_post_aggregate(state.store.as_ref(), id, user_id, body).await?;
    Ok(Json(details))
}

#[instrument(skip(state, body))]
async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentWithAuthor>), ApiError> {
    let content = body.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("content is required".to_string()));
    }

    let store = state.store.as_ref();
    if store.post_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound("post"));
    }
    let user = store
        .user_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let comment = store
        .create_comment(NewComment {
            post_id: id,
            user_id,
            content,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentWithAuthor {
            comment,
            user: CommentAuthor {
                id: user.id,
                username: user.username,
            },
        }),
    ))
}

#[instrument(skip(state))]
async fn give_kudos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Kudos>), ApiError> {
    let kudos = kudos::add_kudos(state.store.as_ref(), id, user_id).await?;
    Ok((StatusCode::CREATED, Json(kudos)))
}

#[instrument(skip(state))]
async fn revoke_kudos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusMessage>, ApiError> {
    kudos::remove_kudos(state.store.as_ref(), id, user_id).await?;
    Ok(Json(StatusMessage {
        message: "kudos removed".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemStore, NewUser, PostStatus, Store, User};
    use std::sync::Arc;
    use time::{Duration, OffsetDateTime};

    fn state_with_mem() -> (AppState, Arc<MemStore>) {
        let mem = Arc::new(MemStore::new());
        let state = AppState::from_parts(mem.clone(), crate::config::AppConfig::for_tests());
        (state, mem)
    }

    async fn make_user(store: &dyn Store, name: &str) -> User {
        store
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
    }

    fn create_body() -> CreatePostRequest {
        CreatePostRequest {
            location: "Maple St curb".to_string(),
            latitude: "52.520008".to_string(),
            longitude: "13.404954".to_string(),
            description: Some("two chairs, one lamp".to_string()),
            status: None,
            items: vec!["chair".to_string(), "lamp".to_string()],
            image_urls: vec![],
        }
    }

    #[tokio::test]
    async fn fresh_post_is_forbidden_until_the_delay_elapses() {
        let (state, mem) = state_with_mem();
        let ana = make_user(state.store.as_ref(), "ana").await;
        let ben = make_user(state.store.as_ref(), "ben").await;

        let (status, Json(details)) = create_post(
            State(state.clone()),
            AuthUser(ana.id),
            Json(create_body()),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let post_id = details.post.id;

        // Ben has never posted, so the young post is gated.
        let err = get_post(State(state.clone()), MaybeAuthUser(Some(ben.id)), Path(post_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied(_)));

        // Anonymous viewers are gated the same way.
        let err = get_post(State(state.clone()), MaybeAuthUser(None), Path(post_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied(_)));

        // The author qualified by posting and sees it immediately.
        get_post(State(state.clone()), MaybeAuthUser(Some(ana.id)), Path(post_id))
            .await
            .unwrap();

        // Once the post ages past the delay everyone sees it.
        mem.backdate_post(post_id, OffsetDateTime::now_utc() - Duration::hours(25));
        let Json(details) = get_post(State(state), MaybeAuthUser(Some(ben.id)), Path(post_id))
            .await
            .unwrap();
        assert_eq!(details.post.id, post_id);
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let (state, _mem) = state_with_mem();
        let err = get_post(State(state), MaybeAuthUser(None), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_post_rejects_malformed_coordinates() {
        let (state, _mem) = state_with_mem();
        let ana = make_user(state.store.as_ref(), "ana").await;
        let mut body = create_body();
        body.latitude = "north of the bakery".to_string();

        let err = create_post(State(state), AuthUser(ana.id), Json(body))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn nearby_requires_coordinates() {
        let (state, _mem) = state_with_mem();
        let err = nearby_posts(
            State(state),
            MaybeAuthUser(None),
            Query(NearbyQuery {
                latitude: None,
                longitude: Some("13.404954".to_string()),
                radius: 5.0,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn kudos_round_trip_through_handlers() {
        let (state, _mem) = state_with_mem();
        let ana = make_user(state.store.as_ref(), "ana").await;
        let ben = make_user(state.store.as_ref(), "ben").await;
        let (_, Json(details)) =
            create_post(State(state.clone()), AuthUser(ana.id), Json(create_body()))
                .await
                .unwrap();
        let post_id = details.post.id;

        let (status, _) = give_kudos(State(state.clone()), AuthUser(ben.id), Path(post_id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let err = give_kudos(State(state.clone()), AuthUser(ben.id), Path(post_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateKudos));

        revoke_kudos(State(state.clone()), AuthUser(ben.id), Path(post_id))
            .await
            .unwrap();
        // Idempotent: revoking again succeeds quietly.
        revoke_kudos(State(state.clone()), AuthUser(ben.id), Path(post_id))
            .await
            .unwrap();

        let ana = state.store.user_by_id(ana.id).await.unwrap().unwrap();
        assert_eq!(ana.kudos, 0);
    }

    #[tokio::test]
    async fn comments_echo_their_author() {
        let (state, _mem) = state_with_mem();
        let ana = make_user(state.store.as_ref(), "ana").await;
        let (_, Json(details)) =
            create_post(State(state.clone()), AuthUser(ana.id), Json(create_body()))
                .await
                .unwrap();

        let (status, Json(reply)) = create_comment(
            State(state.clone()),
            AuthUser(ana.id),
            Path(details.post.id),
            Json(CommentRequest {
                content: "is the lamp still there?".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reply.user.username, "ana");

        let err = create_comment(
            State(state),
            AuthUser(ana.id),
            Path(details.post.id),
            Json(CommentRequest {
                content: "   ".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn created_post_defaults_to_available_status() {
        let (state, _mem) = state_with_mem();
        let ana = make_user(state.store.as_ref(), "ana").await;
        let (_, Json(details)) =
            create_post(State(state.clone()), AuthUser(ana.id), Json(create_body()))
                .await
                .unwrap();
        assert_eq!(details.post.status, PostStatus::Available);
    }
}
