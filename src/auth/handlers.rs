use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, is_valid_email, is_valid_username, verify_password},
    },
    error::ApiError,
    state::AppState,
    store::NewUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

fn token_pair(keys: &JwtKeys, user_id: uuid::Uuid) -> Result<(String, String), ApiError> {
    let access = keys.sign_access(user_id)?;
    let refresh = keys.sign_refresh(user_id)?;
    Ok((access, refresh))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(ApiError::Validation(
            "username must be 3-32 letters, digits, '-' or '_'".to_string(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("invalid email".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("password too short".to_string()));
    }

    let store = state.store.as_ref();
    if store.user_by_username(&payload.username).await?.is_some() {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::Conflict("username already taken".to_string()));
    }
    if store.user_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("email already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = store
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash,
        })
        .await?;

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = token_pair(&keys, user.id)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = payload.username.trim();

    let Some(user) = state.store.user_by_username(username).await? else {
        warn!(username = %username, "login unknown username");
        return Err(ApiError::Unauthenticated("invalid credentials".to_string()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthenticated("invalid credentials".to_string()));
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = token_pair(&keys, user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthenticated(e.to_string()))?;

    let user = state
        .store
        .user_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("user not found".to_string()))?;

    let (access_token, refresh_token) = token_pair(&keys, user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("user not found".to_string()))?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn register_ana(state: &AppState) -> AuthResponse {
        let Json(response) = register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "ana".to_string(),
                email: "Ana@Example.com".to_string(),
                password: "correct-horse".to_string(),
            }),
        )
        .await
        .unwrap();
        response
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let state = AppState::fake();
        let registered = register_ana(&state).await;
        // Email is normalized on the way in.
        assert_eq!(registered.user.email, "ana@example.com");
        assert_eq!(registered.user.kudos, 0);

        let Json(logged_in) = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "ana".to_string(),
                password: "correct-horse".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let err = login(
            State(state),
            Json(LoginRequest {
                username: "ana".to_string(),
                password: "wrong-password".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn register_rejects_taken_username_and_email() {
        let state = AppState::fake();
        register_ana(&state).await;

        let err = register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "ana".to_string(),
                email: "other@example.com".to_string(),
                password: "correct-horse".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err = register(
            State(state),
            Json(RegisterRequest {
                username: "ana2".to_string(),
                email: "ana@example.com".to_string(),
                password: "correct-horse".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn refresh_issues_a_new_pair() {
        let state = AppState::fake();
        let registered = register_ana(&state).await;

        let Json(refreshed) = refresh(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: registered.refresh_token,
            }),
        )
        .await
        .unwrap();
        assert_eq!(refreshed.user.id, registered.user.id);

        // An access token is not accepted as a refresh token.
        let err = refresh(
            State(state),
            Json(RefreshRequest {
                refresh_token: registered.access_token,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn me_returns_the_public_profile() {
        let state = AppState::fake();
        let registered = register_ana(&state).await;

        let Json(profile) = me(State(state), AuthUser(registered.user.id))
            .await
            .unwrap();
        assert_eq!(profile.username, "ana");
        assert!(profile.last_posted.is_none());
    }
}
