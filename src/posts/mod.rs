pub mod dto;
pub mod gate;
pub mod handlers;
pub mod kudos;
pub mod services;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
