use axum::Router;
use axum::routing::post;
use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod repository;

pub fn router() -> Router<AppState> {
    Router::new().route("/transcode", post(handler::transcode))
}
