use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles", post(handlers::create_article))
        .route("/api/articles/:id", get(handlers::get_article))
        .route("/api/articles/:id", put(handlers::update_article))
        .route("/api/articles/:id", delete(handlers::delete_article))
        .route(
            "/api/articles/:id/relevance",
            post(handlers::predict_relevance),
        )
        .route("/api/feeds", get(handlers::list_feeds))
        .route("/api/feeds", post(handlers::add_feed))
        .route("/api/feeds/:id", delete(handlers::delete_feed))
        .route("/api/profile", get(handlers::get_profile))
        .route("/api/profile", put(handlers::save_profile))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::AppState;
    pub use stash_core::{ArticleRecord, Error, Result};
}
