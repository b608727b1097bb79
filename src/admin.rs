use std::sync::atomic::Ordering;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Html, Response},
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/reset", post(reset))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics))
}

/// Counts requests to the static app.
pub async fn count_hits(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

pub async fn metrics(State(state): State<AppState>) -> Html<String> {
    let hits = state.hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n<body>\n<h1>Welcome, Chirpy Admin</h1>\n<p>Chirpy has been visited {hits} times!</p>\n</body>\n</html>\n"
    ))
}

pub async fn reset(State(state): State<AppState>) -> &'static str {
    state.hits.store(0, Ordering::Relaxed);
    "OK"
}
