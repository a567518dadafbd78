use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::routes::{
    create_entry, delete_entry, get_entry, list_entries, list_topics, stats, stream_entries,
    update_entry, AppState,
};
use flashlingo_core::{UserId, VocabRepository};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route("/entries/stream", get(stream_entries))
        .route("/entries/:id", get(get_entry).put(update_entry).delete(delete_entry))
        .route("/topics", get(list_topics))
        .route("/stats", get(stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(
    repo: Arc<dyn VocabRepository>,
    default_user: UserId,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let app = router(Arc::new(AppState { repo, default_user }));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "api listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
