//! Rankwave Back binary entrypoint wiring REST, WebSocket, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rankwave_back::{
    config::AppConfig,
    dao::poll_store::memory::MemoryPollStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    install_store(app_state.clone()).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the configured poll store: MongoDB under supervision by default,
/// or the in-memory backend when `POLL_STORE=memory` is set.
async fn install_store(state: SharedState) {
    if env::var("POLL_STORE").is_ok_and(|kind| kind == "memory") {
        info!("using in-memory poll store");
        state
            .set_poll_store(Arc::new(MemoryPollStore::default()))
            .await;
        return;
    }

    #[cfg(feature = "mongo-store")]
    {
        use rankwave_back::dao::poll_store::PollStore;
        use rankwave_back::dao::poll_store::mongodb::{MongoConfig, MongoPollStore};
        use rankwave_back::dao::storage::StorageError;
        use rankwave_back::services::storage_supervisor;

        let mongo_uri =
            env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
        let mongo_db = env::var("MONGO_DB").ok();

        tokio::spawn(storage_supervisor::run(state, move || {
            let uri = mongo_uri.clone();
            let db = mongo_db.clone();
            async move {
                let config = MongoConfig::from_uri(&uri, db.as_deref())
                    .await
                    .map_err(StorageError::from)?;
                let store = MongoPollStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok(Arc::new(store) as Arc<dyn PollStore>)
            }
        }));
    }

    #[cfg(not(feature = "mongo-store"))]
    {
        tracing::warn!("built without mongo-store; falling back to the in-memory poll store");
        state
            .set_poll_store(Arc::new(MemoryPollStore::default()))
            .await;
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
