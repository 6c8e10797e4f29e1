//! Leaderboards binary entrypoint wiring configuration, storage and the REST layer.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use leaderboards::{
    config::{AppConfig, ServerConfig, StorageKind},
    dao::{
        cache::{ListCache, LocalListCache},
        cached::CacheFirstStorage,
        durable::DurableStore,
        memory::InMemoryStorage,
    },
    leaderboard::Leaderboard,
    routes,
    state::{AppState, LeaderboardRegistry, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    if let Some(threads) = config.server.threads {
        runtime.worker_threads(threads);
    }
    runtime
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let durable = connect_durable(config.storage).await?;
    let state = build_state(&config, durable);

    if state.registry().is_empty() {
        warn!("no leaderboard configured; every query will answer 404");
    }

    // Build the HTTP router once the shared state is ready.
    let app = build_router(state, &config.server);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!(%addr, base_path = %config.server.base_path, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Connect to the durable store selected by `storage`, if it needs one.
async fn connect_durable(storage: StorageKind) -> anyhow::Result<Option<Arc<dyn DurableStore>>> {
    match storage {
        StorageKind::Memory | StorageKind::Cache => Ok(None),
        #[cfg(feature = "mongo-store")]
        StorageKind::Mongo => {
            use leaderboards::dao::durable::mongodb::{MongoConfig, MongoDurableStore};

            let config = MongoConfig::from_env()
                .await
                .context("reading MongoDB settings")?;
            let store = MongoDurableStore::connect(config)
                .await
                .context("connecting to MongoDB")?;
            info!("using MongoDB durable store");
            Ok(Some(Arc::new(store)))
        }
        #[cfg(feature = "couch-store")]
        StorageKind::Couch => {
            use leaderboards::dao::durable::couchdb::{CouchConfig, CouchDurableStore};

            let config = CouchConfig::from_env().context("reading CouchDB settings")?;
            let store = CouchDurableStore::connect(config)
                .await
                .context("connecting to CouchDB")?;
            info!("using CouchDB durable store");
            Ok(Some(Arc::new(store)))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("storage `{other:?}` is not compiled into this binary"),
    }
}

/// Register every configured leaderboard on the selected backend.
fn build_state(config: &AppConfig, durable: Option<Arc<dyn DurableStore>>) -> SharedState {
    let registry = LeaderboardRegistry::new();
    let cache: Arc<dyn ListCache> = Arc::new(LocalListCache::new());

    for definition in &config.leaderboards {
        let mut builder = Leaderboard::builder(definition.name.as_str())
            .score_field(definition.score_field.as_str());
        if let Some(identity) = &definition.identity_field {
            builder = builder.identity_field(identity.as_str());
        }

        let collection = definition.name.as_str();
        builder = match (&durable, config.storage) {
            (_, StorageKind::Memory) => builder.storage(InMemoryStorage::new()),
            (Some(store), _) => builder.storage(CacheFirstStorage::with_durable(
                store.clone(),
                cache.clone(),
                collection,
            )),
            (None, _) => builder.storage(CacheFirstStorage::new(cache.clone(), collection)),
        };

        registry.register(builder.build());
    }

    match durable {
        Some(store) => AppState::with_durable(registry, store),
        None => AppState::new(registry),
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, server: &ServerConfig) -> Router<()> {
    let router = routes::router(state, &server.base_path).layer(TraceLayer::new_for_http());
    if server.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
