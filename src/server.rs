use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::LinkResult;
use crate::handlers::{
    create_short_url, delete_link, get_link, health_check, list_links, redirect, AppState,
    SharedState,
};
use crate::middleware::logging_middleware;
use crate::remote_log::{LogLevel, RemoteLogger};
use crate::resolver::RedirectResolver;
use crate::shortener::ShorteningService;
use crate::store::{LinkStore, MemoryStore};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::signal;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Wires the store, services and remote logger for `config`.
pub fn build_state(
    config: &Config,
    store: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
) -> LinkResult<SharedState> {
    let shortener = ShorteningService::new(store.clone(), clock.clone(), &config.base_url)
        .with_default_validity(config.default_validity_minutes);
    let resolver = RedirectResolver::new(store.clone(), clock);

    Ok(Arc::new(AppState {
        store,
        shortener,
        resolver,
        remote_log: RemoteLogger::from_config(config)?,
        started_at: SystemTime::now(),
    }))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/shorturls", get(list_links).post(create_short_url))
        .route("/shorten", post(create_short_url))
        .route("/shorturls/:code", get(get_link).delete(delete_link))
        .route("/health", get(health_check))
        .route("/:code", get(redirect))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(logging_middleware)),
        )
}

/// Builds the application router backed by an in-memory store and the system clock.
pub fn create_app(config: &Config) -> LinkResult<Router> {
    let store = Arc::new(MemoryStore::new(config.max_click_history));
    let state = build_state(config, store, Arc::new(SystemClock))?;
    Ok(router(state))
}

/// Periodically drops expired links. Reads still evict lazily in between.
pub fn spawn_sweeper(
    store: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
    remote_log: RemoteLogger,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.sweep_expired(clock.now_millis()) {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::info!(removed, "Swept expired links");
                    remote_log.log(
                        LogLevel::Info,
                        "cron_job",
                        format!("Swept {} expired links", removed),
                    );
                }
                Err(e) => tracing::error!(error = %e, "Expired link sweep failed"),
            }
        }
    })
}

pub struct Server {
    config: Config,
    state: SharedState,
    clock: Arc<dyn Clock>,
}

impl Server {
    pub fn new(config: Config) -> LinkResult<Self> {
        config.validate()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store: Arc<dyn LinkStore> = Arc::new(MemoryStore::new(config.max_click_history));
        let state = build_state(&config, store, clock.clone())?;

        Ok(Self {
            config,
            state,
            clock,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!("snaplink listening on {}", self.config.bind_addr);
        tracing::info!("Short links are served under {}", self.config.base_url);
        if self.state.remote_log.is_enabled() {
            tracing::info!("Remote log shipping enabled");
        }

        let sweeper = (self.config.sweep_interval_secs > 0).then(|| {
            tracing::info!(
                interval_secs = self.config.sweep_interval_secs,
                "Expired link sweep enabled"
            );
            spawn_sweeper(
                self.state.store.clone(),
                self.clock.clone(),
                self.state.remote_log.clone(),
                Duration::from_secs(self.config.sweep_interval_secs),
            )
        });

        let app = router(self.state);
        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::LinkRecord;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_links() {
        let store = Arc::new(MemoryStore::default());
        let clock = ManualClock::new(0);
        store
            .put(LinkRecord::new("old".into(), "https://a.com".into(), 0, 10), 0)
            .unwrap();
        store
            .put(LinkRecord::new("new".into(), "https://b.com".into(), 0, 1_000_000), 0)
            .unwrap();
        clock.set(100);

        let handle = spawn_sweeper(
            store.clone(),
            Arc::new(clock),
            RemoteLogger::disabled(),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        handle.abort();

        assert!(store.get("old").unwrap().is_none());
        assert!(store.get("new").unwrap().is_some());
    }

    #[test]
    fn test_server_rejects_invalid_config() {
        let config = Config {
            base_url: "::".to_string(),
            ..Config::default()
        };
        assert!(Server::new(config).is_err());
    }
}
