use crate::call::app::{CallSessionManager, ClockHook};
use crate::config::Config;
use crate::store::{create_store, ReportStore};
use crate::texts::{TextCatalog, TextStore};
use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, info};

/// Sweeper period upper bound; shorter idle limits sweep more often.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct AppStateInner {
    pub config: Arc<Config>,
    pub sessions: Arc<CallSessionManager>,
    pub token: CancellationToken,
}

pub type AppState = Arc<AppStateInner>;

pub struct AppStateBuilder {
    pub config: Option<Config>,
    pub store: Option<Arc<dyn ReportStore>>,
    pub texts: Option<Arc<dyn TextStore>>,
    pub clock: Option<ClockHook>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            texts: None,
            clock: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn texts(mut self, texts: Arc<dyn TextStore>) -> Self {
        self.texts = Some(texts);
        self
    }

    pub fn clock(mut self, clock: ClockHook) -> Self {
        self.clock = Some(clock);
        self
    }

    pub async fn build(self) -> Result<AppState> {
        let config = Arc::new(self.config.unwrap_or_default());
        let token = CancellationToken::new();

        let store = match self.store {
            Some(store) => store,
            None => create_store(&config.store).await?,
        };

        let texts: Arc<dyn TextStore> = match self.texts {
            Some(texts) => texts,
            None => {
                let mut catalog = TextCatalog::builtin()?;
                if let Some(path) = &config.texts {
                    catalog = catalog.merge(TextCatalog::load(path)?);
                }
                info!(texts = catalog.len(), "text catalog ready");
                Arc::new(catalog)
            }
        };

        let mut sessions = CallSessionManager::new(store, texts, config.clone())?;
        if let Some(clock) = self.clock {
            sessions = sessions.with_clock(clock);
        }

        Ok(Arc::new(AppStateInner {
            config,
            sessions: Arc::new(sessions),
            token,
        }))
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn run(state: AppState) -> Result<()> {
    let token = state.token.clone();

    let app = create_router(state.clone());
    let addr: SocketAddr = state.config.http_addr.parse()?;
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return Err(anyhow::anyhow!("Failed to bind to {}: {}", addr, e));
        }
    };
    info!("Listening for gateway turns on {}", addr);

    let http_task = axum::serve(listener, app.into_make_service());

    select! {
        http_result = http_task => {
            match http_result {
                Ok(_) => info!("Server shut down gracefully"),
                Err(e) => {
                    tracing::error!("Server error: {}", e);
                    return Err(anyhow::anyhow!("Server error: {}", e));
                }
            }
        }
        _ = sweep_idle_sessions(state.clone()) => {}
        _ = token.cancelled() => {
            info!("Application shutting down due to cancellation");
        }
    }
    token.cancel();
    Ok(())
}

/// Drops calls whose gateway stopped sending turns without a hangup.
async fn sweep_idle_sessions(state: AppState) {
    let max_idle = Duration::from_secs(state.config.session_idle_secs.max(1));
    let mut interval = tokio::time::interval(SWEEP_INTERVAL.min(max_idle));
    loop {
        select! {
            _ = state.token.cancelled() => break,
            _ = interval.tick() => {
                let pruned = state.sessions.prune_idle(max_idle).await;
                if pruned > 0 {
                    info!(pruned, "dropped idle call sessions");
                } else {
                    debug!("no idle call sessions");
                }
            }
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
            axum::http::header::ORIGIN,
        ]);

    crate::handler::router().with_state(state).layer(cors)
}
