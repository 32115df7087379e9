use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use once_cell::sync::OnceCell;
use salvo::prelude::*;
use tracing::info;

use crate::bridge::SyncService;
use crate::config::Config;

pub mod handlers;

use self::handlers::health::{get_status, health_check};
use self::handlers::webhook::discourse_webhook;

#[derive(Clone)]
pub struct WebState {
    pub service: Arc<SyncService>,
    pub started_at: Instant,
}

static WEB_STATE: OnceCell<WebState> = OnceCell::new();

pub fn web_state() -> &'static WebState {
    WEB_STATE
        .get()
        .expect("web state is not initialized before handler execution")
}

/// HTTP listener for Discourse webhook deliveries plus a health probe.
#[derive(Clone)]
pub struct WebServer {
    config: Arc<Config>,
}

impl WebServer {
    pub fn new(config: Arc<Config>, service: Arc<SyncService>) -> Self {
        let _ = WEB_STATE.set(WebState {
            service,
            started_at: Instant::now(),
        });

        Self { config }
    }

    pub async fn start(&self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.config.sync_settings.webhook_host, self.config.sync_settings.webhook_port
        );
        info!("starting webhook listener on {}", bind_addr);

        let acceptor = TcpListener::new(bind_addr).bind().await;
        Server::new(acceptor).serve(create_router()).await;

        Ok(())
    }
}

pub fn create_router() -> Router {
    Router::new()
        .push(Router::with_path("health").get(health_check))
        .push(Router::with_path("status").get(get_status))
        .push(Router::with_path("discourse-webhook").post(discourse_webhook))
}
