#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod bridge;
mod cli;
mod config;
mod db;
mod discourse;
mod gchat;
mod parsers;
mod utils;
mod web;

use config::Config;
use web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init_tracing();

    let args = cli::Cli::parse();
    let config = Arc::new(Config::load_from_file(&args.config)?);
    info!("gchat-discourse bridge starting up");

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database));
    db_manager.migrate().await?;

    let chat_client: Arc<dyn gchat::ChatPort> =
        Arc::new(gchat::GoogleChatClient::new(&config)?);
    let forum_client: Arc<dyn discourse::ForumPort> =
        Arc::new(discourse::DiscourseClient::new(&config)?);

    let service = Arc::new(bridge::SyncService::new(
        config.clone(),
        chat_client,
        forum_client,
        db_manager,
        args.exit_on_error,
    ));

    let web_server = WebServer::new(config.clone(), service.clone());

    let sync_handle = tokio::spawn(async move { service.run().await });
    let web_handle = tokio::spawn(async move { web_server.start().await });

    tokio::select! {
        res = sync_handle => {
            res??;
        }
        res = web_handle => {
            res??;
        }
    }

    info!("gchat-discourse bridge shutting down");
    Ok(())
}
