//! Wiki assistant - read-only SQL access to the wiki database over HTTP.

mod cli;

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use cli::Cli;
use tracing::{error, info};
use wiki_assistant::api;
use wiki_assistant::connection::ConnectionProvider;
use wiki_assistant::logging;
use wiki_assistant::query::QueryExecutor;

#[actix_web::main]
async fn main() {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let config = cli.load_config()?;

    let provider = Arc::new(ConnectionProvider::from_config(&config));
    let executor = web::Data::new(QueryExecutor::new(provider));

    let bind_addr = config.server.bind_addr();
    info!("Starting wiki assistant on {}", bind_addr);

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(executor.clone())
            .configure(api::configure_routes)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {bind_addr}"))?;

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.run().await.context("HTTP server failed")?;
    info!("Wiki assistant stopped");
    Ok(())
}
