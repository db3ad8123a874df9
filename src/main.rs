//! palaverd - a schema-driven binary chat protocol server.

mod commands;
mod config;
mod db;
mod directory;
mod handlers;
mod hub;
mod network;
mod session;

use anyhow::Context;
use palaver_proto::SchemaRegistry;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::db::Database;
use crate::hub::Hub;
use crate::network::Gateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // First argument is the config path; defaults apply without one.
    let config = match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("loading config from {path}"))?
        }
        None => Config::default(),
    };

    let schema = match &config.schema.path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading schema from {path}"))?;
            SchemaRegistry::load_toml(&raw).context("parsing packet schema")?
        }
        None => SchemaRegistry::builtin().context("loading built-in packet schema")?,
    };

    let commands = CommandRegistry::builtin().context("registering built-in commands")?;
    let db = Database::open(&config.database.path)
        .await
        .context("opening credential store")?;

    info!(
        name = %config.server.name,
        listen = %config.server.listen,
        "Starting palaverd"
    );

    let hub = Arc::new(Hub::new(&config, Arc::new(schema), commands, db));
    let gateway = Gateway::bind(hub, config.server.listen)
        .await
        .context("binding listener")?;
    gateway.run().await.context("accept loop failed")
}
