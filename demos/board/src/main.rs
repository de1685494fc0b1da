//! Terminal menu board.
//!
//! Connects to a menu server, keeps the connection alive and prints the menu
//! in the chosen language whenever it changes.
//!
//!   cargo run -p menuboard-demo-board -- --address ws://127.0.0.1:3000 --locale en
//!
//! Settings come from `--config` (TOML), then flags or their environment
//! variables.

mod render;

use anyhow::Context;
use clap::Parser;
use menuboard_client::{
    ALL_CATEGORIES, BusEvent, ClientConfig, ConnectionManager, ConnectionState, Environment,
    EventBus, IngredientCache, MenuStore, Topic, WsConnector,
};
use menuboard_core::Locale;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "board", about = "Live restaurant menu board")]
struct Args {
    /// Server address, e.g. ws://127.0.0.1:3000. Overrides the config file.
    #[arg(long, env = "MENUBOARD_ADDRESS")]
    address: Option<String>,

    /// TOML config file.
    #[arg(long, env = "MENUBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Endpoint to use when no address is given: local or production.
    #[arg(long, env = "MENUBOARD_ENVIRONMENT")]
    environment: Option<Environment>,

    /// Display language.
    #[arg(long, env = "MENUBOARD_LOCALE", default_value = "fr")]
    locale: Locale,

    /// Only show this category.
    #[arg(long, default_value = ALL_CATEGORIES)]
    category: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("board=info".parse()?)
                .add_directive("menuboard_client=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(environment) = args.environment {
        config.environment = environment;
    }
    if let Some(address) = args.address {
        config.address = Some(address);
    }

    tracing::info!("Menu server: {}", config.address());
    tracing::info!("Locale: {}, category: {}", args.locale, args.category);

    let bus = Arc::new(EventBus::new());
    let menu = MenuStore::new();
    menu.attach(&bus);
    let ingredients = IngredientCache::new();
    ingredients.attach(&bus);

    // Subscribers run on the manager task; hand events over to this one.
    let (tx, mut events) = mpsc::unbounded_channel();
    let _subscriptions: Vec<_> = [Topic::ConnectionStatus, Topic::MenuUpdated, Topic::IngredientsUpdated]
        .into_iter()
        .map(|topic| {
            let tx = tx.clone();
            bus.subscribe_fn(topic, move |event| {
                let _ = tx.send(event.clone());
                Ok(())
            })
        })
        .collect();

    let (manager, task) = ConnectionManager::spawn(config, WsConnector, bus);
    manager.connect_default()?;

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                BusEvent::ConnectionStatusChanged(state) => {
                    println!("{}", render::status(state));
                    // Requests are not queued by the manager; ask again on every open.
                    if state == ConnectionState::Connected {
                        if let Err(e) = manager.request_ingredients().await {
                            tracing::warn!("Ingredient request failed: {}", e);
                        }
                    }
                }
                BusEvent::MenuUpdated(_) | BusEvent::IngredientsUpdated(_) => {
                    print!("{}", render::board(&menu, &ingredients, &args.locale, &args.category));
                }
                BusEvent::QrCodesUpdated(_) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    manager.shutdown();
    task.await?;
    Ok(())
}
