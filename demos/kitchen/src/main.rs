//! Kitchen: a small menu server for trying the board locally.
//!
//! Answers every request encoding the board sends, pushes the menu in the
//! layout chosen with `--shape`, and can change stock levels on a timer so
//! live updates can be watched:
//!
//!   cargo run -p menuboard-demo-kitchen -- --port 3000 --shape bare-menu --restock-secs 20
//!   cargo run -p menuboard-demo-board -- --address ws://127.0.0.1:3000

mod menu;
mod server;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kitchen", about = "Menu server for the menuboard demo")]
struct Args {
    #[arg(long, env = "KITCHEN_PORT", default_value_t = 3000)]
    port: u16,

    /// Layout used for menu pushes.
    #[arg(long, value_enum, default_value_t = menu::MenuShape::TaggedMenu)]
    shape: menu::MenuShape,

    /// JSON file with the dish list; a built-in sample is used otherwise.
    #[arg(long)]
    menu: Option<PathBuf>,

    /// Change one dish's stock and push the menu every N seconds.
    #[arg(long)]
    restock_secs: Option<u64>,

    /// Public URL encoded in the QR payload.
    #[arg(long, default_value = "https://menu.example.com")]
    public_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kitchen=info".parse()?))
        .init();

    let args = Args::parse();
    let dishes = match &args.menu {
        Some(path) => menu::load(path)?,
        None => menu::sample(),
    };
    let addr: SocketAddr = ([0, 0, 0, 0], args.port).into();

    tracing::info!("Serving {} dishes as {:?} on {}", dishes.len(), args.shape, addr);

    server::run(
        addr,
        server::Kitchen {
            dishes,
            shape: args.shape,
            public_url: args.public_url,
        },
        args.restock_secs,
    )
    .await
}
