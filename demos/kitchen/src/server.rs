//! Kitchen server implementation.

use crate::menu::{self, MenuShape};
use futures_util::{SinkExt, StreamExt};
use menuboard_core::{ClientMessage, RequestKind};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::tungstenite::Message;

/// What the kitchen serves.
pub struct Kitchen {
    pub dishes: Vec<Value>,
    pub shape: MenuShape,
    pub public_url: String,
}

impl Kitchen {
    fn menu_frame(&self) -> Value {
        self.shape.encode(&self.dishes)
    }

    fn reply(&self, kind: RequestKind) -> Value {
        match kind {
            RequestKind::Menu | RequestKind::MenuCompat => self.menu_frame(),
            RequestKind::Ingredients => menu::ingredient_catalog(&self.dishes),
            RequestKind::QrCodes => json!({
                "qrCodes": {"menu": {"url": self.public_url}}
            }),
        }
    }
}

type SharedKitchen = Arc<RwLock<Kitchen>>;

pub async fn run(addr: SocketAddr, kitchen: Kitchen, restock_secs: Option<u64>) -> anyhow::Result<()> {
    let kitchen = Arc::new(RwLock::new(kitchen));
    let (push_tx, _) = broadcast::channel::<String>(16);

    if let Some(secs) = restock_secs {
        tokio::spawn(restock_loop(kitchen.clone(), push_tx.clone(), Duration::from_secs(secs)));
    }

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}", addr);

    loop {
        let (stream, client_addr) = listener.accept().await?;
        let kitchen = kitchen.clone();
        let push_rx = push_tx.subscribe();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, kitchen, push_rx).await {
                tracing::warn!("Connection error from {}: {}", client_addr, e);
            }
        });
    }
}

async fn restock_loop(kitchen: SharedKitchen, push_tx: broadcast::Sender<String>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    let mut round = 0u64;

    loop {
        ticker.tick().await;
        let frame = {
            let mut k = kitchen.write().await;
            menu::restock(&mut k.dishes, round);
            k.menu_frame().to_string()
        };
        round += 1;
        // No receivers just means no board is connected.
        let _ = push_tx.send(frame);
        tracing::info!("Pushed menu update (round {})", round);
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    kitchen: SharedKitchen,
    mut push_rx: broadcast::Receiver<String>,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    tracing::info!("Board connected from {}", addr);

    loop {
        tokio::select! {
            msg = stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                let Message::Text(text) = msg else { continue };
                let request: ClientMessage = match serde_json::from_str(&text) {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Invalid request from {}: {}", addr, e);
                        continue;
                    }
                };

                tracing::debug!("{} asked for {:?}", addr, request.kind());
                let reply = kitchen.read().await.reply(request.kind());
                sink.send(Message::Text(reply.to_string().into())).await?;
            }

            pushed = push_rx.recv() => {
                match pushed {
                    Ok(frame) => sink.send(Message::Text(frame.into())).await?,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!("{} skipped {} pushes", addr, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!("Board disconnected: {}", addr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen(shape: MenuShape) -> Kitchen {
        Kitchen {
            dishes: menu::sample(),
            shape,
            public_url: "https://m.test".into(),
        }
    }

    #[test]
    fn both_menu_requests_get_the_menu() {
        let k = kitchen(MenuShape::BareMenu);
        assert_eq!(k.reply(RequestKind::Menu), k.reply(RequestKind::MenuCompat));
        assert!(k.reply(RequestKind::Menu)["menu"].is_array());
    }

    #[test]
    fn qr_reply_carries_public_url() {
        let reply = kitchen(MenuShape::TaggedMenu).reply(RequestKind::QrCodes);
        assert_eq!(reply["qrCodes"]["menu"]["url"], "https://m.test");
    }
}
