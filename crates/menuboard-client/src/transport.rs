//! Transport seam.
//!
//! A [`Connector`] starts one link per connection attempt. The link runs as
//! its own task and reports back through [`LinkEvents`]; the manager aborts
//! the task to drop the link. Events are tagged with the attempt's
//! generation so the manager can discard anything from a superseded attempt.

use crate::manager::Input;
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use tokio::sync::mpsc::{self, UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

/// Close code reported when the link dropped without a close handshake.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code reported when the peer closed without a status code.
pub const NO_STATUS: u16 = 1005;
pub const NORMAL_CLOSURE: u16 = 1000;

/// Transport-level failure. Never fatal: it ends the current link and goes
/// through the same path as an orderly close.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("link dropped: {0}")]
    Dropped(String),
}

/// Why a link ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    pub code: Option<u16>,
    pub reason: String,
}

impl Closure {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_frame(frame: Option<CloseFrame>) -> Self {
        match frame {
            Some(frame) => Self::new(u16::from(frame.code), frame.reason.as_str()),
            None => Self::new(NO_STATUS, ""),
        }
    }

    /// Human-readable meaning of the close code, when it is a well-known one.
    pub fn meaning(&self) -> Option<&'static str> {
        self.code.and_then(describe_close_code)
    }
}

impl From<TransportError> for Closure {
    fn from(err: TransportError) -> Self {
        Self::new(ABNORMAL_CLOSURE, err.to_string())
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "code {code}")?,
            None => f.write_str("no code")?,
        }
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

/// Meaning of the standard WebSocket close codes.
pub fn describe_close_code(code: u16) -> Option<&'static str> {
    Some(match code {
        1000 => "normal closure",
        1001 => "endpoint going away",
        1002 => "protocol error",
        1003 => "unsupported data",
        1005 => "no status code received",
        1006 => "abnormal closure, is the server running?",
        1007 => "invalid payload (non UTF-8)",
        1008 => "policy violation",
        1009 => "message too big",
        1011 => "internal server error",
        1015 => "TLS handshake failure",
        _ => return None,
    })
}

/// What a link reports.
#[derive(Debug)]
pub(crate) enum LinkEvent {
    /// The link is up; text frames sent on the channel go to the server.
    Opened(UnboundedSender<String>),
    Frame(String),
    Closed(Closure),
}

/// Reporting handle given to a link task.
#[derive(Debug, Clone)]
pub struct LinkEvents {
    generation: u64,
    target: WeakUnboundedSender<Input>,
}

impl LinkEvents {
    pub(crate) fn new(generation: u64, target: WeakUnboundedSender<Input>) -> Self {
        Self { generation, target }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The link is open. Returns `false` if the manager has gone away.
    pub fn opened(&self, outbound: UnboundedSender<String>) -> bool {
        self.report(LinkEvent::Opened(outbound))
    }

    /// A text frame arrived.
    pub fn frame(&self, text: impl Into<String>) -> bool {
        self.report(LinkEvent::Frame(text.into()))
    }

    /// The link ended. Must be the last report of a link.
    pub fn closed(&self, closure: Closure) -> bool {
        self.report(LinkEvent::Closed(closure))
    }

    fn report(&self, event: LinkEvent) -> bool {
        let Some(tx) = self.target.upgrade() else {
            return false;
        };
        tx.send(Input::Link {
            generation: self.generation,
            event,
        })
        .is_ok()
    }
}

/// Opens links to a server address.
pub trait Connector: Send + Sync + 'static {
    /// Start a link to `address`. The task must report exactly one
    /// `closed` unless it is aborted first.
    fn connect(&self, address: &str, events: LinkEvents) -> JoinHandle<()>;
}

/// WebSocket links over tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, address: &str, events: LinkEvents) -> JoinHandle<()> {
        let address = address.to_string();
        tokio::spawn(async move {
            let closure = match run_link(&address, &events).await {
                Ok(closure) => closure,
                Err(e) => Closure::from(e),
            };
            events.closed(closure);
        })
    }
}

async fn run_link(address: &str, events: &LinkEvents) -> Result<Closure, TransportError> {
    let (ws, _response) = tokio_tungstenite::connect_async(address).await?;
    let (mut sink, mut stream) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    if !events.opened(outbound_tx) {
        let _ = sink.close().await;
        return Ok(Closure::new(NORMAL_CLOSURE, "client stopped"));
    }

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        events.frame(text.as_str());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        // Flush the queued close reply before the task ends.
                        let _ = sink.close().await;
                        return Ok(Closure::from_frame(frame));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(TransportError::Dropped("stream ended".into())),
                }
            }

            out = outbound_rx.recv() => {
                match out {
                    Some(text) => sink.send(Message::Text(text.into())).await?,
                    None => {
                        let _ = sink.close().await;
                        return Ok(Closure::new(NORMAL_CLOSURE, "client closed"));
                    }
                }
            }
        }
    }
}
