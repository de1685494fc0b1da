//! Connection manager.
//!
//! A single actor task owns the connection: its state, the attempt counter,
//! the live link and the timers. Everything reaches it as an [`Input`] on one
//! channel and is handled to completion before the next input is read, so
//! transitions never interleave. [`ConnectionManager`] is the cloneable
//! handle used to drive it.
//!
//! State changes are only observable through `ConnectionStatusChanged` events
//! on the bus.

use crate::bus::{BusEvent, EventBus};
use crate::classify::{self, Classified};
use crate::config::ClientConfig;
use crate::timer::Timer;
use crate::transport::{Closure, Connector, LinkEvent, LinkEvents};
use menuboard_core::{ClientMessage, ConnectionState, RequestKind};
use serde_json::Value;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Longest frame prefix written to the log when a frame cannot be decoded.
const FRAME_PREVIEW: usize = 200;

/// Error returned to callers of the manager handle.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("not connected")]
    NotConnected,
    #[error("connection manager has stopped")]
    Stopped,
    #[error("cannot encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug)]
pub(crate) enum Input {
    /// Explicit connect. `None` reuses the current address.
    Connect {
        address: Option<String>,
    },
    /// The environment says the network may be reachable again.
    Resume,
    Send {
        kind: RequestKind,
        reply: oneshot::Sender<Result<(), RequestError>>,
    },
    Link {
        generation: u64,
        event: LinkEvent,
    },
    RetryDue {
        generation: u64,
    },
    FollowUpDue {
        generation: u64,
    },
    WatchdogDue {
        generation: u64,
    },
    Shutdown,
}

/// Handle to a running connection manager.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    tx: UnboundedSender<Input>,
}

impl ConnectionManager {
    /// Start the manager task. It stays `Disconnected` until `connect` is
    /// called, and stops on `shutdown` or once every handle is dropped.
    pub fn spawn<C: Connector>(
        config: ClientConfig,
        connector: C,
        bus: Arc<EventBus>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Actor::new(config, connector, bus, tx.downgrade());
        let task = tokio::spawn(actor.run(rx));
        (Self { tx }, task)
    }

    /// Connect to `address`, tearing down any current attempt or link first.
    /// Resets the attempt counter.
    pub fn connect(&self, address: impl Into<String>) -> Result<(), RequestError> {
        self.input(Input::Connect {
            address: Some(address.into()),
        })
    }

    /// Connect to the configured (or last used) address.
    pub fn connect_default(&self) -> Result<(), RequestError> {
        self.input(Input::Connect { address: None })
    }

    /// Reconnect now if currently disconnected, e.g. when the board comes
    /// back to the foreground. Does nothing otherwise.
    pub fn resume(&self) -> Result<(), RequestError> {
        self.input(Input::Resume)
    }

    /// Send a request to the server. Fails with `NotConnected` unless the
    /// manager is `Connected`; requests are never queued.
    pub async fn send(&self, kind: RequestKind) -> Result<(), RequestError> {
        let (reply, rx) = oneshot::channel();
        self.input(Input::Send { kind, reply })?;
        rx.await.map_err(|_| RequestError::Stopped)?
    }

    pub async fn request_ingredients(&self) -> Result<(), RequestError> {
        self.send(RequestKind::Ingredients).await
    }

    pub async fn request_qr_codes(&self) -> Result<(), RequestError> {
        self.send(RequestKind::QrCodes).await
    }

    /// Close the link and stop the manager task.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Input::Shutdown);
    }

    fn input(&self, input: Input) -> Result<(), RequestError> {
        self.tx.send(input).map_err(|_| RequestError::Stopped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Explicit,
    Retry,
    Resume,
}

struct Actor<C> {
    config: ClientConfig,
    connector: C,
    bus: Arc<EventBus>,
    inbox: WeakUnboundedSender<Input>,
    address: String,
    state: ConnectionState,
    /// Consecutive failed attempts since the last successful open.
    attempts: u32,
    /// Bumped on every attempt; events tagged with an older value are stale.
    generation: u64,
    link: Option<JoinHandle<()>>,
    outbound: Option<UnboundedSender<String>>,
    menu_seen: bool,
    retry: Timer,
    follow_up: Timer,
    watchdog: Timer,
}

impl<C: Connector> Actor<C> {
    fn new(
        config: ClientConfig,
        connector: C,
        bus: Arc<EventBus>,
        inbox: WeakUnboundedSender<Input>,
    ) -> Self {
        Self {
            address: config.address().to_string(),
            config,
            connector,
            bus,
            inbox,
            state: ConnectionState::Disconnected,
            attempts: 0,
            generation: 0,
            link: None,
            outbound: None,
            menu_seen: false,
            retry: Timer::default(),
            follow_up: Timer::default(),
            watchdog: Timer::default(),
        }
    }

    async fn run(mut self, mut inbox: UnboundedReceiver<Input>) {
        while let Some(input) = inbox.recv().await {
            if self.handle(input).is_break() {
                break;
            }
        }

        self.teardown();
        if self.state != ConnectionState::Disconnected {
            self.announce(ConnectionState::Disconnected);
        }
        tracing::debug!(address = %self.address, "connection manager stopped");
    }

    fn handle(&mut self, input: Input) -> ControlFlow<()> {
        match input {
            Input::Connect { address } => {
                if let Some(address) = address {
                    self.address = address;
                }
                self.start_attempt(Trigger::Explicit);
            }
            Input::Resume => {
                if self.state == ConnectionState::Disconnected {
                    self.start_attempt(Trigger::Resume);
                }
            }
            Input::Send { kind, reply } => {
                let _ = reply.send(self.send(kind));
            }
            Input::Link { generation, event } => self.on_link(generation, event),
            Input::RetryDue { generation } => {
                if generation == self.generation && self.state == ConnectionState::Disconnected {
                    self.retry.clear();
                    self.start_attempt(Trigger::Retry);
                }
            }
            Input::FollowUpDue { generation } => {
                if generation == self.generation && self.state == ConnectionState::Connected {
                    self.follow_up.clear();
                    if let Err(e) = self.send(RequestKind::MenuCompat) {
                        tracing::warn!(error = %e, "follow-up menu request failed");
                    }
                }
            }
            Input::WatchdogDue { generation } => {
                if generation == self.generation && self.state == ConnectionState::Connected {
                    self.watchdog.clear();
                    if !self.menu_seen {
                        tracing::warn!(
                            address = %self.address,
                            after = ?self.config.menu_watchdog,
                            "connected but no menu received; the server should answer \
                             requestMenu/getMenu with a menuUpdate carrying a menu list"
                        );
                    }
                }
            }
            Input::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn start_attempt(&mut self, trigger: Trigger) {
        self.teardown();
        if trigger == Trigger::Explicit {
            self.attempts = 0;
        }
        self.generation += 1;
        self.announce(ConnectionState::Connecting);

        tracing::info!(
            address = %self.address,
            attempt = self.attempts,
            max = self.config.max_attempts,
            ?trigger,
            "connecting"
        );
        let events = LinkEvents::new(self.generation, self.inbox.clone());
        self.link = Some(self.connector.connect(&self.address, events));
    }

    /// Drop the link and cancel every pending timer.
    fn teardown(&mut self) {
        if let Some(link) = self.link.take() {
            link.abort();
        }
        self.outbound = None;
        self.retry.cancel();
        self.follow_up.cancel();
        self.watchdog.cancel();
    }

    fn on_link(&mut self, generation: u64, event: LinkEvent) {
        if generation != self.generation || self.link.is_none() {
            tracing::trace!(
                generation,
                current = self.generation,
                "dropping event from superseded link"
            );
            return;
        }

        match event {
            LinkEvent::Opened(outbound) => self.on_open(outbound),
            LinkEvent::Frame(text) => self.dispatch(&text),
            LinkEvent::Closed(closure) => self.on_closed(closure),
        }
    }

    fn on_open(&mut self, outbound: UnboundedSender<String>) {
        if self.state != ConnectionState::Connecting {
            return;
        }

        self.attempts = 0;
        self.outbound = Some(outbound);
        self.menu_seen = false;
        self.announce(ConnectionState::Connected);
        tracing::info!(address = %self.address, "connected");

        // Two encodings of the same request: servers in the field understand
        // one or the other.
        if let Err(e) = self.send(RequestKind::Menu) {
            tracing::warn!(error = %e, "menu request failed");
        }
        let generation = self.generation;
        self.follow_up.schedule(
            self.config.menu_followup_delay,
            &self.inbox,
            Input::FollowUpDue { generation },
        );
        self.watchdog.schedule(
            self.config.menu_watchdog,
            &self.inbox,
            Input::WatchdogDue { generation },
        );
    }

    fn on_closed(&mut self, closure: Closure) {
        tracing::warn!(
            address = %self.address,
            prior = %self.state,
            %closure,
            meaning = closure.meaning().unwrap_or("unknown"),
            "connection closed"
        );

        self.teardown();
        self.announce(ConnectionState::Disconnected);

        let max = self.config.max_attempts;
        self.attempts = self.attempts.saturating_add(1).min(max);
        if self.attempts >= max {
            tracing::error!(
                address = %self.address,
                attempts = self.attempts,
                "giving up reconnecting; waiting for an explicit connect"
            );
            return;
        }

        tracing::info!(
            delay = ?self.config.retry_delay,
            attempt = self.attempts,
            max,
            "reconnect scheduled"
        );
        self.retry.schedule(
            self.config.retry_delay,
            &self.inbox,
            Input::RetryDue {
                generation: self.generation,
            },
        );
    }

    fn dispatch(&mut self, frame: &str) {
        let classified = match classify::classify_frame(frame) {
            Ok(classified) => classified,
            Err(e) => {
                tracing::warn!(error = %e, frame = preview(frame), "dropping undecodable frame");
                return;
            }
        };

        let event = match classified {
            Classified::MenuSnapshot(dishes) => {
                tracing::info!(dishes = dishes.len(), "menu updated");
                self.menu_seen = true;
                self.watchdog.cancel();
                BusEvent::MenuUpdated(Arc::new(dishes))
            }
            Classified::IngredientCatalog(items) => {
                tracing::info!(ingredients = items.len(), "ingredient catalog updated");
                BusEvent::IngredientsUpdated(Arc::new(items))
            }
            Classified::QrCodes(codes) => {
                tracing::debug!("qr codes updated");
                BusEvent::QrCodesUpdated(Arc::new(codes))
            }
            Classified::Unrecognized(payload) => {
                tracing::debug!(keys = ?top_level_keys(&payload), "ignoring unrecognized payload");
                return;
            }
        };
        self.bus.publish(event);
    }

    fn send(&self, kind: RequestKind) -> Result<(), RequestError> {
        let outbound = match (&self.outbound, self.state) {
            (Some(outbound), ConnectionState::Connected) => outbound,
            _ => {
                tracing::debug!(?kind, state = %self.state, "request while not connected");
                return Err(RequestError::NotConnected);
            }
        };

        let text = ClientMessage::new(kind, unix_millis()).to_text()?;
        outbound
            .send(text)
            .map_err(|_| RequestError::NotConnected)?;
        tracing::debug!(?kind, "request sent");
        Ok(())
    }

    fn announce(&mut self, state: ConnectionState) {
        self.state = state;
        self.bus.publish(BusEvent::ConnectionStatusChanged(state));
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

fn preview(frame: &str) -> &str {
    frame
        .char_indices()
        .nth(FRAME_PREVIEW)
        .map_or(frame, |(end, _)| &frame[..end])
}

fn top_level_keys(payload: &Value) -> Vec<&str> {
    payload
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Subscription, Topic};
    use crate::transport::{ABNORMAL_CLOSURE, NORMAL_CLOSURE};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    const ADDR: &str = "ws://menu.test:3000";

    struct FakeConnector {
        links: UnboundedSender<(String, LinkEvents)>,
    }

    impl Connector for FakeConnector {
        fn connect(&self, address: &str, events: LinkEvents) -> JoinHandle<()> {
            let _ = self.links.send((address.to_string(), events));
            tokio::spawn(std::future::pending::<()>())
        }
    }

    struct Harness {
        actor: Actor<FakeConnector>,
        inbox: UnboundedReceiver<Input>,
        _inbox_tx: UnboundedSender<Input>,
        links: UnboundedReceiver<(String, LinkEvents)>,
        events: Arc<Mutex<Vec<BusEvent>>>,
        _subs: Vec<Subscription>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(ClientConfig {
                address: Some(ADDR.into()),
                ..ClientConfig::default()
            })
        }

        fn with_config(config: ClientConfig) -> Self {
            let (inbox_tx, inbox) = mpsc::unbounded_channel();
            let (links_tx, links) = mpsc::unbounded_channel();
            let bus = Arc::new(EventBus::new());
            let events = Arc::new(Mutex::new(Vec::new()));

            let subs = [
                Topic::ConnectionStatus,
                Topic::MenuUpdated,
                Topic::IngredientsUpdated,
                Topic::QrCodesUpdated,
            ]
            .into_iter()
            .map(|topic| {
                let events = events.clone();
                bus.subscribe_fn(topic, move |event| {
                    events.lock().unwrap().push(event.clone());
                    Ok(())
                })
            })
            .collect();

            let connector = FakeConnector { links: links_tx };
            let actor = Actor::new(config, connector, bus, inbox_tx.downgrade());
            Self {
                actor,
                inbox,
                _inbox_tx: inbox_tx,
                links,
                events,
                _subs: subs,
            }
        }

        fn handle(&mut self, input: Input) {
            let _ = self.actor.handle(input);
        }

        fn connect(&mut self) -> LinkEvents {
            self.handle(Input::Connect { address: None });
            self.next_link()
        }

        fn next_link(&mut self) -> LinkEvents {
            let (address, events) = self.links.try_recv().expect("connector was not called");
            assert_eq!(address, ADDR);
            events
        }

        /// Hand everything queued on the inbox to the actor.
        fn pump(&mut self) {
            while let Ok(input) = self.inbox.try_recv() {
                self.handle(input);
            }
        }

        /// Wait on the paused clock for the next timer and handle it.
        async fn next_timer(&mut self) {
            let input = self.inbox.recv().await.expect("inbox closed");
            self.handle(input);
        }

        fn open(&mut self, link: &LinkEvents) -> UnboundedReceiver<String> {
            let (tx, rx) = mpsc::unbounded_channel();
            assert!(link.opened(tx));
            self.pump();
            rx
        }

        fn fail(&mut self, link: &LinkEvents) {
            assert!(link.closed(Closure::new(ABNORMAL_CLOSURE, "")));
            self.pump();
        }

        fn frame(&mut self, link: &LinkEvents, value: Value) {
            assert!(link.frame(value.to_string()));
            self.pump();
        }

        fn states(&self) -> Vec<ConnectionState> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    BusEvent::ConnectionStatusChanged(state) => Some(*state),
                    _ => None,
                })
                .collect()
        }

        fn published(&self, topic: Topic) -> Vec<BusEvent> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|event| event.topic() == topic)
                .cloned()
                .collect()
        }
    }

    fn sent(outbound: &mut UnboundedReceiver<String>) -> Value {
        let text = outbound.try_recv().expect("nothing sent");
        serde_json::from_str(&text).unwrap()
    }

    use ConnectionState::{Connected, Connecting, Disconnected};

    #[tokio::test(start_paused = true)]
    async fn open_sends_both_menu_requests() {
        let mut h = Harness::new();
        let link = h.connect();
        let mut outbound = h.open(&link);

        assert_eq!(h.states(), vec![Connecting, Connected]);
        assert_eq!(h.actor.attempts, 0);
        assert_eq!(sent(&mut outbound), json!({"type": "requestMenu"}));
        assert!(outbound.try_recv().is_err());

        let start = Instant::now();
        h.next_timer().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(2));

        let second = sent(&mut outbound);
        assert_eq!(second["action"], "getMenu");
        assert!(second["timestamp"].as_u64().unwrap() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn close_after_open_schedules_one_retry() {
        let mut h = Harness::new();
        let link = h.connect();
        let _outbound = h.open(&link);
        h.fail(&link);

        assert_eq!(h.states(), vec![Connecting, Connected, Disconnected]);
        assert_eq!(h.actor.attempts, 1);
        assert!(h.actor.retry.is_pending());
        assert!(!h.actor.follow_up.is_pending());

        let start = Instant::now();
        h.next_timer().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(h.states().last(), Some(&Connecting));
        h.next_link();
    }

    #[tokio::test(start_paused = true)]
    async fn orderly_close_retries_like_a_dropped_link() {
        let mut h = Harness::new();
        let link = h.connect();
        let _outbound = h.open(&link);
        assert!(link.closed(Closure::new(NORMAL_CLOSURE, "bye")));
        h.pump();

        assert_eq!(h.states(), vec![Connecting, Connected, Disconnected]);
        assert_eq!(h.actor.attempts, 1);
        assert!(h.actor.retry.is_pending());

        h.next_timer().await;
        let _fresh = h.next_link();

        // A late close from the old link must not touch the new attempt.
        assert!(link.closed(Closure::new(NORMAL_CLOSURE, "bye again")));
        h.pump();
        assert_eq!(h.states(), vec![Connecting, Connected, Disconnected, Connecting]);
        assert_eq!(h.actor.attempts, 1);
        assert!(!h.actor.retry.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn close_without_status_retries() {
        let mut h = Harness::new();
        let link = h.connect();
        let _outbound = h.open(&link);
        assert!(link.closed(Closure::from_frame(None)));
        h.pump();

        assert_eq!(h.states().last(), Some(&Disconnected));
        assert_eq!(h.actor.attempts, 1);
        assert!(h.actor.retry.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_menu_only_warns() {
        let mut h = Harness::new();
        let link = h.connect();
        let mut outbound = h.open(&link);
        sent(&mut outbound);

        // Follow-up request at 1s, then the watchdog at 5s.
        let start = Instant::now();
        h.next_timer().await;
        sent(&mut outbound);
        h.next_timer().await;
        assert!(start.elapsed() >= Duration::from_secs(5));

        assert!(!h.actor.menu_seen);
        assert!(!h.actor.watchdog.is_pending());
        assert_eq!(h.actor.state, Connected);
        assert_eq!(h.states(), vec![Connecting, Connected]);
        assert!(h.published(Topic::MenuUpdated).is_empty());
        assert!(!h.actor.retry.is_pending());
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_at_the_cap() {
        let mut h = Harness::new();
        let mut link = h.connect();

        for failure in 1..=10 {
            h.fail(&link);
            assert_eq!(h.actor.attempts, failure);
            if failure < 10 {
                assert!(h.actor.retry.is_pending());
                h.next_timer().await;
                link = h.next_link();
            }
        }

        assert!(!h.actor.retry.is_pending());
        assert!(h.links.try_recv().is_err());
        let states = h.states();
        assert_eq!(states.len(), 20);
        assert!(states.chunks(2).all(|pair| pair == [Connecting, Disconnected]));

        tokio::time::sleep(Duration::from_secs(60)).await;
        h.pump();
        assert_eq!(h.states().len(), 20);

        // An explicit connect starts over.
        h.handle(Input::Connect { address: None });
        assert_eq!(h.actor.attempts, 0);
        assert_eq!(h.states().last(), Some(&Connecting));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_open_resets_the_counter() {
        let mut h = Harness::new();
        let mut link = h.connect();
        for _ in 0..3 {
            h.fail(&link);
            h.next_timer().await;
            link = h.next_link();
        }
        assert_eq!(h.actor.attempts, 3);

        let _outbound = h.open(&link);
        assert_eq!(h.actor.attempts, 0);

        h.fail(&link);
        assert_eq!(h.actor.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_attempt_is_ignored() {
        let mut h = Harness::new();
        let stale = h.connect();
        let fresh = h.connect();
        assert_eq!(fresh.generation(), stale.generation() + 1);

        // Nothing from the first attempt may touch the state any more.
        let _ignored = h.open(&stale);
        h.fail(&stale);
        assert_eq!(h.states(), vec![Connecting, Connecting]);
        assert_eq!(h.actor.attempts, 0);
        assert!(!h.actor.retry.is_pending());

        let _outbound = h.open(&fresh);
        assert_eq!(h.states(), vec![Connecting, Connecting, Connected]);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_connect_cancels_pending_retry() {
        let mut h = Harness::new();
        let link = h.connect();
        h.fail(&link);
        assert!(h.actor.retry.is_pending());

        let fresh = h.connect();
        assert!(!h.actor.retry.is_pending());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(h.inbox.try_recv().is_err());
        assert!(h.links.try_recv().is_err());

        let _outbound = h.open(&fresh);
        assert_eq!(h.states(), vec![Connecting, Disconnected, Connecting, Connected]);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_classified_and_published() {
        let mut h = Harness::new();
        let link = h.connect();
        let _outbound = h.open(&link);

        let dishes = json!([{"id": 1, "name": {"fr": "Soupe"}}, {"id": 2, "name": {"fr": "Riz"}}]);
        h.frame(&link, json!({"type": "menuUpdate", "menu": dishes}));
        h.frame(&link, json!({"menu": dishes}));
        h.frame(&link, json!({"ingredients": [{"id": "tomato", "name": {"en": "Tomato"}}]}));
        h.frame(&link, json!({"qrCodes": {"menu": {"url": "https://m.test"}}}));
        h.frame(&link, json!({"hello": "world"}));

        let menus = h.published(Topic::MenuUpdated);
        assert_eq!(menus.len(), 2);
        assert_eq!(menus[0], menus[1]);
        match &menus[0] {
            BusEvent::MenuUpdated(dishes) => assert_eq!(dishes.len(), 2),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(h.published(Topic::IngredientsUpdated).len(), 1);
        assert_eq!(h.published(Topic::QrCodesUpdated).len(), 1);
        assert!(h.actor.menu_seen);
        assert!(!h.actor.watchdog.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_changes_nothing() {
        let mut h = Harness::new();
        let link = h.connect();
        let _outbound = h.open(&link);

        assert!(link.frame("{\"menu\": [oops"));
        h.pump();

        assert_eq!(h.states(), vec![Connecting, Connected]);
        assert_eq!(h.actor.state, Connected);
        assert!(h.published(Topic::MenuUpdated).is_empty());
        assert!(!h.actor.retry.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn requests_need_a_connection() {
        let mut h = Harness::new();
        assert!(matches!(
            h.actor.send(RequestKind::Ingredients),
            Err(RequestError::NotConnected)
        ));

        let link = h.connect();
        assert!(matches!(
            h.actor.send(RequestKind::Ingredients),
            Err(RequestError::NotConnected)
        ));

        let mut outbound = h.open(&link);
        sent(&mut outbound);
        h.actor.send(RequestKind::Ingredients).unwrap();
        assert_eq!(sent(&mut outbound)["action"], "getIngredients");
        h.actor.send(RequestKind::QrCodes).unwrap();
        assert_eq!(sent(&mut outbound)["action"], "getQRCodes");
    }

    #[tokio::test(start_paused = true)]
    async fn resume_only_reconnects_when_disconnected() {
        let mut h = Harness::new();
        let link = h.connect();
        let _outbound = h.open(&link);

        h.handle(Input::Resume);
        assert!(h.links.try_recv().is_err());

        h.fail(&link);
        assert!(h.actor.retry.is_pending());
        h.handle(Input::Resume);
        h.next_link();
        assert!(!h.actor.retry.is_pending());
        assert_eq!(h.actor.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_duplicate_states_without_explicit_connect() {
        let mut h = Harness::with_config(ClientConfig {
            address: Some(ADDR.into()),
            max_attempts: 4,
            ..ClientConfig::default()
        });
        let mut link = h.connect();
        let _outbound = h.open(&link);
        h.fail(&link);
        for _ in 0..3 {
            h.next_timer().await;
            link = h.next_link();
            h.fail(&link);
        }

        let states = h.states();
        assert!(states.windows(2).all(|pair| pair[0] != pair[1]));
        assert_eq!(states.last(), Some(&Disconnected));
        assert!(!h.actor.retry.is_pending());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let frame = "é".repeat(300);
        assert_eq!(preview(&frame).chars().count(), FRAME_PREVIEW);
        assert_eq!(preview("short"), "short");
    }
}
