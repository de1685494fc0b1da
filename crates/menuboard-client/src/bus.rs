//! In-process publish/subscribe.
//!
//! Delivery is synchronous: `publish` calls every live subscriber of the
//! event's topic, in registration order, before returning. The bus only keeps
//! weak references; a subscriber stops receiving events once its owner drops
//! it.

use menuboard_core::{ConnectionState, Dish, Ingredient, QrCodes};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Named channel on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ConnectionStatus,
    MenuUpdated,
    IngredientsUpdated,
    QrCodesUpdated,
}

impl Topic {
    pub fn name(&self) -> &'static str {
        match self {
            Topic::ConnectionStatus => "connection:status-changed",
            Topic::MenuUpdated => "menu:updated",
            Topic::IngredientsUpdated => "ingredients:updated",
            Topic::QrCodesUpdated => "qrcodes:updated",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A notification carried through the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    ConnectionStatusChanged(ConnectionState),
    MenuUpdated(Arc<Vec<Dish>>),
    IngredientsUpdated(Arc<Vec<Ingredient>>),
    QrCodesUpdated(Arc<QrCodes>),
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::ConnectionStatusChanged(_) => Topic::ConnectionStatus,
            BusEvent::MenuUpdated(_) => Topic::MenuUpdated,
            BusEvent::IngredientsUpdated(_) => Topic::IngredientsUpdated,
            BusEvent::QrCodesUpdated(_) => Topic::QrCodesUpdated,
        }
    }
}

/// Error returned by a subscriber that could not handle an event.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct SubscriberError(Box<dyn Error + Send + Sync>);

impl SubscriberError {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

/// Something that reacts to bus events.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &BusEvent) -> Result<(), SubscriberError>;
}

impl<F> Subscriber for F
where
    F: Fn(&BusEvent) -> Result<(), SubscriberError> + Send + Sync,
{
    fn on_event(&self, event: &BusEvent) -> Result<(), SubscriberError> {
        self(event)
    }
}

/// Keeps a closure subscriber registered. Dropping it unsubscribes.
#[must_use = "the subscription ends when this handle is dropped"]
pub struct Subscription {
    _subscriber: Arc<dyn Subscriber>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct EventBus {
    topics: Mutex<HashMap<Topic, Vec<Weak<dyn Subscriber>>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_map()
            .entries(topics.iter().map(|(topic, subs)| (topic.name(), subs.len())))
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for `topic`. The bus holds it weakly: delivery
    /// stops once the last `Arc` is dropped.
    pub fn subscribe<S: Subscriber + 'static>(&self, topic: Topic, subscriber: &Arc<S>) {
        let weak: Weak<dyn Subscriber> = Arc::downgrade(subscriber) as Weak<dyn Subscriber>;
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic)
            .or_default()
            .push(weak);
    }

    /// Register a closure. It stays subscribed while the returned handle lives.
    pub fn subscribe_fn<F>(&self, topic: Topic, f: F) -> Subscription
    where
        F: Fn(&BusEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        let subscriber = Arc::new(f);
        self.subscribe(topic, &subscriber);
        Subscription {
            _subscriber: subscriber,
        }
    }

    /// Deliver `event` to the subscribers of its topic. Returns how many
    /// handled it successfully. A failing or panicking subscriber is logged
    /// and skipped; the rest still receive the event.
    pub fn publish(&self, event: BusEvent) -> usize {
        let topic = event.topic();
        let targets: Vec<Arc<dyn Subscriber>> = {
            let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(subscribers) = topics.get_mut(&topic) else {
                return 0;
            };
            subscribers.retain(|s| s.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        let mut delivered = 0;
        for subscriber in targets {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_event(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => tracing::warn!(%topic, error = %e, "subscriber failed"),
                Err(_) => tracing::warn!(%topic, "subscriber panicked"),
            }
        }
        delivered
    }

    /// Number of live subscribers for `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .map_or(0, |subs| subs.iter().filter(|s| s.strong_count() > 0).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: ConnectionState) -> BusEvent {
        BusEvent::ConnectionStatusChanged(state)
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<_> = (0..3)
            .map(|i| {
                let log = log.clone();
                bus.subscribe_fn(Topic::ConnectionStatus, move |_| {
                    log.lock().unwrap().push(i);
                    Ok(())
                })
            })
            .collect();

        assert_eq!(bus.publish(status(ConnectionState::Connecting)), 3);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn only_matching_topic() {
        let bus = EventBus::new();
        let _sub = bus.subscribe_fn(Topic::MenuUpdated, |_| panic!("wrong topic"));
        assert_eq!(bus.publish(status(ConnectionState::Connected)), 0);
    }

    #[test]
    fn failing_subscriber_is_isolated() {
        let bus = EventBus::new();
        let hits = Arc::new(Mutex::new(0));

        let _failing = bus.subscribe_fn(Topic::ConnectionStatus, |_| {
            Err(SubscriberError::new("cannot render"))
        });
        let _panicking = bus.subscribe_fn(Topic::ConnectionStatus, |_| panic!("boom"));
        let counter = hits.clone();
        let _ok = bus.subscribe_fn(Topic::ConnectionStatus, move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        assert_eq!(bus.publish(status(ConnectionState::Disconnected)), 1);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn dropped_subscriber_stops_receiving() {
        let bus = EventBus::new();
        let sub = bus.subscribe_fn(Topic::ConnectionStatus, |_| Ok(()));
        assert_eq!(bus.subscriber_count(Topic::ConnectionStatus), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(Topic::ConnectionStatus), 0);
        assert_eq!(bus.publish(status(ConnectionState::Connected)), 0);
    }

    #[test]
    fn subscriber_may_publish_reentrantly() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = bus.clone();
        let _relay = bus.subscribe_fn(Topic::ConnectionStatus, move |event| {
            if let BusEvent::ConnectionStatusChanged(ConnectionState::Connected) = event {
                inner.publish(BusEvent::MenuUpdated(Arc::new(Vec::new())));
            }
            Ok(())
        });
        let log = seen.clone();
        let _menu = bus.subscribe_fn(Topic::MenuUpdated, move |event| {
            log.lock().unwrap().push(event.topic());
            Ok(())
        });

        bus.publish(status(ConnectionState::Connected));
        assert_eq!(*seen.lock().unwrap(), vec![Topic::MenuUpdated]);
    }
}
