//! Menu feed client.
//!
//! The [`ConnectionManager`] keeps one WebSocket connection to the menu
//! server alive, retrying with a fixed delay up to a cap. Inbound frames go
//! through [`classify`] and the results are published on an [`EventBus`];
//! consumers subscribe to topics and never touch the connection.
//!
//! ```no_run
//! use menuboard_client::{ClientConfig, ConnectionManager, EventBus, MenuStore, WsConnector};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), menuboard_client::RequestError> {
//! let bus = Arc::new(EventBus::new());
//! let menu = MenuStore::new();
//! menu.attach(&bus);
//!
//! let (manager, _task) = ConnectionManager::spawn(ClientConfig::default(), WsConnector, bus);
//! manager.connect_default()?;
//! # Ok(())
//! # }
//! ```

mod bus;
pub mod classify;
mod config;
mod consumers;
mod manager;
mod timer;
mod transport;

pub use bus::{BusEvent, EventBus, Subscriber, SubscriberError, Subscription, Topic};
pub use classify::{Classified, DecodeError, Shape};
pub use config::{ClientConfig, ConfigError, Endpoints, Environment};
pub use consumers::{ALL_CATEGORIES, IngredientCache, MenuStore};
pub use manager::{ConnectionManager, RequestError};
pub use transport::{
    Closure, Connector, LinkEvents, TransportError, WsConnector, describe_close_code,
};

pub use menuboard_core::ConnectionState;
