//! PLEB — an in-process publish/subscribe and request/response message
//! bus routed through a hierarchical namespace of string-delimited
//! topics.
//!
//! Clients address a topic by path (`/sensors/temp/0`) and the bus
//! dispatches to the single registered [`Service`] at that path
//! (request/response, falling back toward the root) or to any number
//! of [`Subscription`]s (event broadcast, propagating toward the
//! root). See [`dispatch`] for the routing rules and [`Topic`] for the
//! namespace itself.

mod error;
mod guard;
mod message;
mod method;
mod pool;
mod relay;
mod request;
mod root;
mod service;
mod slot;
mod status;
mod subscription;
mod topic;
mod trie;
mod value;

pub mod dispatch;

pub use error::Error;
pub use message::{Filtering, Handling, Message};
pub use method::Method;
pub use relay::{EventRelay, ServiceRelay};
pub use request::{ClientEndpoint, Request, Response};
pub use root::{register_conversion, root};
pub use service::{Service, ServiceCapabilities, ServiceHandle};
pub use status::Status;
pub use subscription::{Subscription, SubscriptionHandle};
pub use topic::Topic;
pub use value::Value;

/// Crate-wide result alias for fallible eager-handle operations.
pub type Result<T> = std::result::Result<T, Error>;
