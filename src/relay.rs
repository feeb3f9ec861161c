//! Defines [`ServiceRelay`] and [`EventRelay`], the two forwarder
//! shapes (§4.H): a service whose handler retargets the request at a
//! preconfigured topic and re-enters dispatch, and a subscription
//! whose handler re-publishes the event at a preconfigured topic.
//!
//! Both unconditionally refuse a target equal to their own source (the
//! zero-hop case would re-enter itself on every dispatch, looping
//! regardless of any filtering mask), and also refuse construction
//! when the target is a strict descendant of the source and the relay
//! accepts recursive messages — that combination would otherwise feed
//! an ancestor-walk event or request straight back into the subtree it
//! came from, forever.

use crate::dispatch;
use crate::message::{Filtering, Message};
use crate::service::{Service, ServiceHandle};
use crate::subscription::{Subscription, SubscriptionHandle};
use crate::topic::Topic;

/// A service whose handler moves an incoming request to `target` and
/// re-enters routing there, rather than handling it itself.
pub struct ServiceRelay {
    inner: ServiceHandle,
}

impl ServiceRelay {
    /// Installs a relay at `source`, forwarding to `target`.
    ///
    /// Returns `Ok(None)` if `source` already has a service installed
    /// (same contract as [`Service::install`]). Returns `Err` for a
    /// null topic; for `target == source` (a zero-hop relay would
    /// re-enter itself on every dispatch, unconditionally); and when
    /// `source` is a strict ancestor of `target` and the relay would
    /// accept recursive messages — that shape loops forever once the
    /// ancestor walk reaches `target` and climbs back past `source`.
    pub fn install(source: &Topic, target: Topic, ignoring: Filtering) -> crate::Result<Option<ServiceRelay>> {
        if source.is_null() || target.is_null() {
            return Err(crate::Error::NullTopic);
        }
        if source == &target {
            tracing::warn!("service relay refused: target is the same topic as source");
            return Err(crate::Error::RelayLoop);
        }
        if source.is_ancestor_of(&target)? && !ignoring.contains(Filtering::RECURSIVE) {
            tracing::warn!("service relay refused: target is a recursive descendant of source");
            return Err(crate::Error::RelayLoop);
        }
        let installed = Service::builder().ignoring(ignoring).install(source, move |req| {
            req.retarget(target.clone());
            if let Err(error) = dispatch::redispatch(req) {
                tracing::warn!(?error, "service relay forwarding failed");
            }
        })?;
        Ok(installed.map(|inner| ServiceRelay { inner }))
    }

    /// The relay's source topic.
    pub fn topic(&self) -> &Topic {
        self.inner.topic()
    }
}

/// A subscription whose handler re-publishes an incoming event at
/// `target`, carrying its code and filtering forward. The value, if
/// any, is dropped: [`crate::value::Value`] has no clone vtable, and a
/// subscription handler only ever observes a `&Message`, so there is no
/// way to move the original out and still let other subscribers at the
/// source see it.
pub struct EventRelay {
    inner: SubscriptionHandle,
}

impl EventRelay {
    /// Installs a relay at `source`, re-publishing every accepted event
    /// at `target`.
    ///
    /// Returns `Err` for a null topic; for `target == source`; and when
    /// `source` is a strict ancestor of `target` and the relay would
    /// accept recursive messages, for the same reasons as
    /// [`ServiceRelay::install`].
    pub fn install(source: &Topic, target: Topic, ignoring: Filtering) -> crate::Result<EventRelay> {
        if source.is_null() || target.is_null() {
            return Err(crate::Error::NullTopic);
        }
        if source == &target {
            tracing::warn!("event relay refused: target is the same topic as source");
            return Err(crate::Error::RelayLoop);
        }
        if source.is_ancestor_of(&target)? && !ignoring.contains(Filtering::RECURSIVE) {
            tracing::warn!("event relay refused: target is a recursive descendant of source");
            return Err(crate::Error::RelayLoop);
        }
        let inner = Subscription::builder().ignoring(ignoring).install(source, move |message| {
            let forwarded = Message::new(target.clone(), message.code())
                .with_filtering(message.filtering())
                .with_handling(message.handling());
            dispatch::publish(forwarded);
        })?;
        Ok(EventRelay { inner })
    }

    /// The relay's source topic.
    pub fn topic(&self) -> &Topic {
        self.inner.topic()
    }
}
