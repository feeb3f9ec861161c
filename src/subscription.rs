//! Defines [`Subscription`], the builder for registering an event
//! handler at a topic, and [`SubscriptionHandle`], the live
//! registration token. Same shape as [`crate::service::Service`], with
//! different defaults: subscriptions accept recursive messages and
//! reject internal PLEB status events unless opted in.

use std::sync::{Arc, Mutex};

use crate::message::{Filtering, Message};
use crate::topic::Topic;

pub(crate) struct SubscriptionInner {
    topic: Topic,
    handler: Box<dyn Fn(&Message) + Send + Sync>,
    ignored: Filtering,
}

impl SubscriptionInner {
    pub(crate) fn topic(&self) -> &Topic {
        &self.topic
    }

    /// `true` iff this subscription's filtering-ignore mask accepts
    /// `filtering`.
    pub(crate) fn accepts(&self, filtering: Filtering) -> bool {
        filtering.accepted_by(self.ignored)
    }

    /// `true` iff this subscription does not ignore recursive
    /// messages — the opt-in a relay target must make to be safely
    /// refused when it would loop back on its own source.
    pub(crate) fn accepts_recursive(&self) -> bool {
        !self.ignored.contains(Filtering::RECURSIVE)
    }

    pub(crate) fn invoke(&self, message: &Message) {
        (self.handler)(message)
    }
}

/// A builder for one of a topic's subscriptions. Construct with
/// [`Subscription::builder`], configure, then [`Subscription::install`].
pub struct Subscription {
    ignored: Filtering,
}

impl Subscription {
    /// A subscription builder with the default ignore mask: the
    /// receiver-ignore bits (logging, subscriber-exception,
    /// subscription-status, service-status), accepting recursive
    /// messages.
    pub fn builder() -> Subscription {
        Subscription { ignored: Filtering::default_subscriber_ignore() }
    }

    /// Overrides the filtering-ignore mask, e.g. to additionally
    /// observe `SUBSCRIBER_EXCEPTION`-flagged meta-events.
    pub fn ignoring(mut self, mask: Filtering) -> Self {
        self.ignored = mask;
        self
    }

    /// Installs `handler` as a subscription at `topic`, materializing
    /// the topic's node if it doesn't yet exist. Always succeeds
    /// except for a null topic handle.
    pub fn install(
        self,
        topic: &Topic,
        handler: impl Fn(&Message) + Send + Sync + 'static,
    ) -> crate::Result<SubscriptionHandle> {
        let node = topic.materialized_node()?;
        let bound_topic = Topic::from_node(Arc::clone(&node));
        let Subscription { ignored } = self;
        // `Pool::emplace` requires `Fn`, but a subscription is built
        // exactly once; box it behind a take-once cell rather than
        // rebuild it on every scanned slot.
        let built = Mutex::new(Some(SubscriptionInner {
            topic: bound_topic,
            handler: Box::new(handler),
            ignored,
        }));
        let inner = node.payload().install_subscription(move || {
            built
                .lock()
                .expect("subscription build lock poisoned")
                .take()
                .expect("subscription constructor invoked more than once")
        });
        tracing::trace!("subscription installed");
        Ok(SubscriptionHandle { inner })
    }
}

/// The live registration of a subscription. Dropping it removes the
/// subscription from future dispatch once any in-flight dispatcher
/// iterator pinning it also releases its reference (P2).
pub struct SubscriptionHandle {
    inner: Arc<SubscriptionInner>,
}

impl SubscriptionHandle {
    /// The topic this subscription is bound to.
    pub fn topic(&self) -> &Topic {
        self.inner.topic()
    }

    pub(crate) fn inner(&self) -> &Arc<SubscriptionInner> {
        &self.inner
    }
}
