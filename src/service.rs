//! Defines [`Service`], the builder for installing the single request
//! handler bound to a topic, and [`ServiceHandle`], the live
//! registration token returned by [`Service::install`].

use std::sync::Arc;

use crate::message::{Filtering, Handling};
use crate::request::Request;
use crate::topic::Topic;
use crate::Error;

/// The handling capabilities a service advertises that it supports
/// (no-copy, no-move, immediate, realtime — the same four bits
/// [`Handling`] carries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceCapabilities(Handling);

impl ServiceCapabilities {
    /// A service that claims none of the four capability bits.
    pub fn none() -> Self {
        ServiceCapabilities(Handling::empty())
    }

    /// Adds `bits` to the claimed capability set.
    pub fn with(mut self, bits: Handling) -> Self {
        self.0 |= bits.core();
        self
    }

    pub(crate) fn satisfies(self, required: Handling) -> bool {
        required.satisfied_by(self.0)
    }
}

pub(crate) struct ServiceInner {
    topic: Topic,
    handler: Box<dyn Fn(&mut Request) + Send + Sync>,
    ignored: Filtering,
    capabilities: ServiceCapabilities,
}

impl ServiceInner {
    pub(crate) fn topic(&self) -> &Topic {
        &self.topic
    }

    /// `true` iff this service's filtering-ignore mask accepts
    /// `filtering` (the recursive bit should already have been
    /// stripped by the caller for a local-node check).
    pub(crate) fn accepts_filtering(&self, filtering: Filtering) -> bool {
        filtering.accepted_by(self.ignored)
    }

    /// `true` iff this service does not ignore recursive messages —
    /// the opt-in an ancestor-fallback candidate must make.
    pub(crate) fn accepts_recursive(&self) -> bool {
        !self.ignored.contains(Filtering::RECURSIVE)
    }

    /// `true` iff this service's claimed capabilities cover
    /// `handling`'s requirements.
    pub(crate) fn satisfies_handling(&self, handling: Handling) -> bool {
        self.capabilities.satisfies(handling)
    }

    pub(crate) fn invoke(&self, request: &mut Request) {
        (self.handler)(request)
    }
}

/// A builder for the single service installed at a topic. Construct
/// with [`Service::builder`], configure, then [`Service::install`].
pub struct Service {
    ignored: Filtering,
    capabilities: ServiceCapabilities,
}

impl Service {
    /// A service builder with the default ignore mask (events and the
    /// recursive cross-cutting flag) and no claimed capabilities.
    pub fn builder() -> Service {
        Service { ignored: Filtering::default_service_ignore(), capabilities: ServiceCapabilities::none() }
    }

    /// Overrides the filtering-ignore mask.
    pub fn ignoring(mut self, mask: Filtering) -> Self {
        self.ignored = mask;
        self
    }

    /// Overrides the claimed handling capabilities.
    pub fn capable_of(mut self, capabilities: ServiceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Installs `handler` as the service at `topic`, materializing the
    /// topic's node if it doesn't yet exist.
    ///
    /// Returns `Ok(None)` iff a service is already installed at this
    /// topic (per P6, only one `try_install_service` racing against
    /// others on the same empty node wins); returns `Err` only for a
    /// null topic handle.
    pub fn install(
        self,
        topic: &Topic,
        handler: impl Fn(&mut Request) + Send + Sync + 'static,
    ) -> crate::Result<Option<ServiceHandle>> {
        let node = topic.materialized_node()?;
        let bound_topic = Topic::from_node(Arc::clone(&node));
        let Service { ignored, capabilities } = self;
        let inner = node.payload().try_install_service(|| ServiceInner {
            topic: bound_topic,
            handler: Box::new(handler),
            ignored,
            capabilities,
        });
        match inner {
            Some(inner) => {
                tracing::trace!(topic = %node.segment(), "service installed");
                Ok(Some(ServiceHandle { inner }))
            }
            None => {
                tracing::debug!(topic = %node.segment(), "service install refused: already occupied");
                Ok(None)
            }
        }
    }
}

/// The live registration of a service. Dropping it (once no other
/// strong reference remains, e.g. inside an in-flight dispatch) frees
/// the topic's service slot for a future installer.
pub struct ServiceHandle {
    inner: Arc<ServiceInner>,
}

impl ServiceHandle {
    /// The topic this service is bound to.
    pub fn topic(&self) -> &Topic {
        self.inner.topic()
    }

    pub(crate) fn inner(&self) -> &Arc<ServiceInner> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_then_duplicate_install_is_refused() {
        let topic = Topic::eager("/svc/test-duplicate");
        let first = Service::builder().install(&topic, |req| req.respond(crate::Response::new(crate::Status::OK))).unwrap();
        assert!(first.is_some());
        let second = Service::builder().install(&topic, |req| req.respond(crate::Response::new(crate::Status::OK))).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn install_succeeds_again_after_first_is_dropped() {
        let topic = Topic::eager("/svc/test-reinstall");
        let first = Service::builder().install(&topic, |_| {}).unwrap().unwrap();
        drop(first);
        let second = Service::builder().install(&topic, |_| {}).unwrap();
        assert!(second.is_some());
    }

    #[test]
    fn install_on_null_topic_fails() {
        let result = Service::builder().install(&Topic::null(), |_| {});
        assert!(result.is_err());
    }

    #[test]
    fn capabilities_cover_required_subset() {
        let caps = ServiceCapabilities::none().with(Handling::REALTIME);
        assert!(caps.satisfies(Handling::REALTIME));
        assert!(!caps.satisfies(Handling::NO_COPYING));
    }
}
