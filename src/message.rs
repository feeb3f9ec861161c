//! Defines the message envelope's filtering and handling bit fields,
//! and [`Message`] itself, the common envelope shared by requests,
//! responses, and events.

use crate::topic::Topic;
use crate::value::Value;

bitflags::bitflags! {
    /// Classification bits carried by every message, consulted by
    /// receivers to decide whether to accept it. A receiver accepts a
    /// message iff `(message.filtering() & receiver.ignored()).is_empty()`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Filtering: u16 {
        /// An ordinary application message.
        const REGULAR = 1 << 0;
        /// Arrived from an external network (unused by the in-process core;
        /// reserved for a future remote bridge).
        const REMOTE = 1 << 6;
        /// Marked do-not-export.
        const INTERNAL = 1 << 7;
        /// Tracing-class, typically ignored by ordinary receivers.
        const LOGGING = 1 << 8;
        /// Raised by the dispatch engine when a subscriber handler panics.
        const SUBSCRIBER_EXCEPTION = 1 << 12;
        /// Subscription lifecycle notification.
        const SUBSCRIPTION_STATUS = 1 << 13;
        /// Service lifecycle notification.
        const SERVICE_STATUS = 1 << 14;
        /// Route to ancestor topics after (or instead of) local delivery.
        const RECURSIVE = 1 << 15;
    }
}

impl Filtering {
    /// The filtering word a freshly constructed message carries unless
    /// overridden: `REGULAR | RECURSIVE`.
    pub fn default_message() -> Filtering {
        Filtering::REGULAR | Filtering::RECURSIVE
    }

    /// The default receiver-ignore mask: bits 8-14 (`0x7F00`).
    pub fn default_receiver_ignore() -> Filtering {
        Filtering::from_bits_retain(0x7F00)
    }

    /// The default service-ignore mask: receiver-ignore plus `RECURSIVE`.
    pub fn default_service_ignore() -> Filtering {
        Filtering::default_receiver_ignore() | Filtering::RECURSIVE
    }

    /// The default subscriber-ignore mask: receiver-ignore (accepts
    /// `RECURSIVE`).
    pub fn default_subscriber_ignore() -> Filtering {
        Filtering::default_receiver_ignore()
    }

    /// The default client-ignore mask: none.
    pub fn default_client_ignore() -> Filtering {
        Filtering::empty()
    }

    /// `true` if a receiver ignoring `ignored` would accept a message
    /// carrying `self` as its filtering word.
    pub fn accepted_by(self, ignored: Filtering) -> bool {
        (self & ignored).is_empty()
    }
}

bitflags::bitflags! {
    /// Requirements a handler must satisfy to process a message, and
    /// (symmetrically) the capabilities a receiver advertises that it
    /// supports. Bits 0-7 are reserved for application use and are
    /// passed through unchanged by the dispatch engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Handling: u16 {
        /// Handling must complete within a bounded time.
        const REALTIME = 1 << 10;
        /// Synchronous handling only; deferral is disallowed.
        const IMMEDIATE = 1 << 11;
        /// The value may not be consumed (it is needed after the call).
        const NO_MOVING = 1 << 14;
        /// The value may not be cloned.
        const NO_COPYING = 1 << 15;
    }
}

impl Handling {
    const APPLICATION_MASK: u16 = 0x00FF;

    /// The subset of `self` drawn from the four named capability bits,
    /// ignoring the application-reserved low byte.
    pub fn core(self) -> Handling {
        self.intersection(Handling::all())
    }

    /// The application-reserved low byte, passed through unchanged.
    pub fn application_bits(self) -> u8 {
        (self.bits() & Self::APPLICATION_MASK) as u8
    }

    /// `true` if every core requirement in `self` is covered by
    /// `capabilities`.
    pub fn satisfied_by(self, capabilities: Handling) -> bool {
        self.core().difference(capabilities.core()).is_empty()
    }
}

/// The common envelope carried through dispatch: a destination topic,
/// a numeric code (method for requests, status for responses/events),
/// the filtering classification, the handling requirements, and an
/// optional erased value.
pub struct Message {
    topic: Topic,
    code: u16,
    filtering: Filtering,
    handling: Handling,
    value: Option<Value>,
}

impl Message {
    /// Creates a new message addressed at `topic`.
    pub fn new(topic: Topic, code: u16) -> Self {
        Message {
            topic,
            code,
            filtering: Filtering::default_message(),
            handling: Handling::empty(),
            value: None,
        }
    }

    /// Sets the filtering word, replacing the default.
    pub fn with_filtering(mut self, filtering: Filtering) -> Self {
        self.filtering = filtering;
        self
    }

    /// Sets the handling requirements.
    pub fn with_handling(mut self, handling: Handling) -> Self {
        self.handling = handling;
        self
    }

    /// Attaches a value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// The destination topic.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// The numeric code (method or status).
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The filtering word.
    pub fn filtering(&self) -> Filtering {
        self.filtering
    }

    /// The handling requirements.
    pub fn handling(&self) -> Handling {
        self.handling
    }

    /// Borrows the attached value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Moves the attached value out, if any.
    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    /// `true` if the recursive bit is set.
    pub fn is_recursive(&self) -> bool {
        self.filtering.contains(Filtering::RECURSIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message_is_regular_and_recursive() {
        let filtering = Filtering::default_message();
        assert!(filtering.contains(Filtering::REGULAR));
        assert!(filtering.contains(Filtering::RECURSIVE));
    }

    #[test]
    fn receiver_accepts_iff_no_overlap_with_ignored() {
        let msg = Filtering::default_message();
        assert!(msg.accepted_by(Filtering::default_subscriber_ignore()));
        let logging = Filtering::LOGGING;
        assert!(!logging.accepted_by(Filtering::default_subscriber_ignore()));
    }

    #[test]
    fn service_ignore_excludes_recursive_by_default() {
        let ignore = Filtering::default_service_ignore();
        assert!(ignore.contains(Filtering::RECURSIVE));
        assert!(!Filtering::default_message().accepted_by(ignore));
    }

    #[test]
    fn handling_subset_check_ignores_application_bits() {
        let requirement = Handling::REALTIME | Handling::from_bits_retain(0x0F);
        let capability = Handling::REALTIME;
        assert!(requirement.satisfied_by(capability));
    }

    #[test]
    fn handling_subset_check_rejects_missing_capability() {
        let requirement = Handling::NO_COPYING;
        let capability = Handling::REALTIME;
        assert!(!requirement.satisfied_by(capability));
    }
}
