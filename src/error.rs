//! Defines [`Error`], the small set of conditions the core itself can
//! raise (as opposed to the status codes it synthesizes onto a
//! response — see [`crate::status::Status`]).

use std::fmt;

/// A condition raised by the core with no topic/response to attach a
/// status code to, or raised at a call site with no client endpoint to
/// deliver a synthesized response instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A request walked past the root with no accepting service.
    ServiceNotFound,
    /// A topic-string lookup demanded existence and the subtree is
    /// missing.
    NoSuchTopic,
    /// A handler's expected type did not match the supplied value.
    IncompatibleType,
    /// A message's handling requirements were not satisfiable and no
    /// rescuing conversion was installed.
    HandlingUnavailable,
    /// A subscriber handler panicked during event dispatch.
    SubscriberException,
    /// An eager handle constructed from null was used for an
    /// operation.
    NullTopic,
    /// A relay was refused construction because its target is a
    /// recursive descendant of its source, which would loop forever.
    RelayLoop,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Error::ServiceNotFound => "no accepting service found along the ancestor chain",
            Error::NoSuchTopic => "no such topic",
            Error::IncompatibleType => "value is not of the type the handler expects",
            Error::HandlingUnavailable => "message handling requirements cannot be satisfied",
            Error::SubscriberException => "a subscriber handler panicked",
            Error::NullTopic => "operation attempted on a null topic handle",
            Error::RelayLoop => "relay target is a recursive descendant of its source",
        };
        f.write_str(message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_non_empty_for_every_variant() {
        for err in [
            Error::ServiceNotFound,
            Error::NoSuchTopic,
            Error::IncompatibleType,
            Error::HandlingUnavailable,
            Error::SubscriberException,
            Error::NullTopic,
            Error::RelayLoop,
        ] {
            assert!(!err.to_string().is_empty());
        }
    }
}
