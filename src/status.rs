//! Defines [`Status`], the HTTP-style three-digit status code carried
//! by responses and events. The core treats status as an opaque
//! integer plus a handful of categorization predicates; it assigns no
//! further meaning to specific codes beyond the handful it synthesizes
//! itself (see [`crate::dispatch`]).

use std::fmt;

/// An HTTP-style status code. `0` is reserved for "unset".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Status(pub u16);

impl Status {
    /// The reserved "unset" status.
    pub const UNSET: Status = Status(0);

    /// `200 OK`.
    pub const OK: Status = Status(200);
    /// `404 Not Found`.
    pub const NOT_FOUND: Status = Status(404);
    /// `415 Unsupported Media Type` — synthesized for `incompatible-type`.
    pub const UNSUPPORTED_MEDIA_TYPE: Status = Status(415);
    /// `500 Internal Server Error` — synthesized when a service returns
    /// without responding.
    pub const INTERNAL_SERVER_ERROR: Status = Status(500);
    /// `501 Not Implemented` — synthesized for `handling-unavailable`.
    pub const NOT_IMPLEMENTED: Status = Status(501);
    /// `503 Service Unavailable` — synthesized for `service-not-found`.
    pub const SERVICE_UNAVAILABLE: Status = Status(503);

    /// `true` for `0`.
    pub fn is_unset(self) -> bool {
        self.0 == 0
    }

    /// `true` for `1xx`.
    pub fn is_informational(self) -> bool {
        (100..200).contains(&self.0)
    }

    /// `true` for `2xx`.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    /// `true` for `3xx`.
    pub fn is_redirection(self) -> bool {
        (300..400).contains(&self.0)
    }

    /// `true` for `4xx`.
    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.0)
    }

    /// `true` for `5xx`.
    pub fn is_server_error(self) -> bool {
        (500..600).contains(&self.0)
    }

    /// `true` for `4xx` or `5xx`.
    pub fn is_error(self) -> bool {
        self.is_client_error() || self.is_server_error()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_by_leading_digit() {
        assert!(Status(100).is_informational());
        assert!(Status::OK.is_success());
        assert!(Status(301).is_redirection());
        assert!(Status::NOT_FOUND.is_client_error());
        assert!(Status::INTERNAL_SERVER_ERROR.is_server_error());
    }

    #[test]
    fn unset_is_not_any_category() {
        assert!(Status::UNSET.is_unset());
        assert!(!Status::UNSET.is_success());
        assert!(!Status::UNSET.is_error());
    }

    #[test]
    fn error_covers_client_and_server() {
        assert!(Status::NOT_FOUND.is_error());
        assert!(Status::SERVICE_UNAVAILABLE.is_error());
        assert!(!Status::OK.is_error());
    }
}
