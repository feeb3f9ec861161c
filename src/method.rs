//! Defines [`Method`], the small enumeration of request methods
//! encoded in a request message's `code` field.

use num_derive::{FromPrimitive, ToPrimitive};

/// A request method, encoded in the low bits of a request [`crate::message::Message::code`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum Method {
    /// Retrieve a representation of the target topic.
    Get = 1,
    /// Like `Get`, but the response carries no value.
    Head,
    /// Query the handling/capability requirements accepted by a topic.
    Options,
    /// Replace the target topic's state with the supplied value.
    Put,
    /// Submit a value for the target topic to process.
    Post,
    /// Apply a partial modification to the target topic's state.
    Patch,
    /// Remove the target topic's association with its current state.
    Delete,
}

impl Method {
    /// Recovers a [`Method`] from its wire code, if it names one.
    pub fn from_code(code: u16) -> Option<Self> {
        num_traits::FromPrimitive::from_u16(code)
    }

    /// The wire code for this method.
    pub fn code(self) -> u16 {
        num_traits::ToPrimitive::to_u16(&self).expect("Method fits in u16")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips() {
        for method in [
            Method::Get,
            Method::Head,
            Method::Options,
            Method::Put,
            Method::Post,
            Method::Patch,
            Method::Delete,
        ] {
            assert_eq!(Method::from_code(method.code()), Some(method));
        }
    }

    #[test]
    fn get_is_assigned_code_one() {
        assert_eq!(Method::Get.code(), 1);
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(Method::from_code(0), None);
        assert_eq!(Method::from_code(9999), None);
    }
}
