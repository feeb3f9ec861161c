//! Defines [`Value`], the erased single-value container carried by a
//! [`crate::message::Message`], and the conversion function type used
//! to bridge mismatched types between a client and a service.
//!
//! Both are external collaborators per the core's own accounting: PLEB
//! treats a value as opaque and only needs typed inspection, move-out,
//! and — when a handler expects a different type than the client
//! supplied — a registry lookup. Neither grows beyond that; the
//! convenience sugar built on top (typed request helpers, an `any`-like
//! reflection surface) is out of scope for the core.

use std::any::{Any, TypeId};
use std::fmt;

/// An erased single value, carried directly or (conceptually) by
/// reference.
pub struct Value(Box<dyn Any + Send + Sync>);

impl Value {
    /// Wraps `value` as an erased [`Value`].
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Value(Box::new(value))
    }

    /// Returns the erased value's concrete [`TypeId`].
    pub fn type_id(&self) -> TypeId {
        (*self.0).type_id()
    }

    /// Borrows the contained value as `T`, if it holds one.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Moves the contained value out as `T`, if it holds one.
    /// Returns the original [`Value`] on mismatch so the caller can try
    /// another interpretation (e.g. via the conversion registry).
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        match self.0.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(boxed) => Err(Value(boxed)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value").field("type_id", &self.type_id()).finish()
    }
}

/// A type-erased conversion from one concrete type to another,
/// registered in the [`crate::root::register_conversion`] table.
pub type ConversionFn = dyn Fn(Value) -> Option<Value> + Send + Sync;

/// Wraps a concrete `Fn(S) -> T` as a [`ConversionFn`] operating on
/// erased [`Value`]s.
pub fn erase_conversion<S, T>(f: impl Fn(S) -> T + Send + Sync + 'static) -> Box<ConversionFn>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    Box::new(move |value: Value| value.downcast::<S>().ok().map(|s| Value::new(f(s))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_ref_sees_the_right_type() {
        let value = Value::new(42u32);
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
        assert_eq!(value.downcast_ref::<String>(), None);
    }

    #[test]
    fn downcast_move_out_preserves_value_on_mismatch() {
        let value = Value::new(String::from("hi"));
        let value = value.downcast::<u32>().unwrap_err();
        assert_eq!(value.downcast::<String>().unwrap(), "hi");
    }

    #[test]
    fn erased_conversion_round_trips() {
        let conv = erase_conversion(|n: u32| n.to_string());
        let out = conv(Value::new(7u32)).unwrap();
        assert_eq!(out.downcast::<String>().unwrap(), "7");
    }

    #[test]
    fn erased_conversion_rejects_wrong_source_type() {
        let conv = erase_conversion(|n: u32| n.to_string());
        assert!(conv(Value::new(String::from("nope"))).is_none());
    }
}
