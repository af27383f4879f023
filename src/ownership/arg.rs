//! Provenance-tagged argument slots.

use std::mem;

use crate::value::Value;

use super::{Effect, Provenance};

/// One bundle position: a value together with how the receiver holds it.
///
/// Borrowed variants are real references into caller data, so the referent
/// is guaranteed by the borrow checker to outlive the element's trip
/// through the chain.
#[derive(Debug)]
pub enum Arg<'a> {
    /// Temporary owned by the bundle itself.
    Owned(Value),
    /// Owned temporary held by an upstream stage, lent out for consumption.
    /// Moving out of it leaves `()` behind.
    Movable(&'a mut Value),
    /// Mutable borrow of data the receiver does not own.
    Mut(&'a mut Value),
    /// Shared borrow.
    Ref(&'a Value),
    /// Return-by-reference marker: finalize hands back a live reference
    /// instead of an owned copy.
    ByRef(Box<Arg<'a>>),
}

impl<'a> Arg<'a> {
    pub fn provenance(&self) -> Provenance {
        match self {
            Arg::Owned(_) | Arg::Movable(_) => Provenance::Owned,
            Arg::Mut(_) => Provenance::BorrowedMut,
            Arg::Ref(_) => Provenance::Borrowed,
            Arg::ByRef(inner) => inner.provenance(),
        }
    }

    pub fn is_by_ref(&self) -> bool {
        matches!(self, Arg::ByRef(_))
    }

    /// Read-only view, whatever the provenance.
    pub fn view(&self) -> &Value {
        match self {
            Arg::Owned(v) => v,
            Arg::Movable(v) | Arg::Mut(v) => &**v,
            Arg::Ref(v) => *v,
            Arg::ByRef(inner) => inner.view(),
        }
    }

    /// Mutable access, or `None` through a shared borrow.
    pub fn view_mut(&mut self) -> Option<&mut Value> {
        match self {
            Arg::Owned(v) => Some(v),
            Arg::Movable(v) | Arg::Mut(v) => Some(&mut **v),
            Arg::Ref(_) => None,
            Arg::ByRef(inner) => inner.view_mut(),
        }
    }

    /// Take the value: moves when owned, copies through a borrow.
    pub fn into_value(self) -> Value {
        match self {
            Arg::Owned(v) => v,
            Arg::Movable(v) => mem::take(v),
            Arg::Mut(v) => v.clone(),
            Arg::Ref(v) => v.clone(),
            Arg::ByRef(inner) => inner.into_value(),
        }
    }

    /// Shared view of this slot as a new argument.
    pub fn share(&self) -> Arg<'_> {
        match self {
            Arg::ByRef(inner) => Arg::ByRef(Box::new(inner.share())),
            other => Arg::Ref(other.view()),
        }
    }

    /// Same provenance, reborrowed for a shorter lifetime. An owned value is
    /// lent out as [`Arg::Movable`].
    pub fn reborrow(&mut self) -> Arg<'_> {
        match self {
            Arg::Owned(v) => Arg::Movable(v),
            Arg::Movable(v) => Arg::Movable(&mut **v),
            Arg::Mut(v) => Arg::Mut(&mut **v),
            Arg::Ref(v) => Arg::Ref(*v),
            Arg::ByRef(inner) => Arg::ByRef(Box::new(inner.reborrow())),
        }
    }

    /// Present this slot once more to a downstream consumer under `effect`.
    pub fn present(&mut self, effect: Effect) -> Arg<'_> {
        match effect {
            Effect::Share => self.share(),
            Effect::Repeat => match self {
                Arg::Mut(v) => Arg::Mut(&mut **v),
                Arg::ByRef(inner) => Arg::ByRef(Box::new(inner.present(effect))),
                other => Arg::Ref(other.view()),
            },
            _ => self.reborrow(),
        }
    }

    /// Mark this slot for return by reference.
    pub fn by_ref(self) -> Arg<'a> {
        match self {
            Arg::ByRef(_) => self,
            other => Arg::ByRef(Box::new(other)),
        }
    }

    /// Remove a return-by-reference marker, if any.
    pub fn strip(self) -> Arg<'a> {
        match self {
            Arg::ByRef(inner) => inner.strip(),
            other => other,
        }
    }
}

impl From<Value> for Arg<'_> {
    fn from(value: Value) -> Self {
        Arg::Owned(value)
    }
}

impl<'a> From<&'a Value> for Arg<'a> {
    fn from(value: &'a Value) -> Self {
        Arg::Ref(value)
    }
}

impl<'a> From<&'a mut Value> for Arg<'a> {
    fn from(value: &'a mut Value) -> Self {
        Arg::Mut(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movable_leaves_unit_after_move() {
        let mut slot = Arg::Owned(Value::from("payload"));
        let moved = slot.reborrow().into_value();
        assert_eq!(moved, Value::from("payload"));
        assert_eq!(slot.view(), &Value::Unit);
    }

    #[test]
    fn test_borrowed_into_value_copies() {
        let source = Value::list([1, 2]);
        let arg = Arg::Ref(&source);
        assert_eq!(arg.into_value(), source);
    }

    #[test]
    fn test_repeat_presents_owned_as_shared() {
        let mut slot = Arg::Owned(Value::from(7));
        let presented = slot.present(Effect::Repeat);
        assert_eq!(presented.provenance(), Provenance::Borrowed);
        assert!(matches!(presented, Arg::Ref(_)));
    }

    #[test]
    fn test_repeat_keeps_mutable_borrow() {
        let mut data = Value::from(1);
        let mut slot = Arg::Mut(&mut data);
        assert_eq!(
            slot.present(Effect::Repeat).provenance(),
            Provenance::BorrowedMut
        );
    }

    #[test]
    fn test_shared_borrow_refuses_mutation() {
        let data = Value::from(1);
        let mut slot = Arg::Ref(&data);
        assert!(slot.view_mut().is_none());
    }

    #[test]
    fn test_by_ref_marker_is_idempotent() {
        let data = Value::from(1);
        let marked = Arg::Ref(&data).by_ref().by_ref();
        match marked {
            Arg::ByRef(inner) => assert!(!inner.is_by_ref()),
            _ => panic!("expected marker"),
        }
    }
}
