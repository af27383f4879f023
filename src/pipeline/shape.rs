//! Construction-time element shapes.
//!
//! A [`Shape`] is what the chain builder knows about every element arriving
//! at a chain position: its arity, and per position its provenance, kind
//! and whether it carries the return-by-reference marker.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ownership::{Arg, Effect, OwnershipError, Provenance};
use crate::value::Kind;

/// One position of a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub provenance: Provenance,
    pub kind: Kind,
    #[serde(default)]
    pub by_ref: bool,
}

impl Slot {
    pub fn new(provenance: Provenance, kind: Kind) -> Self {
        Self {
            provenance,
            kind,
            by_ref: false,
        }
    }

    pub fn owned(kind: Kind) -> Self {
        Self::new(Provenance::Owned, kind)
    }

    pub fn borrowed(kind: Kind) -> Self {
        Self::new(Provenance::Borrowed, kind)
    }

    /// Shape of a concrete argument.
    pub fn of_arg(arg: &Arg<'_>) -> Self {
        Self {
            provenance: arg.provenance(),
            kind: arg.view().kind(),
            by_ref: arg.is_by_ref(),
        }
    }

    pub fn with_by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    pub fn after(&self, effect: Effect) -> Result<Slot, OwnershipError> {
        Ok(Slot {
            provenance: self.provenance.after(effect)?,
            kind: self.kind.clone(),
            by_ref: self.by_ref && effect != Effect::Finalize,
        })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.by_ref {
            f.write_str("by_ref ")?;
        }
        match self.provenance {
            Provenance::Owned => write!(f, "owned {}", self.kind),
            Provenance::BorrowedMut => write!(f, "&mut {}", self.kind),
            Provenance::Borrowed => write!(f, "&{}", self.kind),
        }
    }
}

/// Shape of the elements at one chain position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Shape {
    slots: Vec<Slot>,
}

impl Shape {
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    pub fn single(slot: Slot) -> Self {
        Self { slots: vec![slot] }
    }

    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn into_slots(self) -> Vec<Slot> {
        self.slots
    }

    pub fn kinds(&self) -> Vec<Kind> {
        self.slots.iter().map(|s| s.kind.clone()).collect()
    }

    /// Kind of an element packed into one value.
    pub fn packed_kind(&self) -> Kind {
        Kind::packed(self.kinds())
    }

    /// The shape after applying `effect` to every position.
    pub fn apply(&self, effect: Effect) -> Result<Shape, OwnershipError> {
        self.slots
            .iter()
            .map(|s| s.after(effect))
            .collect::<Result<Vec<_>, _>>()
            .map(Shape::new)
    }

    /// Every position seen through a shared view.
    pub fn shared(&self) -> Shape {
        Shape::new(
            self.slots
                .iter()
                .map(|s| Slot {
                    provenance: Provenance::Borrowed,
                    ..s.clone()
                })
                .collect(),
        )
    }

    /// Shape of a finalized result: owned, except marked positions, which
    /// stay live references.
    pub fn finalized(&self) -> Shape {
        Shape::new(
            self.slots
                .iter()
                .map(|s| {
                    if s.by_ref {
                        s.clone()
                    } else {
                        Slot::owned(s.kind.clone())
                    }
                })
                .collect(),
        )
    }

    pub fn prepend(mut self, slot: Slot) -> Shape {
        self.slots.insert(0, slot);
        self
    }

    pub fn push(mut self, slot: Slot) -> Shape {
        self.slots.push(slot);
        self
    }

    /// Shape of the elements produced by iterating this (arity-1) shape, or
    /// `None` when its kind cannot be iterated.
    pub fn element_shape(&self) -> Option<Shape> {
        let [slot] = self.slots.as_slice() else {
            return None;
        };
        let p = slot.provenance;
        let owned_or_shared = if p.is_owned() {
            Provenance::Owned
        } else {
            Provenance::Borrowed
        };
        let shape = match &slot.kind {
            Kind::List(k) => Shape::single(Slot::new(p, (**k).clone())),
            Kind::Set(k) => Shape::single(Slot::new(owned_or_shared, (**k).clone())),
            Kind::Map(k, v) => Shape::new(vec![
                Slot::new(owned_or_shared, (**k).clone()),
                Slot::new(p, (**v).clone()),
            ]),
            Kind::Range => Shape::single(Slot::owned(Kind::Int)),
            Kind::Generator(k) => Shape::single(Slot::owned((**k).clone())),
            Kind::Any => Shape::single(Slot::new(p, Kind::Any)),
            _ => return None,
        };
        Some(shape)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{slot}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(kind: Kind) -> Kind {
        Kind::List(Box::new(kind))
    }

    #[test]
    fn test_display() {
        let shape = Shape::new(vec![
            Slot::owned(Kind::Int),
            Slot::borrowed(list_of(Kind::Int)),
        ]);
        assert_eq!(shape.to_string(), "(owned int, &list<int>)");
    }

    #[test]
    fn test_list_elements_keep_provenance() {
        let shape = Shape::single(Slot::new(Provenance::BorrowedMut, list_of(Kind::Str)));
        assert_eq!(
            shape.element_shape(),
            Some(Shape::single(Slot::new(Provenance::BorrowedMut, Kind::Str)))
        );
    }

    #[test]
    fn test_map_elements_have_shared_keys() {
        let shape = Shape::single(Slot::new(
            Provenance::BorrowedMut,
            Kind::Map(Box::new(Kind::Str), Box::new(Kind::Int)),
        ));
        assert_eq!(shape.element_shape().unwrap().to_string(), "(&str, &mut int)");
    }

    #[test]
    fn test_range_elements_are_owned() {
        let shape = Shape::single(Slot::borrowed(Kind::Range));
        assert_eq!(
            shape.element_shape(),
            Some(Shape::single(Slot::owned(Kind::Int)))
        );
    }

    #[test]
    fn test_scalar_has_no_elements() {
        assert!(Shape::single(Slot::owned(Kind::Int)).element_shape().is_none());
        assert!(Shape::new(vec![Slot::owned(list_of(Kind::Int)); 2])
            .element_shape()
            .is_none());
    }

    #[test]
    fn test_finalized_keeps_marked_borrows() {
        let shape = Shape::new(vec![
            Slot::borrowed(Kind::Int).with_by_ref(),
            Slot::borrowed(Kind::Int),
        ]);
        let out = shape.finalized();
        assert_eq!(out.slot(0).map(|s| s.provenance), Some(Provenance::Borrowed));
        assert_eq!(out.slot(1).map(|s| s.provenance), Some(Provenance::Owned));
    }
}
