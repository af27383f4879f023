//! The terminal conversion enforcing value semantics on a chain's result.
//!
//! # Contract
//!
//! - Owned slots are returned as they are (moved out of a lender when held
//!   as [`Arg::Movable`]).
//! - Borrowed slots are copied into owned values.
//! - Slots carrying the return-by-reference marker come back as live
//!   references to their referent. The referent itself is not copied.
//! - Finalizing an already-owned result returns it unchanged.

use crate::bundle::Bundle;
use crate::value::Value;

use super::Arg;

/// One finalized result position.
#[derive(Debug)]
pub enum Resolved<'a> {
    Value(Value),
    Ref(&'a Value),
    Mut(&'a mut Value),
}

impl Resolved<'_> {
    pub fn value(&self) -> &Value {
        match self {
            Resolved::Value(v) => v,
            Resolved::Ref(v) => *v,
            Resolved::Mut(v) => &**v,
        }
    }

    /// Whether this position is a live reference into caller data.
    pub fn is_reference(&self) -> bool {
        !matches!(self, Resolved::Value(_))
    }

    /// Owned copy of this position.
    pub fn into_value(self) -> Value {
        match self {
            Resolved::Value(v) => v,
            Resolved::Ref(v) => v.clone(),
            Resolved::Mut(v) => v.clone(),
        }
    }
}

/// The result of running a chain: one resolved item per result position.
#[derive(Debug)]
pub struct Finalized<'a> {
    items: Vec<Resolved<'a>>,
}

impl<'a> Finalized<'a> {
    pub fn from_value(value: Value) -> Self {
        Self {
            items: vec![Resolved::Value(value)],
        }
    }

    pub fn unit() -> Self {
        Self::from_value(Value::Unit)
    }

    pub fn arity(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, index: usize) -> Option<&Resolved<'a>> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[Resolved<'a>] {
        &self.items
    }

    /// View of the single result position, if the result has arity 1.
    pub fn value(&self) -> Option<&Value> {
        match self.items.as_slice() {
            [only] => Some(only.value()),
            _ => None,
        }
    }

    /// Collapse into one owned value: `()` for an empty result, the item
    /// itself at arity 1, a tuple otherwise. Live references are copied.
    pub fn into_value(self) -> Value {
        let mut values = self.into_values();
        match values.len() {
            0 => Value::Unit,
            1 => values.pop().unwrap_or_default(),
            _ => Value::Tuple(values),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.items.into_iter().map(Resolved::into_value).collect()
    }

    pub fn into_single(self) -> Option<Resolved<'a>> {
        let mut items = self.items;
        if items.len() == 1 {
            items.pop()
        } else {
            None
        }
    }

    /// Back into a bundle, keeping live references marked for return by
    /// reference.
    pub fn into_bundle(self) -> Bundle<'a> {
        Bundle::new(
            self.items
                .into_iter()
                .map(|item| match item {
                    Resolved::Value(v) => Arg::Owned(v),
                    Resolved::Ref(v) => Arg::Ref(v).by_ref(),
                    Resolved::Mut(v) => Arg::Mut(v).by_ref(),
                })
                .collect(),
        )
    }
}

fn resolve(arg: Arg<'_>) -> Resolved<'_> {
    match arg {
        Arg::ByRef(inner) => resolve_marked(*inner),
        other => Resolved::Value(other.into_value()),
    }
}

fn resolve_marked(arg: Arg<'_>) -> Resolved<'_> {
    match arg {
        Arg::Owned(v) => Resolved::Value(v),
        Arg::Movable(v) | Arg::Mut(v) => Resolved::Mut(v),
        Arg::Ref(v) => Resolved::Ref(v),
        Arg::ByRef(inner) => resolve_marked(*inner),
    }
}

/// Resolve every position of a terminal bundle.
pub fn finalize(bundle: Bundle<'_>) -> Finalized<'_> {
    Finalized {
        items: bundle.into_args().into_iter().map(resolve).collect(),
    }
}
