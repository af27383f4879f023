//! Element payloads.
//!
//! A [`Value`] is an owned, totally ordered, hashable tree. Values never hold
//! borrows: borrowing happens one level up, in the provenance-tagged
//! [`Arg`](crate::ownership::Arg) slots of a bundle. That split is what lets
//! the finalize step reason about references positionally.

mod convert;
mod kind;

pub use convert::IntoValue;
pub use kind::Kind;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Why [`Value::try_add_assign`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AddError {
    #[error("integer overflow")]
    Overflow,
    #[error("operands cannot be added")]
    Incompatible,
}

/// A dynamically shaped element value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Fixed-arity record (pairs, triples, ...). Not iterable.
    Tuple(Vec<Value>),
    Map(#[serde(with = "map_pairs")] BTreeMap<Value, Value>),
    Set(BTreeSet<Value>),
    /// Lazy half-open integer range `start..end`.
    Range {
        start: i64,
        end: i64,
    },
    Optional(Option<Box<Value>>),
    Outcome(Result<Box<Value>, String>),
}

impl Value {
    /// Build a list from anything convertible to values.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoValue,
    {
        Value::List(items.into_iter().map(IntoValue::into_value).collect())
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items)
    }

    pub fn pair(first: impl IntoValue, second: impl IntoValue) -> Self {
        Value::Tuple(vec![first.into_value(), second.into_value()])
    }

    pub fn some(value: impl IntoValue) -> Self {
        Value::Optional(Some(Box::new(value.into_value())))
    }

    pub fn none() -> Self {
        Value::Optional(None)
    }

    pub fn ok(value: impl IntoValue) -> Self {
        Value::Outcome(Ok(Box::new(value.into_value())))
    }

    pub fn err(message: impl Into<String>) -> Self {
        Value::Outcome(Err(message.into()))
    }

    pub fn range(start: i64, end: i64) -> Self {
        Value::Range { start, end }
    }

    /// Static kind inferred from the value's contents.
    pub fn kind(&self) -> Kind {
        Kind::of(self)
    }

    /// Short lowercase name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Range { .. } => "range",
            Value::Optional(_) => "optional",
            Value::Outcome(_) => "outcome",
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric view of ints and floats.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<Value>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    /// `Some(inner)` for an optional, where `inner` is `None` when empty.
    pub fn as_optional(&self) -> Option<Option<&Value>> {
        match self {
            Value::Optional(inner) => Some(inner.as_deref()),
            _ => None,
        }
    }

    /// Whether iterating this value yields elements (list, set, map, range).
    pub fn is_iterable(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Range { .. }
        )
    }

    /// `self + rhs` for the kinds a default fold knows how to add.
    ///
    /// `Unit` is the neutral seed. Returns `None` for mismatched kinds or
    /// integer overflow.
    pub fn checked_add(mut self, rhs: Value) -> Option<Value> {
        self.try_add_assign(rhs).ok().map(|()| self)
    }

    /// Add `rhs` in place. On failure `self` is left unchanged.
    pub fn try_add_assign(&mut self, rhs: Value) -> Result<(), AddError> {
        match self {
            Value::Unit => *self = rhs,
            Value::Int(a) => match rhs {
                Value::Int(b) => *a = a.checked_add(b).ok_or(AddError::Overflow)?,
                Value::Float(b) => {
                    let sum = *a as f64 + b;
                    *self = Value::Float(sum);
                }
                _ => return Err(AddError::Incompatible),
            },
            Value::Float(a) => match rhs {
                Value::Float(b) => *a += b,
                Value::Int(b) => *a += b as f64,
                _ => return Err(AddError::Incompatible),
            },
            Value::Str(a) => match rhs {
                Value::Str(b) => a.push_str(&b),
                _ => return Err(AddError::Incompatible),
            },
            Value::List(a) => match rhs {
                Value::List(b) => a.extend(b),
                _ => return Err(AddError::Incompatible),
            },
            _ => return Err(AddError::Incompatible),
        }
        Ok(())
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Unit => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Str(_) => 4,
            Value::List(_) => 5,
            Value::Tuple(_) => 6,
            Value::Map(_) => 7,
            Value::Set(_) => 8,
            Value::Range { .. } => 9,
            Value::Optional(_) => 10,
            Value::Outcome(_) => 11,
        }
    }
}

// ---------------------------------------------------------------------------
// Ordering, equality, hashing
// ---------------------------------------------------------------------------

// Floats compare with `total_cmp`, so equality is bitwise and consistent with
// the hash below. Values of different variants order by variant.

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Unit, Value::Unit) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (
                Value::Range { start: s1, end: e1 },
                Value::Range { start: s2, end: e2 },
            ) => (s1, e1).cmp(&(s2, e2)),
            (Value::Optional(a), Value::Optional(b)) => a.cmp(b),
            (Value::Outcome(a), Value::Outcome(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Unit => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::List(items) | Value::Tuple(items) => items.hash(state),
            Value::Map(map) => map.hash(state),
            Value::Set(set) => set.hash(state),
            Value::Range { start, end } => (start, end).hash(state),
            Value::Optional(inner) => inner.hash(state),
            Value::Outcome(inner) => inner.hash(state),
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

fn write_joined<'v>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = &'v Value>,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                f.write_str(")")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Set(set) => {
                f.write_str("#{")?;
                write_joined(f, set)?;
                f.write_str("}")
            }
            Value::Range { start, end } => write!(f, "{start}..{end}"),
            Value::Optional(Some(v)) => write!(f, "some({v})"),
            Value::Optional(None) => f.write_str("none"),
            Value::Outcome(Ok(v)) => write!(f, "ok({v})"),
            Value::Outcome(Err(e)) => write!(f, "err({e:?})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions for literals
// ---------------------------------------------------------------------------

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

/// Maps serialize as `[[key, value], ...]` so non-string keys survive JSON.
mod map_pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Value;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<Value, Value>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&Value, &Value)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Value, Value>, D::Error> {
        let pairs = Vec::<(Value, Value)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_variant_ordering_is_total() {
        let mut values = vec![
            Value::from("b"),
            Value::from(2),
            Value::Unit,
            Value::from(1.5),
            Value::from(true),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Unit,
                Value::from(true),
                Value::from(2),
                Value::from(1.5),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_checked_add_combinations() {
        assert_eq!(Value::Unit.checked_add(Value::from(4)), Some(Value::from(4)));
        assert_eq!(
            Value::from("ab").checked_add(Value::from("cd")),
            Some(Value::from("abcd"))
        );
        assert_eq!(
            Value::from(1).checked_add(Value::from(0.5)),
            Some(Value::from(1.5))
        );
        assert_eq!(Value::from(i64::MAX).checked_add(Value::from(1)), None);
        assert_eq!(Value::from(true).checked_add(Value::from(1)), None);
    }

    #[test]
    fn test_failed_add_leaves_value_unchanged() {
        let mut acc = Value::from(i64::MAX);
        assert_eq!(acc.try_add_assign(Value::from(1)), Err(AddError::Overflow));
        assert_eq!(acc, Value::from(i64::MAX));

        let mut acc = Value::list([1]);
        assert_eq!(acc.try_add_assign(Value::from(2)), Err(AddError::Incompatible));
        assert_eq!(acc, Value::list([1]));
    }

    #[test]
    fn test_display_nested() {
        let v = Value::list([Value::pair("a", 1), Value::pair("b", 2)]);
        assert_eq!(v.to_string(), r#"[("a", 1), ("b", 2)]"#);
        assert_eq!(Value::some(3).to_string(), "some(3)");
        assert_eq!(Value::range(1, 4).to_string(), "1..4");
    }

    #[test]
    fn test_map_serializes_as_pairs() {
        let mut map = BTreeMap::new();
        map.insert(Value::from(1), Value::from("one"));
        let json = serde_json::to_value(Value::Map(map.clone())).unwrap();
        assert_eq!(json["map"][0][0]["int"], 1);
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::Map(map));
    }
}
