//! Static kinds: the construction-time description of a value's structure.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// Construction-time structure of the value at one bundle position.
///
/// `Any` means the structure is not known until run time (for example a
/// callback declared to return [`Value`]); checks that need the structure
/// are then deferred to the values themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Any,
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List(Box<Kind>),
    Tuple(Vec<Kind>),
    Map(Box<Kind>, Box<Kind>),
    Set(Box<Kind>),
    Range,
    Optional(Box<Kind>),
    Outcome(Box<Kind>),
    /// Lazy, pull-driven sequence. Only sources have this kind.
    Generator(Box<Kind>),
}

impl Kind {
    /// Infer the kind of a concrete value.
    ///
    /// Collections unify the kinds of their members; members that disagree
    /// widen the element kind to `Any`.
    pub fn of(value: &Value) -> Kind {
        match value {
            Value::Unit => Kind::Unit,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::List(items) => Kind::List(Box::new(Self::unify_all(items.iter()))),
            Value::Tuple(items) => Kind::Tuple(items.iter().map(Kind::of).collect()),
            Value::Map(map) => Kind::Map(
                Box::new(Self::unify_all(map.keys())),
                Box::new(Self::unify_all(map.values())),
            ),
            Value::Set(set) => Kind::Set(Box::new(Self::unify_all(set.iter()))),
            Value::Range { .. } => Kind::Range,
            Value::Optional(Some(inner)) => Kind::Optional(Box::new(Kind::of(inner))),
            Value::Optional(None) => Kind::Optional(Box::new(Kind::Any)),
            Value::Outcome(Ok(inner)) => Kind::Outcome(Box::new(Kind::of(inner))),
            Value::Outcome(Err(_)) => Kind::Outcome(Box::new(Kind::Any)),
        }
    }

    fn unify_all<'v>(mut values: impl Iterator<Item = &'v Value>) -> Kind {
        match values.next() {
            None => Kind::Any,
            Some(first) => values.fold(Kind::of(first), |acc, v| acc.unify(Kind::of(v))),
        }
    }

    /// Least kind describing both `self` and `other`.
    pub fn unify(self, other: Kind) -> Kind {
        match (self, other) {
            (a, b) if a == b => a,
            (Kind::List(a), Kind::List(b)) => Kind::List(Box::new(a.unify(*b))),
            (Kind::Set(a), Kind::Set(b)) => Kind::Set(Box::new(a.unify(*b))),
            (Kind::Optional(a), Kind::Optional(b)) => Kind::Optional(Box::new(a.unify(*b))),
            (Kind::Outcome(a), Kind::Outcome(b)) => Kind::Outcome(Box::new(a.unify(*b))),
            (Kind::Map(ka, va), Kind::Map(kb, vb)) => {
                Kind::Map(Box::new(ka.unify(*kb)), Box::new(va.unify(*vb)))
            }
            (Kind::Tuple(a), Kind::Tuple(b)) if a.len() == b.len() => {
                Kind::Tuple(a.into_iter().zip(b).map(|(x, y)| x.unify(y)).collect())
            }
            _ => Kind::Any,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Kind::Any)
    }

    pub fn is_generator(&self) -> bool {
        matches!(self, Kind::Generator(_))
    }

    /// Whether iterating a value of this kind may yield elements. `Any`
    /// counts, with the check moved to run time.
    pub fn is_iterable(&self) -> bool {
        matches!(
            self,
            Kind::Any
                | Kind::List(_)
                | Kind::Set(_)
                | Kind::Map(..)
                | Kind::Range
                | Kind::Generator(_)
        )
    }

    /// Width of a tuple kind.
    pub fn tuple_width(&self) -> Option<usize> {
        match self {
            Kind::Tuple(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Kind of a bundle packed into one value: the single kind at arity 1,
    /// a tuple otherwise.
    pub fn packed(kinds: Vec<Kind>) -> Kind {
        if kinds.len() == 1 {
            kinds.into_iter().next().unwrap_or(Kind::Any)
        } else {
            Kind::Tuple(kinds)
        }
    }

    /// Neutral element for the default additive fold, if this kind has one.
    pub fn zero(&self) -> Option<Value> {
        match self {
            Kind::Int => Some(Value::Int(0)),
            Kind::Float => Some(Value::Float(0.0)),
            Kind::Str => Some(Value::Str(String::new())),
            Kind::List(_) => Some(Value::List(Vec::new())),
            Kind::Any => Some(Value::Unit),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Any => f.write_str("any"),
            Kind::Unit => f.write_str("unit"),
            Kind::Bool => f.write_str("bool"),
            Kind::Int => f.write_str("int"),
            Kind::Float => f.write_str("float"),
            Kind::Str => f.write_str("str"),
            Kind::List(k) => write!(f, "list<{k}>"),
            Kind::Tuple(items) => {
                f.write_str("tuple<")?;
                for (i, k) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}")?;
                }
                f.write_str(">")
            }
            Kind::Map(k, v) => write!(f, "map<{k}, {v}>"),
            Kind::Set(k) => write!(f, "set<{k}>"),
            Kind::Range => f.write_str("range"),
            Kind::Optional(k) => write!(f, "optional<{k}>"),
            Kind::Outcome(k) => write!(f, "outcome<{k}>"),
            Kind::Generator(k) => write!(f, "generator<{k}>"),
        }
    }
}
