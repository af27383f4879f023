//! Conversions from Rust values into [`Value`], with their static kinds.
//!
//! The static kind of a callback's return type becomes the kind of the slot
//! it produces, so downstream stages can be checked before any element
//! flows.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::ops::Range;

use super::{Kind, Value};

/// A Rust type that can become a pipeline [`Value`].
pub trait IntoValue {
    /// Kind of every value this type converts to.
    fn kind() -> Kind
    where
        Self: Sized;

    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn kind() -> Kind {
        Kind::Any
    }

    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn kind() -> Kind {
        Kind::Unit
    }

    fn into_value(self) -> Value {
        Value::Unit
    }
}

impl IntoValue for bool {
    fn kind() -> Kind {
        Kind::Bool
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn kind() -> Kind {
                    Kind::Int
                }

                fn into_value(self) -> Value {
                    Value::Int(i64::from(self))
                }
            }
        )*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl IntoValue for usize {
    fn kind() -> Kind {
        Kind::Int
    }

    fn into_value(self) -> Value {
        Value::Int(i64::try_from(self).unwrap_or(i64::MAX))
    }
}

impl IntoValue for f64 {
    fn kind() -> Kind {
        Kind::Float
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for f32 {
    fn kind() -> Kind {
        Kind::Float
    }

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl IntoValue for String {
    fn kind() -> Kind {
        Kind::Str
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn kind() -> Kind {
        Kind::Str
    }

    fn into_value(self) -> Value {
        Value::Str(self.to_owned())
    }
}

impl IntoValue for char {
    fn kind() -> Kind {
        Kind::Str
    }

    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn kind() -> Kind {
        Kind::List(Box::new(T::kind()))
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for BTreeSet<T> {
    fn kind() -> Kind {
        Kind::Set(Box::new(T::kind()))
    }

    fn into_value(self) -> Value {
        Value::Set(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn kind() -> Kind {
        Kind::Map(Box::new(K::kind()), Box::new(V::kind()))
    }

    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn kind() -> Kind {
        Kind::Optional(Box::new(T::kind()))
    }

    fn into_value(self) -> Value {
        Value::Optional(self.map(|v| Box::new(v.into_value())))
    }
}

impl<T: IntoValue, E: Display> IntoValue for Result<T, E> {
    fn kind() -> Kind {
        Kind::Outcome(Box::new(T::kind()))
    }

    fn into_value(self) -> Value {
        Value::Outcome(
            self.map(|v| Box::new(v.into_value()))
                .map_err(|e| e.to_string()),
        )
    }
}

impl IntoValue for Range<i64> {
    fn kind() -> Kind {
        Kind::Range
    }

    fn into_value(self) -> Value {
        Value::Range {
            start: self.start,
            end: self.end,
        }
    }
}

macro_rules! tuple_into_value {
    ($($name:ident),+) => {
        impl<$($name: IntoValue),+> IntoValue for ($($name,)+) {
            fn kind() -> Kind {
                Kind::Tuple(vec![$($name::kind()),+])
            }

            #[allow(non_snake_case)]
            fn into_value(self) -> Value {
                let ($($name,)+) = self;
                Value::Tuple(vec![$($name.into_value()),+])
            }
        }
    };
}

tuple_into_value!(A, B);
tuple_into_value!(A, B, C);
tuple_into_value!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_kinds_match_converted_values() {
        let v = vec![(1i64, "a".to_string())];
        assert_eq!(<Vec<(i64, String)>>::kind(), Kind::of(&v.clone().into_value()));
        assert_eq!(<Option<i64>>::kind().to_string(), "optional<int>");
    }

    #[test]
    fn test_result_error_becomes_message() {
        let r: Result<i64, String> = Err("bad".into());
        assert_eq!(r.into_value(), Value::err("bad"));
    }

    #[test]
    fn test_range_converts_to_lazy_range() {
        assert_eq!((2..5i64).into_value(), Value::range(2, 5));
    }
}
