//! Collecting stages: materialize incremental input as one container.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use crate::bundle::{Bundle, MoveFn};
use crate::ownership::Finalized;
use crate::pipeline::{
    BindContext, Bound, ErrorCode, Next, PipelineError, Result, Shape, Slot, Stage,
    StageDescriptor, StageError, StageInstance, Style,
};
use crate::value::{Kind, Value};

use super::{callback_arity_error, expect_arity};

/// Collect every element, in arrival order, into a list.
pub fn to_vec() -> Stage {
    Stage::new(CollectDescriptor {
        target: Target::List,
    })
}

/// Collect into a set; duplicates collapse.
pub fn to_set() -> Stage {
    Stage::new(CollectDescriptor {
        target: Target::Set,
    })
}

/// Collect `(key, value)` elements into a map. The first value seen for a
/// key is kept.
///
/// Elements may arrive as two positions or as a single pair.
pub fn to_map() -> Stage {
    Stage::new(CollectDescriptor {
        target: Target::Map,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    List,
    Set,
    Map,
}

struct CollectDescriptor {
    target: Target,
}

impl CollectDescriptor {
    fn map_kind(&self, input: &Shape, cx: &BindContext) -> Result<Kind> {
        let kinds = match input.kinds().as_slice() {
            [k, v] => (k.clone(), v.clone()),
            [Kind::Tuple(items)] if items.len() == 2 => (items[0].clone(), items[1].clone()),
            [Kind::Any] => (Kind::Any, Kind::Any),
            _ => {
                return Err(PipelineError::Bind(
                    StageError::new(
                        ErrorCode::NotConstructible,
                        cx.path(),
                        format!("to_map needs (key, value) elements, found {input}"),
                    )
                    .with_hint("emit two positions per element, e.g. with enumerate()"),
                ))
            }
        };
        Ok(Kind::Map(Box::new(kinds.0), Box::new(kinds.1)))
    }
}

impl StageDescriptor for CollectDescriptor {
    fn name(&self) -> &'static str {
        match self.target {
            Target::List => "to_vec",
            Target::Set => "to_set",
            Target::Map => "to_map",
        }
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_COMPLETE
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        let (buffer, kind) = match self.target {
            Target::List => (
                Buffer::List(Vec::new()),
                Kind::List(Box::new(input.packed_kind())),
            ),
            Target::Set => (
                Buffer::Set(BTreeSet::new()),
                Kind::Set(Box::new(input.packed_kind())),
            ),
            Target::Map => (Buffer::Map(BTreeMap::new()), self.map_kind(input, cx)?),
        };
        let instance = Collect {
            buffer,
            path: cx.path().to_string(),
        };
        Ok(Bound::new(instance, Shape::single(Slot::owned(kind))))
    }
}

enum Buffer {
    List(Vec<Value>),
    Set(BTreeSet<Value>),
    Map(BTreeMap<Value, Value>),
}

struct Collect {
    buffer: Buffer,
    path: String,
}

/// Split an element into its key and value.
fn entry(input: Bundle<'_>, path: &str) -> Result<(Value, Value)> {
    let values = match <[Value; 1]>::try_from(input.into_values()) {
        Ok([Value::Tuple(items)]) => items,
        Ok([other]) => vec![other],
        Err(values) => values,
    };
    match <[Value; 2]>::try_from(values) {
        Ok([key, value]) => Ok((key, value)),
        Err(values) => Err(PipelineError::Runtime(StageError::new(
            ErrorCode::TypeMismatch,
            path,
            format!("expected a (key, value) pair, found {} values", values.len()),
        ))),
    }
}

impl StageInstance for Collect {
    fn process_incremental(&mut self, input: Bundle<'_>, _next: Next<'_>) -> Result<()> {
        match &mut self.buffer {
            Buffer::List(items) => items.push(input.pack()),
            Buffer::Set(items) => {
                items.insert(input.pack());
            }
            Buffer::Map(map) => {
                let (key, value) = entry(input, &self.path)?;
                map.entry(key).or_insert(value);
            }
        }
        Ok(())
    }

    fn end(&mut self, next: Next<'_>) -> Result<Finalized<'static>> {
        let value = match &mut self.buffer {
            Buffer::List(items) => Value::List(mem::take(items)),
            Buffer::Set(items) => Value::Set(mem::take(items)),
            Buffer::Map(map) => Value::Map(mem::take(map)),
        };
        next.process_complete(Bundle::owned(value))
    }
}

// ---------------------------------------------------------------------------
// for_each
// ---------------------------------------------------------------------------

/// Call `f` on every element for its side effects. The result is `()`.
///
/// `f` receives the element by consuming move, so it may mutate positions
/// held through a mutable borrow.
pub fn for_each<M, F>(f: F) -> Stage
where
    M: 'static,
    F: MoveFn<M>,
{
    Stage::new(ForEachDescriptor {
        f,
        _marker: std::marker::PhantomData,
    })
}

struct ForEachDescriptor<M, F> {
    f: F,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M: 'static, F: MoveFn<M>> StageDescriptor for ForEachDescriptor<M, F> {
    fn name(&self) -> &'static str {
        "for_each"
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_COMPLETE
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        expect_arity(cx, "for_each", F::ARITY, input)?;
        let instance = ForEach {
            f: self.f.clone(),
            path: cx.path().to_string(),
            _marker: std::marker::PhantomData,
        };
        Ok(Bound::new(instance, Shape::new(Vec::new())))
    }
}

struct ForEach<M, F> {
    f: F,
    path: String,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F: MoveFn<M>> StageInstance for ForEach<M, F> {
    fn process_incremental(&mut self, input: Bundle<'_>, _next: Next<'_>) -> Result<()> {
        input
            .invoke(&mut self.f)
            .map(drop)
            .ok_or_else(|| callback_arity_error(&self.path, "for_each"))
    }

    fn end(&mut self, next: Next<'_>) -> Result<Finalized<'static>> {
        next.process_complete(Bundle::default())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ownership::Arg;
    use crate::pipeline::apply;
    use crate::source::Source;
    use crate::stages::enumerate;

    #[test]
    fn test_to_vec_keeps_arrival_order() {
        let out = apply(Value::list([3, 1, 2]), to_vec()).unwrap();
        assert_eq!(out.into_value(), Value::list([3, 1, 2]));
    }

    #[test]
    fn test_to_set_collapses_duplicates() {
        let out = apply(Value::list([2, 1, 2, 3, 1]), to_set()).unwrap();
        let expected: BTreeSet<Value> = [1, 2, 3].into_iter().map(Value::from).collect();
        assert_eq!(out.into_value(), Value::Set(expected));
    }

    #[test]
    fn test_to_map_from_two_positions() {
        let out = apply(Value::list(["a", "b"]), (enumerate(), to_map())).unwrap();
        let map = out.into_value();
        let map = map.as_map().unwrap();
        assert_eq!(map.get(&Value::from(1)), Some(&Value::from("b")));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_to_map_first_key_wins() {
        let pairs = Value::list([Value::pair("k", 1), Value::pair("k", 2), Value::pair("j", 3)]);
        let out = apply(pairs, to_map()).unwrap();
        let map = out.into_value();
        let map = map.as_map().unwrap();
        assert_eq!(map.get(&Value::from("k")), Some(&Value::from(1)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_to_map_rejects_scalars() {
        let err = apply(Value::list([1, 2]), to_map()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotConstructible);
    }

    #[test]
    fn test_for_each_mutates_borrowed_source() {
        let mut data = Value::list([1, 2, 3]);
        let out = apply(
            Source::borrowed_mut(&mut data),
            for_each(|mut a: Arg<'_>| {
                if let Some(Value::Int(i)) = a.view_mut() {
                    *i += 1;
                }
            }),
        )
        .unwrap();
        assert_eq!(out.arity(), 0);
        assert_eq!(out.into_value(), Value::Unit);
        assert_eq!(data, Value::list([2, 3, 4]));
    }

    #[test]
    fn test_for_each_sees_every_element() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        apply(
            Value::list(["x", "y"]),
            for_each(move |v: &Value| sink.borrow_mut().push(v.clone())),
        )
        .unwrap();
        assert_eq!(*seen.borrow(), vec![Value::from("x"), Value::from("y")]);
    }
}
