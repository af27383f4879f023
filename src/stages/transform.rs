//! Element transforms.

use crate::bundle::{Bundle, MoveFn};
use crate::ownership::{Arg, Finalized};
use crate::pipeline::{
    BindContext, Bound, ErrorCode, Next, Result, Shape, Slot, Stage, StageDescriptor,
    StageInstance, Style,
};
use crate::value::{IntoValue, Kind, Value};

use super::{callback_arity_error, expect_arity};

/// Apply `f` to every element and emit its owned result.
///
/// The element is unpacked into `f`'s parameters by consuming move: a
/// callback taking [`Arg`] sees each position with its own provenance, one
/// taking [`Value`](crate::Value) receives owned values (borrowed positions
/// are copied), and one taking `&Value` only reads.
pub fn transform<M, F>(f: F) -> Stage
where
    M: 'static,
    F: MoveFn<M>,
    F::Output: IntoValue,
{
    Stage::new(TransformDescriptor {
        f,
        complete: false,
        _marker: std::marker::PhantomData,
    })
}

/// [`transform`] applied once to the complete value.
pub fn transform_complete<M, F>(f: F) -> Stage
where
    M: 'static,
    F: MoveFn<M>,
    F::Output: IntoValue,
{
    Stage::new(TransformDescriptor {
        f,
        complete: true,
        _marker: std::marker::PhantomData,
    })
}

struct TransformDescriptor<M, F> {
    f: F,
    complete: bool,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageDescriptor for TransformDescriptor<M, F>
where
    M: 'static,
    F: MoveFn<M>,
    F::Output: IntoValue,
{
    fn name(&self) -> &'static str {
        if self.complete {
            "transform_complete"
        } else {
            "transform"
        }
    }

    fn style(&self) -> Style {
        if self.complete {
            Style::COMPLETE_TO_COMPLETE
        } else {
            Style::INCREMENTAL_TO_INCREMENTAL
        }
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        expect_arity(cx, self.name(), F::ARITY, input)?;
        let instance = Transform {
            f: self.f.clone(),
            name: self.name(),
            path: cx.path().to_string(),
            _marker: std::marker::PhantomData,
        };
        Ok(Bound::new(
            instance,
            Shape::single(Slot::owned(F::Output::kind())),
        ))
    }
}

struct Transform<M, F> {
    f: F,
    name: &'static str,
    path: String,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> Transform<M, F>
where
    F: MoveFn<M>,
    F::Output: IntoValue,
{
    fn apply(&mut self, input: Bundle<'_>) -> Result<Bundle<'static>> {
        let out = input
            .invoke(&mut self.f)
            .ok_or_else(|| callback_arity_error(&self.path, self.name))?;
        Ok(Bundle::owned(out.into_value()))
    }
}

impl<M, F> StageInstance for Transform<M, F>
where
    F: MoveFn<M>,
    F::Output: IntoValue,
{
    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        let out = self.apply(input)?;
        next.process_incremental(out)
    }

    fn process_complete<'e>(&mut self, input: Bundle<'e>, next: Next<'_>) -> Result<Finalized<'e>> {
        let out = self.apply(input)?;
        Ok(next.process_complete(out)?)
    }
}

// ---------------------------------------------------------------------------
// transform_arg
// ---------------------------------------------------------------------------

/// Replace position `index` with `f` of it, keeping the other positions as
/// they are.
pub fn transform_arg<M, F>(index: usize, f: F) -> Stage
where
    M: 'static,
    F: MoveFn<M>,
    F::Output: IntoValue,
{
    Stage::new(TransformArgDescriptor {
        index,
        f,
        _marker: std::marker::PhantomData,
    })
}

struct TransformArgDescriptor<M, F> {
    index: usize,
    f: F,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageDescriptor for TransformArgDescriptor<M, F>
where
    M: 'static,
    F: MoveFn<M>,
    F::Output: IntoValue,
{
    fn name(&self) -> &'static str {
        "transform_arg"
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        if self.index >= input.arity() {
            return Err(cx.error(
                ErrorCode::IndexOutOfRange,
                format!(
                    "transform_arg index {} is out of range for elements {input}",
                    self.index
                ),
            ));
        }
        if F::ARITY != 1 {
            return Err(cx.error(
                ErrorCode::ArityMismatch,
                format!(
                    "transform_arg callback takes {} arguments but replaces one position",
                    F::ARITY
                ),
            ));
        }

        let mut slots = input.clone().into_slots();
        slots[self.index] = Slot::owned(F::Output::kind());
        let instance = TransformArg {
            index: self.index,
            f: self.f.clone(),
            path: cx.path().to_string(),
            _marker: std::marker::PhantomData,
        };
        Ok(Bound::new(instance, Shape::new(slots)))
    }
}

struct TransformArg<M, F> {
    index: usize,
    f: F,
    path: String,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageInstance for TransformArg<M, F>
where
    F: MoveFn<M>,
    F::Output: IntoValue,
{
    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        let f = &mut self.f;
        let path = self.path.as_str();
        let out = input
            .replace_at(self.index, |arg| {
                f.call_move(vec![arg])
                    .map(|r| Arg::Owned(r.into_value()))
                    .ok_or_else(|| callback_arity_error(path, "transform_arg"))
            })
            .ok_or_else(|| callback_arity_error(path, "transform_arg"))??;
        next.process_incremental(out)
    }
}

// ---------------------------------------------------------------------------
// make_tuple / make_pair
// ---------------------------------------------------------------------------

/// Pack every position of an element into one owned tuple.
///
/// The inverse of [`expand`](super::expand): `(a, b, c)` as three positions
/// becomes the single value `(a, b, c)`. Borrowed positions are copied.
pub fn make_tuple() -> Stage {
    Stage::new(MakeTupleDescriptor { pair: false })
}

/// [`make_tuple`] for elements of exactly two positions.
pub fn make_pair() -> Stage {
    Stage::new(MakeTupleDescriptor { pair: true })
}

struct MakeTupleDescriptor {
    pair: bool,
}

impl StageDescriptor for MakeTupleDescriptor {
    fn name(&self) -> &'static str {
        if self.pair {
            "make_pair"
        } else {
            "make_tuple"
        }
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        if self.pair {
            expect_arity(cx, "make_pair", 2, input)?;
        }
        Ok(Bound::new(
            MakeTuple,
            Shape::single(Slot::owned(Kind::Tuple(input.kinds()))),
        ))
    }
}

struct MakeTuple;

impl StageInstance for MakeTuple {
    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        next.process_incremental(Bundle::owned(Value::Tuple(input.into_values())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::apply;
    use crate::source::Source;
    use crate::stages::{enumerate, to_vec};

    #[test]
    fn test_transform_by_view() {
        let out = apply(
            Value::list([1, 2, 3]),
            (transform(|x: &Value| x.as_int().map_or(0, |i| i * 10)), to_vec()),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::list([10, 20, 30]));
    }

    #[test]
    fn test_transform_moves_owned_elements() {
        let out = apply(
            Value::list(["a", "b"]),
            (
                transform(|mut s: Value| {
                    if let Value::Str(text) = &mut s {
                        text.push('!');
                    }
                    s
                }),
                to_vec(),
            ),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::list(["a!", "b!"]));
    }

    #[test]
    fn test_transform_sees_provenance() {
        let data = Value::list([1]);
        let out = apply(
            Source::borrowed(&data),
            (transform(|a: Arg<'_>| a.provenance().to_string()), to_vec()),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::list(["&"]));
    }

    #[test]
    fn test_transform_arity_mismatch() {
        let err = apply(
            Value::list([1, 2]),
            (transform(|a: &Value, _b: &Value| a.clone()), to_vec()),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ArityMismatch);
        assert_eq!(err.stage_error().map(|e| e.path.as_str()), Some("/stages/0"));
    }

    #[test]
    fn test_transform_complete_sees_whole_value() {
        let out = apply(
            Value::list([1, 2, 3]),
            transform_complete(|v: &Value| v.as_list().map_or(0, |l| l.len())),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::from(3));
    }

    #[test]
    fn test_transform_arg_replaces_one_position() {
        let out = apply(
            Value::list(["x", "y"]),
            (
                enumerate(),
                transform_arg(0, |i: &Value| i.as_int().map_or(0, |i| i + 100)),
                to_vec(),
            ),
        )
        .unwrap();
        assert_eq!(
            out.into_value(),
            Value::list([Value::pair(100, "x"), Value::pair(101, "y")])
        );
    }

    #[test]
    fn test_transform_arg_index_out_of_range() {
        let err = apply(
            Value::list([1]),
            (transform_arg(1, |v: Value| v), to_vec()),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IndexOutOfRange);
    }

    #[test]
    fn test_make_tuple_packs_positions() {
        let data = Value::list(["x", "y"]);
        let out = apply(Source::borrowed(&data), (enumerate(), make_tuple(), to_vec())).unwrap();
        assert_eq!(
            out.into_value(),
            Value::list([Value::pair(0, "x"), Value::pair(1, "y")])
        );
    }

    #[test]
    fn test_make_tuple_result_kind() {
        let cx = BindContext::new(std::rc::Rc::new(crate::pipeline::EngineConfig::default()));
        let input = Shape::new(vec![Slot::borrowed(Kind::Int), Slot::owned(Kind::Str)]);
        let bound = make_tuple().descriptor().bind(&input, &cx).unwrap();
        assert_eq!(bound.output.packed_kind().to_string(), "tuple<int, str>");
        assert_eq!(bound.output.slot(0), Some(&Slot::owned(Kind::Tuple(vec![Kind::Int, Kind::Str]))));
    }

    #[test]
    fn test_make_pair_needs_two_positions() {
        let err = apply(Value::list([1, 2]), (make_pair(), to_vec())).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ArityMismatch);
    }
}
