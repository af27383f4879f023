//! Folds: incremental input reduced to one complete value.
//!
//! Every fold consumes its elements one at a time and hands a single owned
//! result on at end of input. Multi-position elements are packed into a tuple
//! before they are folded.

use std::mem;

use crate::bundle::Bundle;
use crate::ownership::Finalized;
use crate::pipeline::{
    BindContext, Bound, ErrorCode, Next, PipelineError, Result, Shape, Slot, Stage,
    StageDescriptor, StageError, StageInstance, Style,
};
use crate::value::{AddError, IntoValue, Kind, Value};

type Op = Box<dyn FnMut(Value, &Value) -> Value>;
type Less = Box<dyn FnMut(&Value, &Value) -> bool>;

// ─── Constructors ───────────────────────────────────────────────────────────

/// Left fold: `acc = op(acc, element)`, starting from `init`.
pub fn accumulate<I, F, R>(init: I, op: F) -> Stage
where
    I: IntoValue,
    F: FnMut(Value, &Value) -> R + Clone + 'static,
    R: IntoValue,
{
    let make: Box<dyn Fn() -> Op> = Box::new(move || {
        let mut op = op.clone();
        Box::new(move |acc: Value, x: &Value| op(acc, x).into_value()) as Op
    });
    Stage::new(FoldDescriptor {
        name: "accumulate",
        spec: FoldSpec::With {
            init: init.into_value(),
            kind: R::kind(),
            make,
        },
    })
}

/// Sum with `+`, seeded with the zero of the element kind.
pub fn sum() -> Stage {
    Stage::new(FoldDescriptor {
        name: "sum",
        spec: FoldSpec::Sum,
    })
}

/// Number of elements.
pub fn count() -> Stage {
    Stage::new(FoldDescriptor {
        name: "count",
        spec: FoldSpec::Count,
    })
}

/// Smallest element, `none` for empty input. The first of equal elements
/// wins.
pub fn min() -> Stage {
    extreme("min", Pick::Min, None)
}

/// Largest element, `none` for empty input. The first of equal elements
/// wins.
pub fn max() -> Stage {
    extreme("max", Pick::Max, None)
}

/// [`min`] under a strict "less than" predicate.
pub fn min_by<F>(less: F) -> Stage
where
    F: FnMut(&Value, &Value) -> bool + Clone + 'static,
{
    extreme("min_by", Pick::Min, Some(boxed(less)))
}

/// [`max`] under a strict "less than" predicate.
pub fn max_by<F>(less: F) -> Stage
where
    F: FnMut(&Value, &Value) -> bool + Clone + 'static,
{
    extreme("max_by", Pick::Max, Some(boxed(less)))
}

/// `(min, max)` in one pass, `none` for empty input.
pub fn min_max() -> Stage {
    extreme("min_max", Pick::Both, None)
}

pub fn min_max_by<F>(less: F) -> Stage
where
    F: FnMut(&Value, &Value) -> bool + Clone + 'static,
{
    extreme("min_max_by", Pick::Both, Some(boxed(less)))
}

fn extreme(name: &'static str, pick: Pick, less: Option<Box<dyn Fn() -> Less>>) -> Stage {
    Stage::new(FoldDescriptor {
        name,
        spec: FoldSpec::Extreme { pick, less },
    })
}

fn boxed<F>(less: F) -> Box<dyn Fn() -> Less>
where
    F: FnMut(&Value, &Value) -> bool + Clone + 'static,
{
    Box::new(move || Box::new(less.clone()) as Less)
}

fn natural() -> Less {
    Box::new(|a: &Value, b: &Value| a < b)
}

// ─── Descriptor ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pick {
    Min,
    Max,
    Both,
}

enum FoldSpec {
    With {
        init: Value,
        kind: Kind,
        make: Box<dyn Fn() -> Op>,
    },
    Sum,
    Count,
    Extreme {
        pick: Pick,
        less: Option<Box<dyn Fn() -> Less>>,
    },
}

struct FoldDescriptor {
    name: &'static str,
    spec: FoldSpec,
}

impl StageDescriptor for FoldDescriptor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_COMPLETE
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        let element = input.packed_kind();
        let (state, kind) = match &self.spec {
            FoldSpec::With { init, kind, make } => (
                State::With {
                    acc: init.clone(),
                    op: make(),
                },
                kind.clone(),
            ),
            FoldSpec::Sum => match element.zero() {
                Some(zero) => (State::Sum(zero), element),
                None => (State::Sum(Value::Unit), Kind::Any),
            },
            FoldSpec::Count => (State::Count(0), Kind::Int),
            FoldSpec::Extreme { pick, less } => {
                let less = less.as_ref().map_or_else(natural, |make| make());
                let kind = match pick {
                    Pick::Both => Kind::Tuple(vec![element.clone(), element]),
                    Pick::Min | Pick::Max => element,
                };
                (
                    State::Extreme {
                        pick: *pick,
                        less,
                        best: None,
                    },
                    Kind::Optional(Box::new(kind)),
                )
            }
        };
        let instance = Fold {
            state,
            path: cx.path().to_string(),
        };
        Ok(Bound::new(instance, Shape::single(Slot::owned(kind))))
    }
}

// ─── Instance ───────────────────────────────────────────────────────────────

enum State {
    With { acc: Value, op: Op },
    Sum(Value),
    Count(i64),
    Extreme {
        pick: Pick,
        less: Less,
        /// `(min, max)`; only the side selected by `pick` is meaningful.
        best: Option<(Value, Value)>,
    },
}

struct Fold {
    state: State,
    path: String,
}

/// Call `f` on a view of the element, packing multi-position elements.
fn with_view<T>(input: Bundle<'_>, f: impl FnOnce(&Value) -> T) -> T {
    if let [arg] = input.args() {
        return f(arg.view());
    }
    f(&input.pack())
}

impl Fold {
    fn observe(&mut self, input: Bundle<'_>) -> Result<()> {
        match &mut self.state {
            State::With { acc, op } => {
                let seed = mem::take(acc);
                *acc = with_view(input, |x| op(seed, x));
            }
            State::Sum(acc) => {
                let x = input.pack();
                let rhs = x.type_name();
                acc.try_add_assign(x).map_err(|e| {
                    let (code, message) = match e {
                        AddError::Overflow => (ErrorCode::Overflow, format!("sum overflows at {acc}")),
                        AddError::Incompatible => (
                            ErrorCode::TypeMismatch,
                            format!("cannot add {rhs} to {}", acc.type_name()),
                        ),
                    };
                    PipelineError::Runtime(StageError::new(code, self.path.clone(), message))
                })?;
            }
            State::Count(n) => *n += 1,
            State::Extreme { pick, less, best } => match best {
                None => {
                    let x = input.pack();
                    *best = Some((x.clone(), x));
                }
                Some((lo, hi)) => {
                    let (below, above) = with_view(input.share(), |x| {
                        let below = *pick != Pick::Max && less(x, lo);
                        let above = *pick != Pick::Min && !below && less(hi, x);
                        (below, above)
                    });
                    if below {
                        *lo = input.pack();
                    } else if above {
                        *hi = input.pack();
                    }
                }
            },
        }
        Ok(())
    }

    fn result(&mut self) -> Value {
        match mem::replace(&mut self.state, State::Count(0)) {
            State::With { acc, .. } | State::Sum(acc) => acc,
            State::Count(n) => Value::Int(n),
            State::Extreme { pick, best, .. } => Value::Optional(best.map(|(lo, hi)| {
                Box::new(match pick {
                    Pick::Min => lo,
                    Pick::Max => hi,
                    Pick::Both => Value::Tuple(vec![lo, hi]),
                })
            })),
        }
    }
}

impl StageInstance for Fold {
    fn process_incremental(&mut self, input: Bundle<'_>, _next: Next<'_>) -> Result<()> {
        self.observe(input)
    }

    fn end(&mut self, next: Next<'_>) -> Result<Finalized<'static>> {
        let value = self.result();
        next.process_complete(Bundle::owned(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::apply;
    use crate::source::{iota_range, Source};
    use crate::stages::{enumerate, filter};

    fn key(v: &Value) -> i64 {
        v.as_tuple()
            .and_then(|t| t.first())
            .and_then(Value::as_int)
            .unwrap_or(0)
    }

    #[test]
    fn test_count_empty_and_nonempty() {
        let out = apply(Value::list(Vec::<i64>::new()), count()).unwrap();
        assert_eq!(out.into_value(), Value::from(0));
        let out = apply(iota_range(0, 5), count()).unwrap();
        assert_eq!(out.into_value(), Value::from(5));
    }

    #[test]
    fn test_sum_ints_and_strings() {
        let out = apply(Value::list([1, 2, 3, 4]), sum()).unwrap();
        assert_eq!(out.into_value(), Value::from(10));
        let out = apply(Value::list(["ab", "c"]), sum()).unwrap();
        assert_eq!(out.into_value(), Value::from("abc"));
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let out = apply(
            Value::list([1, 3]),
            (filter(|x: &Value| x.as_int() == Some(2)), sum()),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::from(0));
    }

    #[test]
    fn test_sum_mismatch_is_runtime_error() {
        let err = apply(Value::list([Value::from(1), Value::from("x")]), sum()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_sum_overflow_is_runtime_error() {
        let err = apply(Value::list([i64::MAX, 1]), sum()).unwrap_err();
        assert!(matches!(err, PipelineError::Runtime(_)));
        assert_eq!(err.code(), ErrorCode::Overflow);
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_accumulate_product() {
        let out = apply(
            Value::list([2, 3, 4]),
            accumulate(1, |acc: Value, x: &Value| {
                acc.as_int().unwrap_or(0) * x.as_int().unwrap_or(0)
            }),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::from(24));
    }

    #[test]
    fn test_min_max_over_borrowed() {
        let data = Value::list([4, 9, 1, 7]);
        let lo = apply(Source::borrowed(&data), min()).unwrap();
        assert_eq!(lo.into_value(), Value::some(1));
        let hi = apply(Source::borrowed(&data), max()).unwrap();
        assert_eq!(hi.into_value(), Value::some(9));
        let both = apply(Source::borrowed(&data), min_max()).unwrap();
        assert_eq!(both.into_value(), Value::some(Value::pair(1, 9)));
    }

    #[test]
    fn test_extremes_of_empty_are_none() {
        let out = apply(
            Value::list([1, 3]),
            (filter(|x: &Value| x.as_int() == Some(2)), min_max()),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::none());
    }

    #[test]
    fn test_ties_keep_first() {
        let input = Value::list([
            Value::pair(1, "a"),
            Value::pair(3, "b"),
            Value::pair(1, "c"),
            Value::pair(3, "d"),
        ]);
        let by_key = |a: &Value, b: &Value| key(a) < key(b);
        let lo = apply(&input, min_by(by_key)).unwrap();
        assert_eq!(lo.into_value(), Value::some(Value::pair(1, "a")));
        let hi = apply(&input, max_by(by_key)).unwrap();
        assert_eq!(hi.into_value(), Value::some(Value::pair(3, "b")));
    }

    #[test]
    fn test_fold_packs_multi_position_elements() {
        let out = apply(Value::list(["x", "y", "z"]), (enumerate(), max())).unwrap();
        assert_eq!(out.into_value(), Value::some(Value::pair(2, "z")));
    }

    #[test]
    fn test_result_kinds() {
        let cx = BindContext::new(std::rc::Rc::new(crate::pipeline::EngineConfig::default()));
        let input = Shape::single(Slot::owned(Kind::Int));
        let bound = min_max().descriptor().bind(&input, &cx).unwrap();
        assert_eq!(bound.output.packed_kind().to_string(), "optional<tuple<int, int>>");
        let bound = count().descriptor().bind(&input, &cx).unwrap();
        assert_eq!(bound.output.packed_kind(), Kind::Int);
    }
}
