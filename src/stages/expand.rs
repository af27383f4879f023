//! Tuple expansion into bundle positions.

use crate::bundle::{shape_violation, Bundle};
use crate::ownership::Finalized;
use crate::pipeline::{
    BindContext, Bound, ErrorCode, Next, PipelineError, Result, Shape, Slot, Stage,
    StageDescriptor, StageError, StageInstance, Style,
};
use crate::value::Kind;

/// Splice every tuple-kinded position into one position per item.
///
/// Items keep the provenance of the tuple they came from, so expanding a
/// borrowed `(a, b)` yields two borrowed positions. Positions of any other
/// kind are left as they are. A position of unknown (`any`) kind is
/// rejected, since the number of positions it would expand to is only known
/// at run time.
pub fn expand() -> Stage {
    Stage::new(ExpandDescriptor { complete: false })
}

/// [`expand`] applied to a complete value.
pub fn expand_complete() -> Stage {
    Stage::new(ExpandDescriptor { complete: true })
}

struct ExpandDescriptor {
    complete: bool,
}

impl StageDescriptor for ExpandDescriptor {
    fn name(&self) -> &'static str {
        if self.complete {
            "expand_complete"
        } else {
            "expand"
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
        let mut plan = Vec::with_capacity(input.arity());
        let mut slots = Vec::new();
        for slot in input.slots() {
            match &slot.kind {
                Kind::Tuple(items) => {
                    plan.push(true);
                    slots.extend(items.iter().map(|kind| Slot {
                        kind: kind.clone(),
                        ..slot.clone()
                    }));
                }
                Kind::Any => {
                    return Err(PipelineError::Bind(
                        StageError::new(
                            ErrorCode::UnsupportedShape,
                            cx.path(),
                            format!("{} cannot expand a position of unknown kind in {input}", self.name()),
                        )
                        .with_hint("return a Rust tuple such as (a, b) from the callback so its arity is known"),
                    ));
                }
                _ => {
                    plan.push(false);
                    slots.push(slot.clone());
                }
            }
        }
        let instance = Expand {
            plan,
            path: cx.path().to_string(),
        };
        Ok(Bound::new(instance, Shape::new(slots)))
    }
}

struct Expand {
    plan: Vec<bool>,
    path: String,
}

impl Expand {
    fn apply<'e>(&self, input: Bundle<'e>) -> Result<Bundle<'e>> {
        let offending = self
            .plan
            .iter()
            .zip(input.args())
            .find(|(expand, arg)| **expand && arg.view().as_tuple().is_none())
            .map(|(_, arg)| shape_violation(&self.path, "a tuple", arg.view()));
        if let Some(err) = offending {
            return Err(err);
        }
        input
            .expand(&self.plan)
            .ok_or_else(|| PipelineError::internal(&self.path, "tuple expansion failed"))
    }
}

impl StageInstance for Expand {
    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        let out = self.apply(input)?;
        next.process_incremental(out)
    }

    fn process_complete<'e>(&mut self, input: Bundle<'e>, next: Next<'_>) -> Result<Finalized<'e>> {
        let out = self.apply(input)?;
        next.process_complete(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::{Arg, Provenance};
    use crate::pipeline::apply;
    use crate::source::Source;
    use crate::stages::{to_vec, transform};
    use crate::value::Value;

    #[test]
    fn test_expand_keeps_borrowed_provenance() {
        let rows = Value::list([Value::pair(1, "a")]);
        let out = apply(
            Source::borrowed(&rows),
            (
                expand(),
                transform(|a: Arg<'_>, b: Arg<'_>| {
                    a.provenance() == Provenance::Borrowed && b.provenance() == Provenance::Borrowed
                }),
                to_vec(),
            ),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::list([true]));
    }

    #[test]
    fn test_expand_complete_splits_result() {
        let out = apply(Value::pair(3, 4), expand_complete()).unwrap();
        assert_eq!(out.arity(), 2);
        assert_eq!(out.into_values(), vec![Value::from(3), Value::from(4)]);
    }

    #[test]
    fn test_non_tuple_positions_pass_through() {
        let out = apply(Value::list([5, 6]), (expand(), to_vec())).unwrap();
        assert_eq!(out.into_value(), Value::list([5, 6]));
    }

    #[test]
    fn test_unknown_kind_rejected_at_bind() {
        let err = apply(
            Value::list([1]),
            (transform(|x: &Value| Value::pair(x.clone(), 0)), expand(), to_vec()),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Bind(_)));
        let located = err.stage_error().unwrap();
        assert_eq!(located.code, ErrorCode::UnsupportedShape);
        assert_eq!(located.path, "/stages/1");
        assert!(located.hint.is_some());
    }

    #[test]
    fn test_typed_tuple_from_callback_expands() {
        let out = apply(
            Value::list([1, 2]),
            (
                transform(|x: &Value| (x.as_int().unwrap_or(0), x.as_int().unwrap_or(0) * 2)),
                expand(),
                transform(|a: &Value, b: &Value| Value::list([a.clone(), b.clone()])),
                to_vec(),
            ),
        )
        .unwrap();
        assert_eq!(
            out.into_value(),
            Value::list([Value::list([1, 2]), Value::list([2, 4])])
        );
    }

    #[test]
    fn test_make_tuple_then_expand_restores_positions() {
        let out = apply(
            Value::list(["a", "b"]),
            (
                crate::stages::enumerate(),
                crate::stages::make_tuple(),
                expand(),
                transform(|i: &Value, s: &Value| format!("{i}{}", s.as_str().unwrap_or_default())),
                to_vec(),
            ),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::list(["0a", "1b"]));
    }
}
