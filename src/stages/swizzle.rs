//! Position selection and reordering.

use std::collections::BTreeSet;

use crate::bundle::Bundle;
use crate::pipeline::{
    BindContext, Bound, ErrorCode, Next, PipelineError, Result, Shape, Stage, StageDescriptor,
    StageError, StageInstance, Style, ValidationDiagnostic,
};

/// Emit the positions at `indices`, in that order. Positions not listed are
/// dropped.
///
/// `swizzle([1, 2, 0])` turns `(a, b, c)` into `(b, c, a)`. An index may be
/// listed only once, since each position can only be handed on once.
pub fn swizzle<I>(indices: I) -> Stage
where
    I: IntoIterator<Item = usize>,
{
    Stage::new(SwizzleDescriptor {
        indices: indices.into_iter().collect(),
    })
}

struct SwizzleDescriptor {
    indices: Vec<usize>,
}

impl SwizzleDescriptor {
    fn duplicate(&self) -> Option<usize> {
        let mut seen = BTreeSet::new();
        self.indices.iter().copied().find(|&i| !seen.insert(i))
    }
}

impl StageDescriptor for SwizzleDescriptor {
    fn name(&self) -> &'static str {
        "swizzle"
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn check(&self, path: &str) -> Vec<ValidationDiagnostic> {
        let mut out = Vec::new();
        if self.indices.is_empty() {
            out.push(ValidationDiagnostic::error(StageError::new(
                ErrorCode::UnsupportedShape,
                path,
                "swizzle needs at least one index",
            )));
        }
        if let Some(i) = self.duplicate() {
            out.push(ValidationDiagnostic::error(
                StageError::new(
                    ErrorCode::DuplicateIndex,
                    path,
                    format!("swizzle index {i} is listed more than once"),
                )
                .with_hint("copy the value with transform() to use it twice"),
            ));
        }
        out
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        if let Some(i) = self.duplicate() {
            return Err(cx.error(
                ErrorCode::DuplicateIndex,
                format!("swizzle index {i} is listed more than once"),
            ));
        }
        let mut slots = Vec::with_capacity(self.indices.len());
        for &i in &self.indices {
            let slot = input.slot(i).ok_or_else(|| {
                PipelineError::Bind(StageError::new(
                    ErrorCode::IndexOutOfRange,
                    cx.path(),
                    format!("swizzle index {i} is out of range for elements {input}"),
                ))
            })?;
            slots.push(slot.clone());
        }
        let instance = Swizzle {
            indices: self.indices.clone(),
            path: cx.path().to_string(),
        };
        Ok(Bound::new(instance, Shape::new(slots)))
    }
}

struct Swizzle {
    indices: Vec<usize>,
    path: String,
}

impl StageInstance for Swizzle {
    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        let arity = input.arity();
        let selected = input.select(&self.indices).ok_or_else(|| {
            PipelineError::Runtime(StageError::new(
                ErrorCode::IndexOutOfRange,
                self.path.clone(),
                format!("element of {arity} positions does not fit {:?}", self.indices),
            ))
        })?;
        next.process_incremental(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::Arg;
    use crate::pipeline::apply;
    use crate::stages::{enumerate, expand, to_vec, transform};
    use crate::value::Value;

    #[test]
    fn test_swizzle_reorders() {
        let rows = Value::list([Value::tuple(vec![1.into(), 2.into(), 3.into()])]);
        let out = apply(
            rows,
            (expand(), swizzle([1, 2, 0]), to_vec()),
        )
        .unwrap();
        assert_eq!(
            out.into_value(),
            Value::list([Value::tuple(vec![2.into(), 3.into(), 1.into()])])
        );
    }

    #[test]
    fn test_swizzle_drops_positions_and_keeps_provenance() {
        let out = apply(
            Value::list(["a"]),
            (
                enumerate(),
                swizzle([1]),
                transform(|a: Arg<'_>| a.provenance().to_string()),
                to_vec(),
            ),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::list(["owned"]));
    }

    #[test]
    fn test_index_out_of_range_at_bind() {
        let err = apply(Value::list([1]), (swizzle([0, 1]), to_vec())).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IndexOutOfRange);
        assert!(matches!(err, PipelineError::Bind(_)));
    }

    #[test]
    fn test_empty_swizzle_rejected() {
        let err = apply(Value::list([1]), (swizzle([]), to_vec())).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedShape);
    }
}
