//! Fan-out into parallel sub-chains.

use crate::bundle::Bundle;
use crate::ownership::Finalized;
use crate::pipeline::{
    build_chain, BindContext, Bound, Chain, Composition, ErrorCode, Feed, IntoBranches, Next,
    Result, Shape, Slot, Stage, StageDescriptor, StageError, StageInstance, Style,
    ValidationDiagnostic,
};
use crate::value::{Kind, Value};

/// Feed every element to each branch and emit the tuple of branch results.
///
/// Branches see every element through a shared view, so none of them can
/// consume what the others still need. A branch that reports done stops
/// receiving elements; the tee itself is done once every branch is.
///
/// ```
/// use sluice::{apply, count, max, tee, Value};
///
/// let out = apply(Value::list([5, 6, 8, 7]), tee((count(), max()))).unwrap();
/// assert_eq!(out.into_value(), Value::pair(4, Value::some(8)));
/// ```
pub fn tee(branches: impl IntoBranches) -> Stage {
    Stage::new(TeeDescriptor {
        branches: branches.into_branches(),
    })
}

struct TeeDescriptor {
    branches: Vec<Composition>,
}

impl StageDescriptor for TeeDescriptor {
    fn name(&self) -> &'static str {
        "tee"
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_COMPLETE
    }

    fn check(&self, path: &str) -> Vec<ValidationDiagnostic> {
        if self.branches.is_empty() {
            vec![ValidationDiagnostic::error(StageError::new(
                ErrorCode::UnsupportedShape,
                path,
                "tee needs at least one branch",
            ))]
        } else {
            Vec::new()
        }
    }

    fn stage_count(&self) -> usize {
        1 + self
            .branches
            .iter()
            .map(Composition::stage_count)
            .sum::<usize>()
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        let elements = input.shared();
        let mut chains = Vec::with_capacity(self.branches.len());
        let mut kinds = Vec::with_capacity(self.branches.len());
        for (j, branch) in self.branches.iter().enumerate() {
            let bcx = cx.nested(&format!("/branches/{j}"));
            let chain = build_chain(Feed::Elements(elements.clone()), branch, &bcx)?;
            kinds.push(chain.result().packed_kind());
            chains.push(chain);
        }
        debug_event!(path = cx.path(), branches = chains.len(), "tee bound");
        Ok(Bound::new(
            Tee { chains },
            Shape::single(Slot::owned(Kind::Tuple(kinds))),
        ))
    }
}

struct Tee {
    chains: Vec<Chain>,
}

impl StageInstance for Tee {
    fn done(&self) -> bool {
        self.chains.iter().all(Chain::done)
    }

    fn process_incremental(&mut self, input: Bundle<'_>, _next: Next<'_>) -> Result<()> {
        for chain in self.chains.iter_mut().filter(|c| !c.done()) {
            chain.push(input.share())?;
        }
        Ok(())
    }

    fn end(&mut self, next: Next<'_>) -> Result<Finalized<'static>> {
        let results = self
            .chains
            .iter_mut()
            .map(|chain| chain.finish().map(Finalized::into_value))
            .collect::<Result<Vec<Value>>>()?;
        next.process_complete(Bundle::owned(Value::Tuple(results)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{apply, PipelineError};
    use crate::source::iota;
    use crate::stages::{count, filter, max, sort, sum, take_n, to_vec};

    fn even(x: &Value) -> bool {
        x.as_int().map_or(false, |i| i % 2 == 0)
    }

    #[test]
    fn test_tee_count_and_max() {
        let out = apply(Value::list([5, 6, 8, 7]), tee((count(), max()))).unwrap();
        assert_eq!(out.into_value(), Value::pair(4, Value::some(8)));
    }

    #[test]
    fn test_branches_are_independent() {
        let out = apply(
            Value::list([1, 2, 3, 4]),
            tee(((filter(even), to_vec()), sum())),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::pair(Value::list([2, 4]), 10));
    }

    #[test]
    fn test_tee_done_when_all_branches_done() {
        let out = apply(
            iota(0),
            tee(((take_n(2), to_vec()), (take_n(3), count()))),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::pair(Value::list([0, 1]), 3));
    }

    #[test]
    fn test_branch_error_path_is_nested() {
        let err = apply(Value::list([1]), tee((count(), (sort(), to_vec())))).unwrap_err();
        let located = err.stage_error().unwrap();
        assert_eq!(located.code, ErrorCode::IncompatibleStyle);
        assert_eq!(located.path, "/stages/0/branches/1/stages/0");
        assert!(matches!(err, PipelineError::Rejected(_)));
    }

    #[test]
    fn test_empty_tee_rejected() {
        let err = apply(Value::list([1]), tee(Vec::<Stage>::new())).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedShape);
    }
}
