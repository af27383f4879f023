//! Flattening of the last bundle position.

use std::ops::ControlFlow;

use crate::bundle::{Bundle, FlattenMode};
use crate::pipeline::chain::conform;
use crate::pipeline::{
    BindContext, Bound, ErrorCode, Next, PipelineError, Result, Shape, Slot, Stage,
    StageDescriptor, StageError, StageInstance, Style, ValidationDiagnostic,
};

/// Iterate the last position of every element, emitting the other
/// positions followed by each inner element.
///
/// The other positions are shown to every inner element, so owned ones are
/// lent as shared borrows: `(row, [1, 2])` becomes `(&row, 1)` and
/// `(&row, 2)`.
pub fn flatten() -> Stage {
    Stage::new(FlattenDescriptor {
        mode: FlattenMode::Safe,
    })
}

/// Like [`flatten`], but the other positions keep their provenance. The
/// first consumer that moves an owned position leaves `()` for the inner
/// elements after it.
pub fn flatten_forward() -> Stage {
    Stage::new(FlattenDescriptor {
        mode: FlattenMode::Forward,
    })
}

struct FlattenDescriptor {
    mode: FlattenMode,
}

impl StageDescriptor for FlattenDescriptor {
    fn name(&self) -> &'static str {
        match self.mode {
            FlattenMode::Safe => "flatten",
            FlattenMode::Forward => "flatten_forward",
        }
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn check(&self, path: &str) -> Vec<ValidationDiagnostic> {
        match self.mode {
            FlattenMode::Safe => Vec::new(),
            FlattenMode::Forward => vec![ValidationDiagnostic::warning(
                StageError::new(
                    ErrorCode::RiskyStage,
                    path,
                    "flatten_forward lets a consumer move a position shared by several elements",
                )
                .with_hint("use flatten() unless every downstream stage only reads"),
            )],
        }
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        let mut rest = input.clone().into_slots();
        let last = rest.pop().ok_or_else(|| {
            cx.error(ErrorCode::UnsupportedShape, "cannot flatten an element with no positions")
        })?;
        let elements = Shape::single(last.clone()).element_shape().ok_or_else(|| {
            PipelineError::Bind(
                StageError::new(
                    ErrorCode::NotIterable,
                    cx.path(),
                    format!("{} iterates the last position, but {last} is not iterable", self.name()),
                )
                .with_hint("produce a list or range in the last position, e.g. with zip_result()"),
            )
        })?;

        let effect = self.mode.effect();
        let mut slots = rest
            .iter()
            .map(|s| s.after(effect))
            .collect::<std::result::Result<Vec<Slot>, _>>()
            .map_err(|e| PipelineError::internal(cx.path(), e.to_string()))?;
        slots.extend(elements.into_slots());

        let instance = Flatten {
            mode: self.mode,
            arity: slots.len(),
            path: cx.path().to_string(),
        };
        Ok(Bound::new(instance, Shape::new(slots)))
    }
}

struct Flatten {
    mode: FlattenMode,
    arity: usize,
    path: String,
}

impl StageInstance for Flatten {
    fn process_incremental(&mut self, input: Bundle<'_>, mut next: Next<'_>) -> Result<()> {
        let arity = self.arity;
        let path = self.path.as_str();
        input.flatten(self.mode, path, |element| {
            let element = conform(element, arity, path)?;
            next.reborrow().process_incremental(element)?;
            Ok(if next.done() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
    }
}
