//! Return-by-reference marking.

use crate::bundle::Bundle;
use crate::ownership::{Arg, Finalized};
use crate::pipeline::{
    BindContext, Bound, Next, Result, Shape, Stage, StageDescriptor, StageInstance, Style,
};

/// Mark every position of a complete value for return by reference.
///
/// Finalize normally copies borrowed positions into owned results. Marked
/// positions instead come back as live references to the caller's data;
/// owned positions are returned as values either way.
pub fn by_ref() -> Stage {
    Stage::new(ByRefDescriptor)
}

struct ByRefDescriptor;

impl StageDescriptor for ByRefDescriptor {
    fn name(&self) -> &'static str {
        "by_ref"
    }

    fn style(&self) -> Style {
        Style::COMPLETE_TO_COMPLETE
    }

    fn bind(&self, input: &Shape, _cx: &BindContext) -> Result<Bound> {
        let output = Shape::new(
            input
                .slots()
                .iter()
                .map(|slot| slot.clone().with_by_ref())
                .collect(),
        );
        Ok(Bound::new(ByRef, output))
    }
}

struct ByRef;

impl StageInstance for ByRef {
    fn process_complete<'e>(&mut self, input: Bundle<'e>, next: Next<'_>) -> Result<Finalized<'e>> {
        let marked = input.into_args().into_iter().map(Arg::by_ref).collect();
        next.process_complete(Bundle::new(marked))
    }
}
