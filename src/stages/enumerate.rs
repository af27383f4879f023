//! Element numbering.

use crate::bundle::Bundle;
use crate::ownership::Arg;
use crate::pipeline::{
    BindContext, Bound, Next, Result, Shape, Slot, Stage, StageDescriptor, StageInstance, Style,
};
use crate::value::{Kind, Value};

/// Prepend a running index, starting at 0, to every element.
pub fn enumerate() -> Stage {
    enumerate_from(0)
}

/// Prepend a running index starting at `start`.
///
/// The index is lent to downstream stages as a shared borrow of the
/// enumerator's counter; stages that keep it take a copy.
pub fn enumerate_from(start: i64) -> Stage {
    Stage::new(EnumerateDescriptor { start })
}

struct EnumerateDescriptor {
    start: i64,
}

impl StageDescriptor for EnumerateDescriptor {
    fn name(&self) -> &'static str {
        "enumerate"
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn bind(&self, input: &Shape, _cx: &BindContext) -> Result<Bound> {
        Ok(Bound::new(
            Enumerate { next: self.start },
            input.clone().prepend(Slot::borrowed(Kind::Int)),
        ))
    }
}

struct Enumerate {
    next: i64,
}

impl StageInstance for Enumerate {
    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        let index = Value::Int(self.next);
        self.next = self.next.wrapping_add(1);
        next.process_incremental(input.prepend(Arg::Ref(&index)))
    }
}
