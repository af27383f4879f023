//! In-place sorting of complete lists.
//!
//! Sorting mutates its input: an owned list is sorted and moved on, a
//! mutably borrowed source is sorted where it lives. A shared borrow is
//! rejected when the chain is built.

use std::cmp::Ordering;

use crate::bundle::Bundle;
use crate::ownership::{Effect, Finalized};
use crate::pipeline::{
    BindContext, Bound, ErrorCode, Next, PipelineError, Result, Shape, Stage, StageDescriptor,
    StageError, StageInstance, Style,
};
use crate::value::{Kind, Value};

type Less = Box<dyn FnMut(&Value, &Value) -> bool>;

/// Sort ascending. Equal elements may be reordered.
pub fn sort() -> Stage {
    Stage::new(SortDescriptor {
        name: "sort",
        stable: false,
        less: None,
    })
}

/// Sort ascending, keeping equal elements in input order.
pub fn stable_sort() -> Stage {
    Stage::new(SortDescriptor {
        name: "stable_sort",
        stable: true,
        less: None,
    })
}

/// Sort by a strict "less than" predicate.
pub fn sort_by<F>(less: F) -> Stage
where
    F: FnMut(&Value, &Value) -> bool + Clone + 'static,
{
    Stage::new(SortDescriptor {
        name: "sort_by",
        stable: false,
        less: Some(boxed(less)),
    })
}

/// [`sort_by`], keeping equal elements in input order.
pub fn stable_sort_by<F>(less: F) -> Stage
where
    F: FnMut(&Value, &Value) -> bool + Clone + 'static,
{
    Stage::new(SortDescriptor {
        name: "stable_sort_by",
        stable: true,
        less: Some(boxed(less)),
    })
}

fn boxed<F>(less: F) -> Box<dyn Fn() -> Less>
where
    F: FnMut(&Value, &Value) -> bool + Clone + 'static,
{
    Box::new(move || Box::new(less.clone()) as Less)
}

struct SortDescriptor {
    name: &'static str,
    stable: bool,
    /// Makes a fresh comparator for every bound instance.
    less: Option<Box<dyn Fn() -> Less>>,
}

impl StageDescriptor for SortDescriptor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn style(&self) -> Style {
        Style::COMPLETE_TO_COMPLETE
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        let sortable = match input.slots() {
            [slot] => matches!(slot.kind, Kind::List(_) | Kind::Any),
            _ => false,
        };
        if !sortable {
            return Err(PipelineError::Bind(
                StageError::new(
                    ErrorCode::NotSortable,
                    cx.path(),
                    format!("{} needs a list, found {input}", self.name),
                )
                .with_hint("collect the elements with to_vec() first"),
            ));
        }

        let output = input.apply(Effect::Mutate).map_err(|e| {
            PipelineError::Bind(
                StageError::new(
                    ErrorCode::ImmutableSource,
                    cx.path(),
                    format!("{} cannot reorder {input}: {e}", self.name),
                )
                .with_hint("pass the source with Source::borrowed_mut or as an owned value"),
            )
        })?;

        let instance = Sort {
            stable: self.stable,
            less: self.less.as_ref().map(|make| make()),
            path: cx.path().to_string(),
        };
        Ok(Bound::new(instance, output))
    }
}

struct Sort {
    stable: bool,
    less: Option<Less>,
    path: String,
}

impl Sort {
    fn sort(&mut self, items: &mut [Value]) {
        match (&mut self.less, self.stable) {
            (None, false) => items.sort_unstable(),
            (None, true) => items.sort(),
            (Some(less), false) => items.sort_unstable_by(|a, b| order(less, a, b)),
            (Some(less), true) => items.sort_by(|a, b| order(less, a, b)),
        }
    }
}

fn order(less: &mut Less, a: &Value, b: &Value) -> Ordering {
    if less(a, b) {
        Ordering::Less
    } else if less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

impl StageInstance for Sort {
    fn process_complete<'e>(&mut self, input: Bundle<'e>, next: Next<'_>) -> Result<Finalized<'e>> {
        let mut arg = input
            .into_single()
            .map_err(|b| PipelineError::internal(&self.path, format!("sort received {} positions", b.arity())))?;

        let Some(value) = arg.view_mut() else {
            return Err(PipelineError::Runtime(StageError::new(
                ErrorCode::ImmutableSource,
                self.path.clone(),
                "cannot sort through a shared borrow",
            )));
        };
        let Some(items) = value.as_list_mut() else {
            return Err(PipelineError::Runtime(StageError::new(
                ErrorCode::NotSortable,
                self.path.clone(),
                format!("cannot sort a {} value", value.type_name()),
            )));
        };
        self.sort(items);

        next.process_complete(Bundle::single(arg))
    }
}
