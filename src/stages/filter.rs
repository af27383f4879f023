//! Element filtering.

use crate::bundle::{Bundle, ViewFn};
use crate::pipeline::{
    BindContext, Bound, Next, Result, Shape, Stage, StageDescriptor, StageInstance, Style,
};

use super::{callback_arity_error, expect_arity};

/// Pass on the elements for which `predicate` holds.
///
/// The predicate only reads (access by shared view); accepted elements are
/// forwarded with their provenance unchanged.
pub fn filter<M, F>(predicate: F) -> Stage
where
    M: 'static,
    F: ViewFn<M, Output = bool>,
{
    Stage::new(FilterDescriptor {
        predicate,
        _marker: std::marker::PhantomData,
    })
}

struct FilterDescriptor<M, F> {
    predicate: F,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageDescriptor for FilterDescriptor<M, F>
where
    M: 'static,
    F: ViewFn<M, Output = bool>,
{
    fn name(&self) -> &'static str {
        "filter"
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        expect_arity(cx, "filter", F::ARITY, input)?;
        Ok(Bound::new(
            Filter {
                predicate: self.predicate.clone(),
                path: cx.path().to_string(),
                _marker: std::marker::PhantomData,
            },
            input.clone(),
        ))
    }
}

struct Filter<M, F> {
    predicate: F,
    path: String,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageInstance for Filter<M, F>
where
    F: ViewFn<M, Output = bool>,
{
    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        let keep = input
            .invoke_view(&mut self.predicate)
            .ok_or_else(|| callback_arity_error(&self.path, "filter"))?;
        if keep {
            next.process_incremental(input)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::ownership::Provenance;
    use crate::pipeline::apply;
    use crate::source::Source;
    use crate::stages::{to_vec, transform};
    use crate::value::Value;
    use crate::Arg;

    fn even(x: &Value) -> bool {
        x.as_int().map_or(false, |i| i % 2 == 0)
    }

    #[test]
    fn test_filter_keeps_matching_in_order() {
        let out = apply(Value::list([5, 2, 8, 3, 4]), (filter(even), to_vec())).unwrap();
        assert_eq!(out.into_value(), Value::list([2, 8, 4]));
    }

    #[test]
    fn test_filter_forwards_provenance() {
        let data = Value::list([1, 2]);
        let out = apply(
            Source::borrowed(&data),
            (
                filter(|_: &Value| true),
                transform(|a: Arg<'_>| a.provenance() == Provenance::Borrowed),
                to_vec(),
            ),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::list([true, true]));
    }

    #[test]
    fn test_filter_over_map_entries() {
        let mut map = BTreeMap::new();
        map.insert(Value::from("a"), Value::from(1));
        map.insert(Value::from("b"), Value::from(2));
        let out = apply(
            Value::Map(map),
            (filter(|_k: &Value, v: &Value| even(v)), to_vec()),
        )
        .unwrap();
        assert_eq!(out.into_value(), Value::list([Value::pair("b", 2)]));
    }
}
