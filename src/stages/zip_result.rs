//! Append a computed position.

use crate::bundle::{Bundle, ViewFn};
use crate::ownership::Arg;
use crate::pipeline::{
    BindContext, Bound, Next, Result, Shape, Slot, Stage, StageDescriptor, StageInstance, Style,
};
use crate::value::IntoValue;

use super::{callback_arity_error, expect_arity};

/// Emit every element with `f(element)` appended as an owned position.
///
/// `f` reads the element through a shared view; the original positions are
/// forwarded untouched.
pub fn zip_result<M, F>(f: F) -> Stage
where
    M: 'static,
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    Stage::new(ZipResultDescriptor {
        f,
        _marker: std::marker::PhantomData,
    })
}

struct ZipResultDescriptor<M, F> {
    f: F,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageDescriptor for ZipResultDescriptor<M, F>
where
    M: 'static,
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    fn name(&self) -> &'static str {
        "zip_result"
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        expect_arity(cx, "zip_result", F::ARITY, input)?;
        let instance = ZipResult {
            f: self.f.clone(),
            path: cx.path().to_string(),
            _marker: std::marker::PhantomData,
        };
        Ok(Bound::new(
            instance,
            input.clone().push(Slot::owned(F::Output::kind())),
        ))
    }
}

struct ZipResult<M, F> {
    f: F,
    path: String,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageInstance for ZipResult<M, F>
where
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        let out = input
            .invoke_view(&mut self.f)
            .ok_or_else(|| callback_arity_error(&self.path, "zip_result"))?;
        next.process_incremental(input.push(Arg::Owned(out.into_value())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::apply;
    use crate::stages::to_vec;
    use crate::value::Value;

    #[test]
    fn test_zip_result_appends_owned_position() {
        let out = apply(
            Value::list([2, 3]),
            (zip_result(|x: &Value| x.as_int().map_or(0, |i| i * i)), to_vec()),
        )
        .unwrap();
        assert_eq!(
            out.into_value(),
            Value::list([Value::pair(2, 4), Value::pair(3, 9)])
        );
    }

    #[test]
    fn test_zip_result_over_two_positions() {
        let out = apply(
            Value::list([Value::pair(1, 2)]),
            (
                crate::stages::expand(),
                zip_result(|a: &Value, b: &Value| {
                    a.as_int().unwrap_or(0) + b.as_int().unwrap_or(0)
                }),
                to_vec(),
            ),
        )
        .unwrap();
        assert_eq!(
            out.into_value(),
            Value::list([Value::tuple(vec![1.into(), 2.into(), 3.into()])])
        );
    }
}
