//! Element iteration with provenance.
//!
//! Iterating a value yields elements whose provenance follows the value's:
//! an owned container is consumed and yields owned elements, a mutably
//! borrowed one yields mutable borrows wherever the container allows it, and
//! a shared borrow yields shared borrows. Ranges always yield owned integers.

use std::ops::ControlFlow;

use crate::bundle::Bundle;
use crate::ownership::Arg;
use crate::pipeline::{ErrorCode, PipelineError, Result, StageError};
use crate::value::Value;

use super::Generator;

type Emit<'f, 'e> = dyn FnMut(Bundle<'e>) -> Result<ControlFlow<()>> + 'f;

fn not_iterable(path: &str, value: &Value) -> PipelineError {
    PipelineError::Runtime(
        StageError::new(
            ErrorCode::NotIterable,
            path,
            format!("cannot iterate over a {} value", value.type_name()),
        )
        .with_hint("only lists, sets, maps and ranges can be iterated"),
    )
}

fn range(start: i64, end: i64, emit: &mut Emit<'_, '_>) -> Result<ControlFlow<()>> {
    for i in start..end {
        if emit(Bundle::owned(Value::Int(i)))?.is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}

fn owned(value: Value, path: &str, emit: &mut Emit<'_, '_>) -> Result<ControlFlow<()>> {
    match value {
        Value::List(items) => each(items.into_iter().map(Bundle::owned), emit),
        Value::Set(items) => each(items.into_iter().map(Bundle::owned), emit),
        Value::Map(map) => each(
            map.into_iter()
                .map(|(k, v)| Bundle::new(vec![Arg::Owned(k), Arg::Owned(v)])),
            emit,
        ),
        Value::Range { start, end } => range(start, end, emit),
        other => Err(not_iterable(path, &other)),
    }
}

fn each<'e, I>(elements: I, emit: &mut Emit<'_, 'e>) -> Result<ControlFlow<()>>
where
    I: Iterator<Item = Bundle<'e>>,
{
    for element in elements {
        if emit(element)?.is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}

fn walk<'e>(arg: Arg<'e>, path: &str, emit: &mut Emit<'_, 'e>) -> Result<ControlFlow<()>> {
    match arg {
        Arg::Owned(value) => owned(value, path, emit),
        Arg::Movable(value) => owned(std::mem::take(value), path, emit),
        Arg::Mut(value) => match value {
            Value::List(items) => each(items.iter_mut().map(|v| Bundle::single(Arg::Mut(v))), emit),
            Value::Set(items) => each(items.iter().map(|v| Bundle::single(Arg::Ref(v))), emit),
            Value::Map(map) => each(
                map.iter_mut()
                    .map(|(k, v)| Bundle::new(vec![Arg::Ref(k), Arg::Mut(v)])),
                emit,
            ),
            Value::Range { start, end } => range(*start, *end, emit),
            other => Err(not_iterable(path, other)),
        },
        Arg::Ref(value) => match value {
            Value::List(items) => each(items.iter().map(|v| Bundle::single(Arg::Ref(v))), emit),
            Value::Set(items) => each(items.iter().map(|v| Bundle::single(Arg::Ref(v))), emit),
            Value::Map(map) => each(
                map.iter()
                    .map(|(k, v)| Bundle::new(vec![Arg::Ref(k), Arg::Ref(v)])),
                emit,
            ),
            Value::Range { start, end } => range(*start, *end, emit),
            other => Err(not_iterable(path, other)),
        },
        Arg::ByRef(inner) => walk(*inner, path, emit),
    }
}

/// Feed every element of `arg` to `emit` until it breaks.
///
/// Map entries arrive as two-position bundles `(key, value)`; keys are never
/// handed out mutably.
pub fn for_each_element<'e, F>(arg: Arg<'e>, path: &str, mut emit: F) -> Result<ControlFlow<()>>
where
    F: FnMut(Bundle<'e>) -> Result<ControlFlow<()>>,
{
    walk(arg, path, &mut emit)
}

/// Pull `gen` until it is exhausted or `emit` breaks.
///
/// A step may output several elements; after an error or a break the rest
/// of that step's outputs are dropped.
pub fn drive_generator<F>(gen: &mut Generator, mut emit: F) -> Result<ControlFlow<()>>
where
    F: FnMut(Bundle<'static>) -> Result<ControlFlow<()>>,
{
    loop {
        let mut outcome: Result<ControlFlow<()>> = Ok(ControlFlow::Continue(()));
        let more = gen.pull(&mut |value| {
            if matches!(outcome, Ok(ControlFlow::Continue(()))) {
                outcome = emit(Bundle::owned(value));
            }
        });
        match outcome? {
            ControlFlow::Break(()) => return Ok(ControlFlow::Break(())),
            ControlFlow::Continue(()) if !more => return Ok(ControlFlow::Continue(())),
            ControlFlow::Continue(()) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::ownership::Provenance;
    use crate::source::iota;

    fn collect(arg: Arg<'_>) -> Vec<(Vec<Provenance>, Value)> {
        let mut out = Vec::new();
        for_each_element(arg, "", |b| {
            out.push((b.provenances(), b.pack()));
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
        out
    }

    #[test]
    fn test_owned_list_yields_owned() {
        let out = collect(Arg::Owned(Value::list([1, 2])));
        assert_eq!(out[0], (vec![Provenance::Owned], Value::from(1)));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_mutable_list_allows_in_place_updates() {
        let mut data = Value::list([1, 2, 3]);
        for_each_element(Arg::Mut(&mut data), "", |b| {
            let mut args = b.into_args();
            if let Some(Value::Int(i)) = args[0].view_mut() {
                *i *= 10;
            }
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
        assert_eq!(data, Value::list([10, 20, 30]));
    }

    #[test]
    fn test_borrowed_map_yields_key_value_pairs() {
        let mut map = BTreeMap::new();
        map.insert(Value::from("a"), Value::from(1));
        let source = Value::Map(map);
        let out = collect(Arg::Ref(&source));
        assert_eq!(
            out,
            vec![(
                vec![Provenance::Borrowed, Provenance::Borrowed],
                Value::pair("a", 1)
            )]
        );
    }

    #[test]
    fn test_mutable_map_keys_stay_shared() {
        let mut map = BTreeMap::new();
        map.insert(Value::from("a"), Value::from(1));
        let mut source = Value::Map(map);
        let out = collect(Arg::Mut(&mut source));
        assert_eq!(out[0].0, vec![Provenance::Borrowed, Provenance::BorrowedMut]);
    }

    #[test]
    fn test_borrowed_range_yields_owned_ints() {
        let source = Value::range(3, 5);
        let out = collect(Arg::Ref(&source));
        assert_eq!(
            out,
            vec![
                (vec![Provenance::Owned], Value::from(3)),
                (vec![Provenance::Owned], Value::from(4)),
            ]
        );
    }

    #[test]
    fn test_scalar_is_not_iterable() {
        let err = for_each_element(Arg::Owned(Value::from(1)), "/stages/0", |_| {
            Ok(ControlFlow::Continue(()))
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotIterable);
    }

    #[test]
    fn test_generator_stops_on_break() {
        let mut gen = iota(0);
        let mut seen = 0;
        let flow = drive_generator(&mut gen, |_| {
            seen += 1;
            Ok(if seen == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
        .unwrap();
        assert!(flow.is_break());
        assert_eq!(seen, 4);
    }

    #[test]
    fn test_error_inside_multi_output_step_is_kept() {
        let mut once = true;
        let mut gen = Generator::from_fn::<i64, _>(move |output| {
            if !once {
                return false;
            }
            once = false;
            output(1);
            output(2);
            output(3);
            true
        });
        let mut seen = Vec::new();
        let err = drive_generator(&mut gen, |b| {
            let x = b.pack();
            seen.push(x.clone());
            if x == Value::from(2) {
                Err(PipelineError::internal("/stages/0", "rejected 2"))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert_eq!(seen, vec![Value::from(1), Value::from(2)]);
    }
}
