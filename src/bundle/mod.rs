//! Argument bundles: one logical element made of several provenance-tagged
//! positions.
//!
//! A single-valued element is the degenerate bundle of arity 1. Arity and
//! per-position provenance are fixed by the chain builder for every chain
//! position and never change at run time.

mod invoke;

pub use invoke::{Arity, ByArg, ByValue, ByView, MoveFn, ViewFn};

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::ownership::{Arg, Effect, Provenance};
use crate::pipeline::{ErrorCode, PipelineError, Result, StageError};
use crate::source::for_each_element;
use crate::value::Value;

/// How flattening re-presents the non-iterated positions of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlattenMode {
    /// Owned positions are shown to every repetition as shared borrows.
    #[default]
    Safe,
    /// Positions keep their provenance. An owned position moved out by one
    /// repetition is observed as `()` by every later one.
    Forward,
}

impl FlattenMode {
    pub fn effect(self) -> Effect {
        match self {
            FlattenMode::Safe => Effect::Repeat,
            FlattenMode::Forward => Effect::RepeatForward,
        }
    }
}

#[derive(Debug, Default)]
pub struct Bundle<'a> {
    args: Vec<Arg<'a>>,
}

impl<'a> Bundle<'a> {
    pub fn new(args: Vec<Arg<'a>>) -> Self {
        Self { args }
    }

    pub fn single(arg: Arg<'a>) -> Self {
        Self { args: vec![arg] }
    }

    pub fn owned(value: Value) -> Self {
        Self::single(Arg::Owned(value))
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn get(&self, index: usize) -> Option<&Arg<'a>> {
        self.args.get(index)
    }

    pub fn args(&self) -> &[Arg<'a>] {
        &self.args
    }

    pub fn provenances(&self) -> Vec<Provenance> {
        self.args.iter().map(Arg::provenance).collect()
    }

    /// Read-only views of every position.
    pub fn views(&self) -> Vec<&Value> {
        self.args.iter().map(Arg::view).collect()
    }

    /// The same element as seen by a shared-view consumer: every position
    /// becomes a shared borrow.
    pub fn share(&self) -> Bundle<'_> {
        Bundle::new(self.args.iter().map(Arg::share).collect())
    }

    /// The same element with every position's provenance kept.
    pub fn reborrow(&mut self) -> Bundle<'_> {
        Bundle::new(self.args.iter_mut().map(Arg::reborrow).collect())
    }

    pub fn into_args(self) -> Vec<Arg<'a>> {
        self.args
    }

    /// The only position of an arity-1 bundle, or the bundle back.
    pub fn into_single(self) -> std::result::Result<Arg<'a>, Bundle<'a>> {
        if self.args.len() == 1 {
            let mut args = self.args;
            match args.pop() {
                Some(arg) => Ok(arg),
                None => Err(Bundle::new(args)),
            }
        } else {
            Err(self)
        }
    }

    /// Extract one position, dropping the rest.
    pub fn take_at(self, index: usize) -> Option<Arg<'a>> {
        self.args.into_iter().nth(index)
    }

    /// Rebuild the bundle with position `index` replaced by `f` of it.
    /// Returns `None` when `index` is out of range.
    pub fn replace_at<E, F>(self, index: usize, f: F) -> Option<std::result::Result<Bundle<'a>, E>>
    where
        F: FnOnce(Arg<'a>) -> std::result::Result<Arg<'a>, E>,
    {
        if index >= self.args.len() {
            return None;
        }
        let mut f = Some(f);
        let mut args = Vec::with_capacity(self.args.len());
        for (i, arg) in self.args.into_iter().enumerate() {
            if i == index {
                let apply = f.take()?;
                match apply(arg) {
                    Ok(replaced) => args.push(replaced),
                    Err(e) => return Some(Err(e)),
                }
            } else {
                args.push(arg);
            }
        }
        Some(Ok(Bundle::new(args)))
    }

    pub fn prepend(mut self, arg: Arg<'a>) -> Self {
        self.args.insert(0, arg);
        self
    }

    pub fn push(mut self, arg: Arg<'a>) -> Self {
        self.args.push(arg);
        self
    }

    /// Reorder or select positions. Each index may appear at most once;
    /// returns `None` for an out-of-range or repeated index.
    pub fn select(self, indices: &[usize]) -> Option<Bundle<'a>> {
        let mut slots: Vec<Option<Arg<'a>>> = self.args.into_iter().map(Some).collect();
        let mut picked = Vec::with_capacity(indices.len());
        for &i in indices {
            picked.push(slots.get_mut(i)?.take()?);
        }
        Some(Bundle::new(picked))
    }

    /// Pack into one owned value: the value itself at arity 1, a tuple
    /// otherwise. Borrowed positions are copied.
    pub fn pack(self) -> Value {
        let mut values = self.into_values();
        if values.len() == 1 {
            values.pop().unwrap_or_default()
        } else {
            Value::Tuple(values)
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.args.into_iter().map(Arg::into_value).collect()
    }

    /// Call `f` with a shared view of every position.
    pub fn invoke_view<M, F: ViewFn<M>>(&self, f: &mut F) -> Option<F::Output> {
        f.call_view(&self.views())
    }

    /// Call `f` with the positions themselves, provenance kept.
    pub fn invoke<M, F: MoveFn<M>>(self, f: &mut F) -> Option<F::Output> {
        f.call_move(self.args)
    }

    /// Splice the items of every tuple position selected by `plan` into the
    /// bundle, each item keeping its position's provenance. Returns `None`
    /// when a selected position does not hold a tuple.
    pub fn expand(self, plan: &[bool]) -> Option<Bundle<'a>> {
        let mut out = Vec::with_capacity(self.args.len());
        for (i, arg) in self.args.into_iter().enumerate() {
            if plan.get(i).copied().unwrap_or(false) {
                out.extend(split_tuple(arg).ok()?);
            } else {
                out.push(arg);
            }
        }
        Some(Bundle::new(out))
    }

    /// Iterate the last position and emit the rest of the bundle followed by
    /// each element in turn. Stops when `emit` breaks.
    pub fn flatten<F>(self, mode: FlattenMode, path: &str, mut emit: F) -> Result<()>
    where
        F: FnMut(Bundle<'_>) -> Result<ControlFlow<()>>,
    {
        let mut rest = self.args;
        let last = rest.pop().ok_or_else(|| {
            PipelineError::internal(path, "cannot flatten an empty bundle")
        })?;
        let effect = mode.effect();
        for_each_element(last, path, |element| {
            let mut args: Vec<Arg<'_>> = rest.iter_mut().map(|a| a.present(effect)).collect();
            for item in element.into_args() {
                args.push(item);
            }
            emit(Bundle::new(args))
        })?;
        Ok(())
    }
}

/// Split a tuple-valued position into one position per item.
fn split_tuple(arg: Arg<'_>) -> std::result::Result<Vec<Arg<'_>>, Arg<'_>> {
    match arg {
        Arg::Owned(Value::Tuple(items)) => Ok(items.into_iter().map(Arg::Owned).collect()),
        Arg::Movable(v) => match v {
            Value::Tuple(items) => Ok(items.iter_mut().map(Arg::Movable).collect()),
            other => Err(Arg::Movable(other)),
        },
        Arg::Mut(v) => match v {
            Value::Tuple(items) => Ok(items.iter_mut().map(Arg::Mut).collect()),
            other => Err(Arg::Mut(other)),
        },
        Arg::Ref(Value::Tuple(items)) => Ok(items.iter().map(Arg::Ref).collect()),
        Arg::ByRef(inner) => split_tuple(*inner)
            .map(|items| items.into_iter().map(Arg::by_ref).collect())
            .map_err(Arg::by_ref),
        other => Err(other),
    }
}

/// Runtime failure for a value whose structure contradicts its slot.
pub(crate) fn shape_violation(path: &str, expected: &str, found: &Value) -> PipelineError {
    PipelineError::Runtime(StageError::new(
        ErrorCode::TypeMismatch,
        path,
        format!("expected {expected}, found {}", found.type_name()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied())
    }

    #[test]
    fn test_share_forces_shared_views() {
        let mut data = Value::from(1);
        let bundle = Bundle::new(vec![Arg::Owned(Value::from(2)), Arg::Mut(&mut data)]);
        assert_eq!(
            bundle.share().provenances(),
            vec![Provenance::Borrowed, Provenance::Borrowed]
        );
        assert_eq!(
            bundle.provenances(),
            vec![Provenance::Owned, Provenance::BorrowedMut]
        );
    }

    #[test]
    fn test_replace_at_keeps_other_positions() {
        let bundle = Bundle::new(vec![Arg::Owned(Value::from(1)), Arg::Owned(Value::from(2))]);
        let replaced = bundle
            .replace_at(1, |a| Ok::<_, ()>(Arg::Owned(Value::from(a.view().as_int().unwrap_or(0) * 10))))
            .unwrap()
            .unwrap();
        assert_eq!(replaced.pack(), Value::pair(1, 20));
    }

    #[test]
    fn test_replace_at_out_of_range() {
        let bundle = Bundle::owned(Value::from(1));
        assert!(bundle.replace_at(3, Ok::<_, ()>).is_none());
    }

    #[test]
    fn test_select_reorders_and_rejects_repeats() {
        let make = || {
            Bundle::new(vec![
                Arg::Owned(Value::from("a")),
                Arg::Owned(Value::from("b")),
                Arg::Owned(Value::from("c")),
            ])
        };
        let picked = make().select(&[1, 2, 0]).unwrap();
        assert_eq!(
            picked.pack(),
            Value::tuple(vec!["b".into(), "c".into(), "a".into()])
        );
        assert!(make().select(&[0, 0]).is_none());
        assert!(make().select(&[3]).is_none());
    }

    #[test]
    fn test_expand_preserves_mutable_provenance() {
        let mut pair = Value::pair(1, 2);
        let bundle = Bundle::new(vec![Arg::Owned(Value::from(0)), Arg::Mut(&mut pair)]);
        let expanded = bundle.expand(&[false, true]).unwrap();
        assert_eq!(
            expanded.provenances(),
            vec![Provenance::Owned, Provenance::BorrowedMut, Provenance::BorrowedMut]
        );
    }

    #[test]
    fn test_expand_rejects_non_tuple() {
        let bundle = Bundle::owned(Value::from(3));
        assert!(bundle.expand(&[true]).is_none());
    }

    #[test]
    fn test_flatten_safe_mode_shares_owned_prefix() {
        let bundle = Bundle::new(vec![Arg::Owned(Value::from("row")), Arg::Owned(ints(&[1, 2, 3]))]);
        let mut seen = Vec::new();
        bundle
            .flatten(FlattenMode::Safe, "", |b| {
                seen.push((b.provenances(), b.pack()));
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();
        assert_eq!(seen.len(), 3);
        for (provenances, _) in &seen {
            assert_eq!(provenances, &vec![Provenance::Borrowed, Provenance::Owned]);
        }
        assert_eq!(seen[2].1, Value::pair("row", 3));
    }

    #[test]
    fn test_flatten_forward_observes_moved_value() {
        let bundle = Bundle::new(vec![Arg::Owned(Value::from("row")), Arg::Owned(ints(&[1, 2]))]);
        let mut firsts = Vec::new();
        bundle
            .flatten(FlattenMode::Forward, "", |b| {
                let mut args = b.into_args();
                let first = args.remove(0);
                assert_eq!(first.provenance(), Provenance::Owned);
                firsts.push(first.into_value());
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();
        assert_eq!(firsts, vec![Value::from("row"), Value::Unit]);
    }

    #[test]
    fn test_flatten_stops_on_break() {
        let bundle = Bundle::owned(ints(&[1, 2, 3, 4]));
        let mut count = 0;
        bundle
            .flatten(FlattenMode::Safe, "", |_| {
                count += 1;
                Ok(if count == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                })
            })
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_flatten_non_iterable_is_runtime_error() {
        let bundle = Bundle::owned(Value::from(1));
        let err = bundle
            .flatten(FlattenMode::Safe, "/stages/0", |_| Ok(ControlFlow::Continue(())))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotIterable);
    }
}
