//! Unpack-and-invoke calling conventions for stage callbacks.
//!
//! Callbacks are plain closures of arity 1 to 4. The marker type parameter
//! `M` records the arity and the parameter convention, so one closure type
//! selects exactly one implementation. Closure parameters must be annotated
//! (`|x: &Value| ...`) since the convention is read off the signature.
//!
//! - [`ViewFn`]: every position is passed as `&Value`, whatever its
//!   provenance (access by shared view).
//! - [`MoveFn`]: positions are passed as [`Arg`] with their own provenance
//!   (access by consuming move), or converted to `&Value` or `Value` for
//!   callbacks that only want a view or a value.

use crate::ownership::Arg;
use crate::value::Value;

/// Arity marker.
pub struct Arity<const N: usize>;

/// Parameters are [`Arg`] slots.
pub struct ByArg;
/// Parameters are shared views.
pub struct ByView;
/// Parameters are owned values, moved out when owned and copied otherwise.
pub struct ByValue;

/// A callback invoked with a shared view of every bundle position.
pub trait ViewFn<M>: Clone + 'static {
    type Output;

    /// Number of bundle positions the callback accepts.
    const ARITY: usize;

    /// Returns `None` when `args` does not have exactly [`Self::ARITY`] items.
    fn call_view(&mut self, args: &[&Value]) -> Option<Self::Output>;
}

/// A callback invoked with the bundle positions themselves.
pub trait MoveFn<M>: Clone + 'static {
    type Output;

    const ARITY: usize;

    /// Returns `None` when `args` does not have exactly [`Self::ARITY`] items.
    fn call_move(&mut self, args: Vec<Arg<'_>>) -> Option<Self::Output>;
}

macro_rules! view_fn {
    (@view $arg:ident) => { &Value };
    ($n:literal; $($arg:ident),+) => {
        impl<F, R> ViewFn<(Arity<$n>, R)> for F
        where
            F: FnMut($(view_fn!(@view $arg)),+) -> R + Clone + 'static,
        {
            type Output = R;
            const ARITY: usize = $n;

            fn call_view(&mut self, args: &[&Value]) -> Option<R> {
                let [$($arg),+] = args else {
                    return None;
                };
                Some((self)($(*$arg),+))
            }
        }
    };
}

macro_rules! move_fn {
    (@arg $arg:ident) => { Arg<'_> };
    (@value $arg:ident) => { Value };
    ($n:literal; $($arg:ident),+) => {
        impl<F, R> MoveFn<(Arity<$n>, ByArg, R)> for F
        where
            F: FnMut($(move_fn!(@arg $arg)),+) -> R + Clone + 'static,
        {
            type Output = R;
            const ARITY: usize = $n;

            fn call_move(&mut self, args: Vec<Arg<'_>>) -> Option<R> {
                let [$($arg),+] = <[Arg<'_>; $n]>::try_from(args).ok()?;
                Some((self)($($arg),+))
            }
        }

        impl<F, R> MoveFn<(Arity<$n>, ByView, R)> for F
        where
            F: FnMut($(view_fn!(@view $arg)),+) -> R + Clone + 'static,
        {
            type Output = R;
            const ARITY: usize = $n;

            fn call_move(&mut self, args: Vec<Arg<'_>>) -> Option<R> {
                let [$($arg),+] = <[Arg<'_>; $n]>::try_from(args).ok()?;
                Some((self)($($arg.view()),+))
            }
        }

        impl<F, R> MoveFn<(Arity<$n>, ByValue, R)> for F
        where
            F: FnMut($(move_fn!(@value $arg)),+) -> R + Clone + 'static,
        {
            type Output = R;
            const ARITY: usize = $n;

            fn call_move(&mut self, args: Vec<Arg<'_>>) -> Option<R> {
                let [$($arg),+] = <[Arg<'_>; $n]>::try_from(args).ok()?;
                Some((self)($($arg.into_value()),+))
            }
        }
    };
}

view_fn!(1; a);
view_fn!(2; a, b);
view_fn!(3; a, b, c);
view_fn!(4; a, b, c, d);

move_fn!(1; a);
move_fn!(2; a, b);
move_fn!(3; a, b, c);
move_fn!(4; a, b, c, d);
