//! Lazy, pull-driven sources.

use std::fmt;

use crate::value::{IntoValue, Kind, Value};

type Step = Box<dyn FnMut(&mut dyn FnMut(Value)) -> bool>;

/// A lazily computed, possibly infinite sequence.
///
/// Each pull hands at most one element to a callback and reports whether
/// more may follow. A generator is never materialized as a whole, so it can
/// only feed stages with incremental input.
pub struct Generator {
    element: Kind,
    step: Step,
}

impl Generator {
    /// Build a generator from a step function producing elements of type `T`.
    ///
    /// `step` calls `output` with the next element and returns `true`, or
    /// returns `false` once the sequence is exhausted.
    pub fn from_fn<T, F>(mut step: F) -> Self
    where
        T: IntoValue,
        F: FnMut(&mut dyn FnMut(T)) -> bool + 'static,
    {
        Self {
            element: T::kind(),
            step: Box::new(move |output: &mut dyn FnMut(Value)| {
                step(&mut |item: T| output(item.into_value()))
            }),
        }
    }

    /// Lazily pull from an iterator.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator,
        I::IntoIter: 'static,
        I::Item: IntoValue,
    {
        let mut iter = iter.into_iter();
        Self::from_fn::<I::Item, _>(move |output| match iter.next() {
            Some(item) => {
                output(item);
                true
            }
            None => false,
        })
    }

    pub fn element_kind(&self) -> &Kind {
        &self.element
    }

    /// Kind of the generator itself.
    pub fn kind(&self) -> Kind {
        Kind::Generator(Box::new(self.element.clone()))
    }

    /// Pull once. Returns `false` when the sequence is exhausted.
    pub fn pull(&mut self, output: &mut dyn FnMut(Value)) -> bool {
        (self.step)(output)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

/// Infinite ascending integers starting at `start`.
pub fn iota(start: i64) -> Generator {
    let mut next = start;
    Generator::from_fn::<i64, _>(move |output| {
        output(next);
        next = next.wrapping_add(1);
        true
    })
}

/// Ascending integers in `start..end`.
pub fn iota_range(start: i64, end: i64) -> Generator {
    let mut next = start;
    Generator::from_fn::<i64, _>(move |output| {
        if next < end {
            output(next);
            next += 1;
            true
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(gen: &mut Generator, limit: usize) -> Vec<Value> {
        let mut out = Vec::new();
        while out.len() < limit && gen.pull(&mut |v| out.push(v)) {}
        out
    }

    #[test]
    fn test_iota_is_unbounded() {
        let mut gen = iota(10);
        assert_eq!(drain(&mut gen, 3), vec![Value::from(10), Value::from(11), Value::from(12)]);
        assert_eq!(gen.kind().to_string(), "generator<int>");
    }

    #[test]
    fn test_iota_range_exhausts() {
        let mut gen = iota_range(0, 2);
        assert_eq!(drain(&mut gen, 10).len(), 2);
        assert!(!gen.pull(&mut |_| {}));
    }

    #[test]
    fn test_from_iter_keeps_element_kind() {
        let gen = Generator::from_iter(vec!["a", "b"]);
        assert_eq!(gen.element_kind(), &Kind::Str);
    }
}
