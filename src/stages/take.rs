//! Bounded prefixes.

use crate::bundle::Bundle;
use crate::pipeline::{
    BindContext, Bound, Next, Result, Shape, Stage, StageDescriptor, StageInstance, Style,
};

/// Forward the first `n` elements, then report done.
///
/// Reporting done is what lets an infinite generator feed a terminating
/// pipeline: the runner stops pulling once the chain is done.
pub fn take_n(n: usize) -> Stage {
    Stage::new(TakeDescriptor { n })
}

struct TakeDescriptor {
    n: usize,
}

impl StageDescriptor for TakeDescriptor {
    fn name(&self) -> &'static str {
        "take_n"
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn bind(&self, input: &Shape, _cx: &BindContext) -> Result<Bound> {
        Ok(Bound::new(Take { remaining: self.n }, input.clone()))
    }
}

struct Take {
    remaining: usize,
}

impl StageInstance for Take {
    fn done(&self) -> bool {
        self.remaining == 0
    }

    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        if self.remaining == 0 {
            return Ok(());
        }
        self.remaining -= 1;
        next.process_incremental(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{apply, compose};
    use crate::source::{iota, Generator};
    use crate::stages::{count, to_vec};
    use crate::value::Value;

    #[test]
    fn test_take_more_than_available() {
        let out = apply(Value::list([1, 2]), (take_n(5), to_vec())).unwrap();
        assert_eq!(out.into_value(), Value::list([1, 2]));
    }

    #[test]
    fn test_take_zero_pulls_nothing() {
        let pulled = std::rc::Rc::new(std::cell::Cell::new(0));
        let seen = std::rc::Rc::clone(&pulled);
        let gen = Generator::from_fn::<i64, _>(move |output| {
            seen.set(seen.get() + 1);
            output(1);
            true
        });
        let out = apply(gen, (take_n(0), count())).unwrap();
        assert_eq!(out.into_value(), Value::from(0));
        assert_eq!(pulled.get(), 0);
    }

    #[test]
    fn test_take_stops_infinite_generator() {
        let out = apply(iota(7), compose((take_n(3), to_vec()))).unwrap();
        assert_eq!(out.into_value(), Value::list([7, 8, 9]));
    }
}
