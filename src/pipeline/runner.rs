//! Pipeline runner: builds the chain for a source and drives it.
//!
//! [`apply`] is the one-shot entry point. [`Pipeline`] holds a source and a
//! composition until it is run, and can itself be the source of another
//! application, in which case its stages run in front of the outer ones.
//!
//! # Execution
//!
//! - A value source is handed whole to the first stage
//!   (`process_complete`); a bridge iterates it when the first stage is
//!   incremental.
//! - A generator is pulled one element at a time until it is exhausted or
//!   the chain reports done, then `end` cascades through the chain.

use std::ops::ControlFlow;
use std::rc::Rc;

use crate::bundle::Bundle;
use crate::ownership::Finalized;
use crate::source::{drive_generator, Source};

use super::builder::{build_chain, Feed};
use super::compose::{compose, Composition, IntoStages};
use super::config::EngineConfig;
use super::errors::Result;
use super::shape::{Shape, Slot};
use super::traits::BindContext;

// ============================================================================
// Pipeline: a source plus the stages to run over it
// ============================================================================

/// A source with a composition, ready to run.
#[derive(Debug)]
pub struct Pipeline<'s> {
    source: Source<'s>,
    stages: Composition,
}

impl<'s> Pipeline<'s> {
    pub fn new(source: impl Into<Source<'s>>) -> Self {
        Self {
            source: source.into(),
            stages: Composition::new(),
        }
    }

    /// Append stages.
    pub fn then(mut self, stages: impl IntoStages) -> Self {
        self.stages = self.stages.then(stages);
        self
    }

    pub fn source(&self) -> &Source<'s> {
        &self.source
    }

    pub fn stages(&self) -> &Composition {
        &self.stages
    }

    /// Run with the default configuration.
    pub fn run(self) -> Result<Finalized<'s>> {
        self.run_with(&EngineConfig::default())
    }

    pub fn run_with(self, config: &EngineConfig) -> Result<Finalized<'s>> {
        let (source, stages) = self.splice();
        let cx = BindContext::new(Rc::new(config.clone()));
        trace_stage!("run");

        match source {
            Source::Value(arg) => {
                let feed = Feed::Value(Shape::single(Slot::of_arg(&arg)));
                let mut chain = build_chain(feed, &stages, &cx)?;
                chain.complete(Bundle::single(arg))
            }
            Source::Generator(mut gen) => {
                let feed = Feed::Generator(gen.element_kind().clone());
                let mut chain = build_chain(feed, &stages, &cx)?;
                if !chain.done() {
                    drive_generator(&mut gen, |element| {
                        chain.push(element)?;
                        Ok(if chain.done() {
                            debug_event!("generator stopped early");
                            ControlFlow::Break(())
                        } else {
                            ControlFlow::Continue(())
                        })
                    })?;
                }
                Ok(chain.finish()?)
            }
            // `splice` never returns a pipeline source.
            Source::Pipeline(inner) => (*inner).then(stages).run_with(config),
        }
    }

    /// Move the stages of nested pipeline sources in front of ours.
    fn splice(self) -> (Source<'s>, Composition) {
        let Pipeline {
            mut source,
            mut stages,
        } = self;
        while let Source::Pipeline(inner) = source {
            let Pipeline {
                source: inner_source,
                stages: inner_stages,
            } = *inner;
            stages = compose((inner_stages, stages));
            source = inner_source;
        }
        (source, stages)
    }
}

// ============================================================================
// One-shot entry points
// ============================================================================

/// Run `stages` over `source` with the default configuration.
pub fn apply<'s>(source: impl Into<Source<'s>>, stages: impl IntoStages) -> Result<Finalized<'s>> {
    Pipeline::new(source).then(stages).run()
}

pub fn apply_with<'s>(
    config: &EngineConfig,
    source: impl Into<Source<'s>>,
    stages: impl IntoStages,
) -> Result<Finalized<'s>> {
    Pipeline::new(source).then(stages).run_with(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorCode;
    use crate::source::iota;
    use crate::stages::{count, filter, sort, take_n, to_vec, transform};
    use crate::value::Value;

    fn even(x: &Value) -> bool {
        x.as_int().map_or(false, |i| i % 2 == 0)
    }

    #[test]
    fn test_apply_to_owned_value() {
        let out = apply(Value::list([3, 1, 2]), (sort(), to_vec())).unwrap();
        assert_eq!(out.into_value(), Value::list([1, 2, 3]));
    }

    #[test]
    fn test_sort_mutates_borrowed_source_in_place() {
        let mut data = Value::list([3, 1, 2]);
        apply(Source::borrowed_mut(&mut data), (sort(), count())).unwrap();
        assert_eq!(data, Value::list([1, 2, 3]));
    }

    #[test]
    fn test_generator_stops_at_take() {
        let out = apply(iota(0), (take_n(4), to_vec())).unwrap();
        assert_eq!(out.into_value(), Value::list([0, 1, 2, 3]));
    }

    #[test]
    fn test_pipeline_as_source_runs_inner_stages_first() {
        let evens = Pipeline::new(iota(1)).then(filter(even));
        let out = apply(evens, (take_n(3), to_vec())).unwrap();
        assert_eq!(out.into_value(), Value::list([2, 4, 6]));
    }

    #[test]
    fn test_nested_pipeline_sources() {
        let squares = Pipeline::new(Source::owned(vec![1, 2, 3, 4]))
            .then(transform(|x: &Value| x.as_int().map_or(0, |i| i * i)));
        let odds = Pipeline::new(squares).then(filter(|x: &Value| !even(x)));
        let out = odds.then(to_vec()).run().unwrap();
        assert_eq!(out.into_value(), Value::list([1, 9]));
    }

    #[test]
    fn test_strict_config_rejects_unknown_field() {
        let config = EngineConfig::from_json(r#"{ "strict": true, "colour": 1 }"#).unwrap();
        let err = apply_with(&config, Value::list([1]), count()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownField);
    }
}
