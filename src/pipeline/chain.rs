//! Bound chains and the cursor stages use to push into the rest of them.

use std::ops::ControlFlow;

use crate::bundle::Bundle;
use crate::ownership::{finalize, Arg, Finalized};
use crate::source::for_each_element;
use crate::value::Value;

use super::error_code::ErrorCode;
use super::errors::{PipelineError, Result, StageError};
use super::shape::Shape;
use super::style::Flow;
use super::traits::StageInstance;

/// One bound stage and whether its output starts a separate pass.
pub(crate) struct Link {
    pub(crate) instance: Box<dyn StageInstance>,
    /// The stage produces complete output, so stages after it do not take
    /// part in its early-stop decision.
    pub(crate) barrier: bool,
}

/// Whether the chain `rest` wants no more input.
///
/// Reads each stage's own completion up to and including the first
/// barrier.
fn downstream_done(rest: &[Link]) -> bool {
    for link in rest {
        if link.instance.done() {
            return true;
        }
        if link.barrier {
            return false;
        }
    }
    false
}

/// Cursor over the stages after the one currently running.
pub struct Next<'c> {
    rest: &'c mut [Link],
}

impl<'c> Next<'c> {
    pub(crate) fn new(rest: &'c mut [Link]) -> Self {
        Self { rest }
    }

    /// A shorter-lived cursor over the same stages, for pushing more than
    /// once.
    pub fn reborrow(&mut self) -> Next<'_> {
        Next {
            rest: &mut *self.rest,
        }
    }

    pub fn done(&self) -> bool {
        downstream_done(self.rest)
    }

    pub fn process_incremental(self, input: Bundle<'_>) -> Result<()> {
        match self.rest.split_first_mut() {
            Some((link, rest)) => link.instance.process_incremental(input, Next { rest }),
            None => Err(PipelineError::internal(
                "",
                "incremental element reached the end of the chain",
            )),
        }
    }

    /// Hand a complete value on; past the last stage, finalize it.
    pub fn process_complete<'e>(self, input: Bundle<'e>) -> Result<Finalized<'e>> {
        match self.rest.split_first_mut() {
            Some((link, rest)) => link.instance.process_complete(input, Next { rest }),
            None => Ok(finalize(input)),
        }
    }

    pub fn end(self) -> Result<Finalized<'static>> {
        match self.rest.split_first_mut() {
            Some((link, rest)) => link.instance.end(Next { rest }),
            None => Err(PipelineError::internal(
                "",
                "end of input reached the end of the chain",
            )),
        }
    }
}

/// Make a runtime element fit a bound arity.
///
/// Only `any`-kinded inputs can disagree with their shape at run time: an
/// element with more positions than bound (a map entry where a single value
/// was expected) has its trailing positions packed into one owned tuple.
pub(crate) fn conform<'e>(element: Bundle<'e>, arity: usize, path: &str) -> Result<Bundle<'e>> {
    if element.arity() == arity {
        return Ok(element);
    }
    if arity == 0 || element.arity() < arity {
        return Err(PipelineError::Runtime(StageError::new(
            ErrorCode::TypeMismatch,
            path,
            format!(
                "element has {} positions, stage expects {arity}",
                element.arity()
            ),
        )));
    }
    let mut args = element.into_args();
    let tail = Bundle::new(args.split_off(arity - 1));
    args.push(Arg::Owned(Value::Tuple(tail.into_values())));
    Ok(Bundle::new(args))
}

/// Iterates a complete value into an incremental stage.
pub(crate) struct Bridge {
    inner: Box<dyn StageInstance>,
    /// The inner stage produces complete output.
    barrier: bool,
    arity: usize,
    path: String,
}

impl Bridge {
    pub(crate) fn new(
        inner: Box<dyn StageInstance>,
        barrier: bool,
        arity: usize,
        path: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            barrier,
            arity,
            path: path.into(),
        }
    }
}

fn should_stop(inner: &dyn StageInstance, barrier: bool, next: &Next<'_>) -> bool {
    inner.done() || (!barrier && next.done())
}

impl StageInstance for Bridge {
    fn done(&self) -> bool {
        self.inner.done()
    }

    fn process_complete<'e>(
        &mut self,
        input: Bundle<'e>,
        mut next: Next<'_>,
    ) -> Result<Finalized<'e>> {
        let source = match input.into_single() {
            Ok(arg) => arg,
            Err(bundle) => {
                return Err(PipelineError::internal(
                    &self.path,
                    format!("cannot iterate a bundle of {} positions", bundle.arity()),
                ))
            }
        };

        let barrier = self.barrier;
        let arity = self.arity;
        let path = self.path.as_str();
        let inner = &mut self.inner;

        if !should_stop(&**inner, barrier, &next) {
            for_each_element(source, path, |element| {
                let element = conform(element, arity, path)?;
                inner.process_incremental(element, next.reborrow())?;
                Ok(if should_stop(&**inner, barrier, &next) {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                })
            })?;
        }
        Ok(self.inner.end(next)?)
    }
}

/// A bound, runnable sequence of stage instances.
pub struct Chain {
    links: Vec<Link>,
    entry: Flow,
    output: Shape,
    result: Shape,
}

impl Chain {
    pub(crate) fn new(links: Vec<Link>, entry: Flow, output: Shape, result: Shape) -> Self {
        Self {
            links,
            entry,
            output,
            result,
        }
    }

    /// How the first stage takes its input.
    pub fn entry(&self) -> Flow {
        self.entry
    }

    /// Shape produced by the last stage, before finalize.
    pub fn output(&self) -> &Shape {
        &self.output
    }

    /// Shape of the finalized result, carriers of short-circuiting stages
    /// included.
    pub fn result(&self) -> &Shape {
        &self.result
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn done(&self) -> bool {
        downstream_done(&self.links)
    }

    /// Push one element into an incrementally fed chain.
    pub fn push(&mut self, input: Bundle<'_>) -> Result<()> {
        if self.entry != Flow::Incremental {
            return Err(PipelineError::internal(
                "",
                "chain takes a complete value, not single elements",
            ));
        }
        Next::new(&mut self.links).process_incremental(input)
    }

    /// Signal end of input to an incrementally fed chain.
    pub fn finish(&mut self) -> Result<Finalized<'static>> {
        if self.entry != Flow::Incremental {
            return Err(PipelineError::internal(
                "",
                "chain takes a complete value, not an end of input",
            ));
        }
        Next::new(&mut self.links).end()
    }

    /// Run a complete value through the chain.
    pub fn complete<'e>(&mut self, input: Bundle<'e>) -> Result<Finalized<'e>> {
        if self.entry != Flow::Complete {
            return Err(PipelineError::internal(
                "",
                "chain takes single elements, not a complete value",
            ));
        }
        Next::new(&mut self.links).process_complete(input)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.links.len())
            .field("entry", &self.entry)
            .field("output", &self.output)
            .field("result", &self.result)
            .finish()
    }
}
