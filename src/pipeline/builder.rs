//! Chain builder: validate a composition against its feed, then bind every
//! descriptor to the shape of the input it will receive.

use crate::value::Kind;

use super::chain::{Bridge, Chain, Link};
use super::compose::Composition;
use super::error_code::ErrorCode;
use super::errors::{PipelineError, Result};
use super::shape::{Shape, Slot};
use super::style::{connect, Flow, Transition};
use super::traits::{BindContext, Wrap};
use super::validation::{ChainPlan, FeedKind, ValidationEngine};

/// What the first stage of a chain receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// One complete value of this (arity-1) shape.
    Value(Shape),
    /// Owned elements of this kind, pulled from a generator.
    Generator(Kind),
    /// Elements of this shape, pushed one at a time by an enclosing stage.
    Elements(Shape),
}

impl Feed {
    pub fn kind(&self) -> FeedKind {
        match self {
            Feed::Value(_) => FeedKind::Value,
            Feed::Generator(_) => FeedKind::Generator,
            Feed::Elements(_) => FeedKind::Elements,
        }
    }
}

/// Validate and bind `stages` for `feed`.
///
/// Validation diagnostics are collected for the whole chain first; any
/// error rejects it before a single descriptor is bound.
pub fn build_chain(feed: Feed, stages: &Composition, cx: &BindContext) -> Result<Chain> {
    trace_stage!("build_chain", cx.path());

    let plan = ChainPlan {
        path: cx.path(),
        feed: feed.kind(),
        stages: stages.stages(),
        config: cx.config(),
    };
    let report = ValidationEngine::with_defaults().validate(&plan);
    for warning in report.warnings() {
        warn_event!(code = %warning.code, path = %warning.path, "{}", warning.message);
    }
    if report.has_errors() {
        debug_event!(path = cx.path(), errors = report.errors().count(), "chain rejected");
        return Err(PipelineError::Rejected(report));
    }

    bind_chain(feed, stages, cx)
}

/// Bind `stages` for `feed` without running validation.
///
/// Used to instantiate a composition again once it has been validated, for
/// example one sub-chain per group key.
pub fn bind_chain(feed: Feed, stages: &Composition, cx: &BindContext) -> Result<Chain> {
    let (entry, mut shape) = match feed {
        Feed::Value(shape) => (Flow::Complete, shape),
        Feed::Generator(kind) => (Flow::Incremental, Shape::single(Slot::owned(kind))),
        Feed::Elements(shape) => (Flow::Incremental, shape),
    };
    let mut flow = entry;
    let mut links = Vec::with_capacity(stages.len());
    let mut wraps: Vec<Wrap> = Vec::new();

    for (i, stage) in stages.stages().iter().enumerate() {
        let scx = cx.stage(i);
        let style = stage.style();
        let barrier = style.output == Flow::Complete;

        let bound = match connect(flow, style.input) {
            Transition::Forbidden => {
                return Err(scx.error(
                    ErrorCode::IncompatibleStyle,
                    format!("{} needs complete input but receives single elements", stage.name()),
                ));
            }
            Transition::Direct => {
                if flow == Flow::Complete && shape.packed_kind().is_generator() {
                    return Err(scx.error(
                        ErrorCode::GeneratorToComplete,
                        format!("{} needs complete input but receives {shape}", stage.name()),
                    ));
                }
                let bound = stage.descriptor().bind(&shape, &scx)?;
                links.push(Link {
                    instance: bound.instance,
                    barrier,
                });
                (bound.output, bound.wrap)
            }
            Transition::Bridge => {
                let elements = shape.element_shape().ok_or_else(|| {
                    scx.error(
                        ErrorCode::NotIterable,
                        format!("{} iterates its input, but {shape} is not iterable", stage.name()),
                    )
                })?;
                debug_event!(path = scx.path(), stage = stage.name(), input = %shape, "bridging");
                let bound = stage.descriptor().bind(&elements, &scx)?;
                let bridge = Bridge::new(bound.instance, barrier, elements.arity(), scx.path());
                links.push(Link {
                    instance: Box::new(bridge),
                    barrier,
                });
                (bound.output, bound.wrap)
            }
        };

        let (output, wrap) = bound;
        debug_event!(path = scx.path(), stage = stage.name(), output = %output, "bound");
        shape = output;
        flow = style.output;
        wraps.extend(wrap);
    }

    if flow != Flow::Complete {
        return Err(cx.error(
            ErrorCode::MissingTerminal,
            "pipeline must end in a value-producing stage",
        ));
    }

    let result = wraps
        .iter()
        .rev()
        .fold(shape.finalized(), |result, wrap| wrap.apply(result));
    Ok(Chain::new(links, entry, shape, result))
}
