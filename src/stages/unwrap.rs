//! Short-circuiting unwraps of optional and outcome values.
//!
//! An unwrap stage forwards the inner value of every `some`/`ok` element.
//! The first `none`/`err` stops the pipeline: no more input is requested,
//! the stages downstream are skipped, and the carrier itself becomes the
//! result. A successful run has its result wrapped in the same carrier, so
//! the result kind of a pipeline containing `unwrap_optional` is always
//! `optional<...>`.

use crate::bundle::Bundle;
use crate::ownership::{Arg, Finalized};
use crate::pipeline::{
    BindContext, Bound, ErrorCode, Next, PipelineError, Result, Shape, Slot, Stage,
    StageDescriptor, StageError, StageInstance, Style, Wrap,
};
use crate::value::{Kind, Value};

pub fn unwrap_optional() -> Stage {
    unwrap(Wrap::Optional, false)
}

pub fn unwrap_optional_complete() -> Stage {
    unwrap(Wrap::Optional, true)
}

pub fn unwrap_outcome() -> Stage {
    unwrap(Wrap::Outcome, false)
}

pub fn unwrap_outcome_complete() -> Stage {
    unwrap(Wrap::Outcome, true)
}

fn unwrap(carrier: Wrap, complete: bool) -> Stage {
    Stage::new(UnwrapDescriptor { carrier, complete })
}

struct UnwrapDescriptor {
    carrier: Wrap,
    complete: bool,
}

impl StageDescriptor for UnwrapDescriptor {
    fn name(&self) -> &'static str {
        match (self.carrier, self.complete) {
            (Wrap::Optional, false) => "unwrap_optional",
            (Wrap::Optional, true) => "unwrap_optional_complete",
            (Wrap::Outcome, false) => "unwrap_outcome",
            (Wrap::Outcome, true) => "unwrap_outcome_complete",
        }
    }

    fn style(&self) -> Style {
        if self.complete {
            Style::COMPLETE_TO_COMPLETE
        } else {
            Style::INCREMENTAL_TO_INCREMENTAL
        }
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        let inner = match (self.carrier, input.slots()) {
            (Wrap::Optional, [slot @ Slot { kind: Kind::Optional(k), .. }])
            | (Wrap::Outcome, [slot @ Slot { kind: Kind::Outcome(k), .. }]) => Slot {
                kind: (**k).clone(),
                ..slot.clone()
            },
            (_, [slot @ Slot { kind: Kind::Any, .. }]) => slot.clone(),
            _ => {
                return Err(PipelineError::Bind(StageError::new(
                    ErrorCode::UnsupportedShape,
                    cx.path(),
                    format!(
                        "{} needs {} elements, found {input}",
                        self.name(),
                        carrier_name(self.carrier)
                    ),
                )))
            }
        };
        let instance = Unwrap {
            carrier: self.carrier,
            stopped: None,
            path: cx.path().to_string(),
        };
        Ok(Bound::new(instance, Shape::single(inner)).wrapping(self.carrier))
    }
}

fn carrier_name(carrier: Wrap) -> &'static str {
    match carrier {
        Wrap::Optional => "optional",
        Wrap::Outcome => "outcome",
    }
}

// ─── Opening a carrier ──────────────────────────────────────────────────────

enum Stop {
    /// `none` or `err`: the carrier to return.
    Carrier(Value),
    /// Not a carrier of the expected kind; holds the type found.
    Mismatch(&'static str),
}

fn stop(carrier: Wrap, value: &Value) -> Stop {
    match (carrier, value) {
        (Wrap::Optional, Value::Optional(None)) => Stop::Carrier(Value::none()),
        (Wrap::Outcome, Value::Outcome(Err(e))) => Stop::Carrier(Value::err(e.clone())),
        (_, other) => Stop::Mismatch(other.type_name()),
    }
}

fn inner_mut(carrier: Wrap, value: &mut Value) -> std::result::Result<&mut Value, Stop> {
    let opens = matches!(
        (carrier, &*value),
        (Wrap::Optional, Value::Optional(Some(_))) | (Wrap::Outcome, Value::Outcome(Ok(_)))
    );
    if !opens {
        return Err(stop(carrier, value));
    }
    match value {
        Value::Optional(Some(inner)) => Ok(&mut **inner),
        Value::Outcome(Ok(inner)) => Ok(&mut **inner),
        _ => unreachable!("checked above"),
    }
}

fn inner_ref(carrier: Wrap, value: &Value) -> std::result::Result<&Value, Stop> {
    match value {
        Value::Optional(Some(inner)) if carrier == Wrap::Optional => Ok(&**inner),
        Value::Outcome(Ok(inner)) if carrier == Wrap::Outcome => Ok(&**inner),
        other => Err(stop(carrier, other)),
    }
}

/// The inner value of `arg`, with the provenance of `arg`.
fn open(carrier: Wrap, arg: Arg<'_>) -> std::result::Result<Arg<'_>, Stop> {
    match arg {
        Arg::Owned(value) => match value {
            Value::Optional(Some(inner)) if carrier == Wrap::Optional => Ok(Arg::Owned(*inner)),
            Value::Outcome(Ok(inner)) if carrier == Wrap::Outcome => Ok(Arg::Owned(*inner)),
            other => Err(stop(carrier, &other)),
        },
        Arg::Movable(value) => inner_mut(carrier, value).map(Arg::Movable),
        Arg::Mut(value) => inner_mut(carrier, value).map(Arg::Mut),
        Arg::Ref(value) => inner_ref(carrier, value).map(Arg::Ref),
        Arg::ByRef(inner) => open(carrier, *inner).map(Arg::by_ref),
    }
}

/// Wrap a downstream result in `carrier`, unless it already is one.
fn wrap(carrier: Wrap, out: Finalized<'_>) -> Finalized<'_> {
    let wrapped = matches!(
        (carrier, out.value()),
        (Wrap::Optional, Some(Value::Optional(_))) | (Wrap::Outcome, Some(Value::Outcome(_)))
    );
    if wrapped {
        return out;
    }
    let value = out.into_value();
    Finalized::from_value(match carrier {
        Wrap::Optional => Value::some(value),
        Wrap::Outcome => Value::ok(value),
    })
}

// ─── Instance ───────────────────────────────────────────────────────────────

struct Unwrap {
    carrier: Wrap,
    /// Carrier that stopped the run, once one arrived.
    stopped: Option<Value>,
    path: String,
}

impl Unwrap {
    fn open<'e>(&mut self, input: Bundle<'e>) -> Result<Option<Arg<'e>>> {
        let arg = input.into_single().map_err(|b| {
            PipelineError::internal(&self.path, format!("unwrap received {} positions", b.arity()))
        })?;
        match open(self.carrier, arg) {
            Ok(inner) => Ok(Some(inner)),
            Err(Stop::Carrier(value)) => {
                debug_event!(path = %self.path, "unwrap short-circuit");
                self.stopped = Some(value);
                Ok(None)
            }
            Err(Stop::Mismatch(found)) => Err(PipelineError::Runtime(StageError::new(
                ErrorCode::TypeMismatch,
                self.path.clone(),
                format!("expected {}, found {found}", carrier_name(self.carrier)),
            ))),
        }
    }
}

impl StageInstance for Unwrap {
    fn done(&self) -> bool {
        self.stopped.is_some()
    }

    fn process_incremental(&mut self, input: Bundle<'_>, next: Next<'_>) -> Result<()> {
        if self.stopped.is_some() {
            return Ok(());
        }
        match self.open(input)? {
            Some(inner) => next.process_incremental(Bundle::single(inner)),
            None => Ok(()),
        }
    }

    fn process_complete<'e>(&mut self, input: Bundle<'e>, next: Next<'_>) -> Result<Finalized<'e>> {
        match self.open(input)? {
            Some(inner) => Ok(wrap(self.carrier, next.process_complete(Bundle::single(inner))?)),
            None => Ok(Finalized::from_value(self.stopped.take().unwrap_or_default())),
        }
    }

    fn end(&mut self, next: Next<'_>) -> Result<Finalized<'static>> {
        match self.stopped.take() {
            Some(carrier) => Ok(Finalized::from_value(carrier)),
            None => Ok(wrap(self.carrier, next.end()?)),
        }
    }
}
