//! Pipeline sources.
//!
//! A source is a value (owned, mutably borrowed or borrowed), a lazy
//! [`Generator`], or another [`Pipeline`] whose stages are spliced in front
//! of the outer ones.

mod generator;
mod iterate;

pub use generator::{iota, iota_range, Generator};
pub use iterate::{drive_generator, for_each_element};

use crate::ownership::{Arg, Provenance};
use crate::pipeline::Pipeline;
use crate::value::{IntoValue, Value};

#[derive(Debug)]
pub enum Source<'s> {
    Value(Arg<'s>),
    Generator(Generator),
    Pipeline(Box<Pipeline<'s>>),
}

impl<'s> Source<'s> {
    /// An owned temporary. Stages may move out of it.
    pub fn owned(value: impl IntoValue) -> Self {
        Source::Value(Arg::Owned(value.into_value()))
    }

    /// A shared borrow of caller data.
    pub fn borrowed(value: &'s Value) -> Self {
        Source::Value(Arg::Ref(value))
    }

    /// A mutable borrow, required by in-place stages such as sorting.
    pub fn borrowed_mut(value: &'s mut Value) -> Self {
        Source::Value(Arg::Mut(value))
    }

    /// Provenance of a value source; generators produce owned elements.
    pub fn provenance(&self) -> Provenance {
        match self {
            Source::Value(arg) => arg.provenance(),
            Source::Generator(_) => Provenance::Owned,
            Source::Pipeline(p) => p.source().provenance(),
        }
    }
}

impl From<Value> for Source<'_> {
    fn from(value: Value) -> Self {
        Source::Value(Arg::Owned(value))
    }
}

impl<'s> From<&'s Value> for Source<'s> {
    fn from(value: &'s Value) -> Self {
        Source::Value(Arg::Ref(value))
    }
}

impl<'s> From<&'s mut Value> for Source<'s> {
    fn from(value: &'s mut Value) -> Self {
        Source::Value(Arg::Mut(value))
    }
}

impl From<Generator> for Source<'_> {
    fn from(gen: Generator) -> Self {
        Source::Generator(gen)
    }
}

impl<'s> From<Pipeline<'s>> for Source<'s> {
    fn from(pipeline: Pipeline<'s>) -> Self {
        Source::Pipeline(Box::new(pipeline))
    }
}
