//! # sluice
//!
//! Push-based sequence pipelines with construction-time ownership and shape
//! checking.
//!
//! A pipeline is a source (an owned or borrowed [`Value`], a lazy
//! [`Generator`], or another [`Pipeline`]) plus an ordered list of stage
//! descriptors. The chain builder validates style compatibility between
//! adjacent stages, binds every descriptor to the concrete [`Shape`] of the
//! elements it will receive (arity, provenance and kind per position), and
//! then drives the source through the chain one element at a time.
//!
//! Every position of every element is a provenance-tagged [`Arg`]: owned,
//! mutably borrowed, or immutably borrowed. The tag is part of the
//! construction-time shape, and the borrow itself is a real Rust reference,
//! so a stage can move out of temporaries, sort a mutably borrowed source in
//! place, or read through shared borrows without copying, and the borrow
//! checker guarantees that borrowed data outlives the run.
//!
//! ```
//! use sluice::{apply, filter, count, Value};
//!
//! let evens = apply(
//!     Value::list([1, 2, 3, 4, 5, 6]),
//!     (filter(|x: &Value| x.as_int().map_or(false, |i| i % 2 == 0)), count()),
//! )
//! .unwrap();
//! assert_eq!(evens.into_value(), Value::from(3));
//! ```
//!
//! # Feature flags
//!
//! - `tracing` (default): spans for chain building and execution, plus
//!   debug events for binding, bridging, grouping and short-circuits.

// ---------------------------------------------------------------------------
// Conditional tracing support
// ---------------------------------------------------------------------------

/// Enter a tracing span for a pipeline phase (when the `tracing` feature is
/// enabled). When disabled, this is a no-op and the compiler eliminates it.
macro_rules! trace_stage {
    ($name:expr) => {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("pipeline_stage", stage = $name).entered();
    };
    ($name:expr, $path:expr) => {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("pipeline_stage", stage = $name, path = $path).entered();
    };
}

/// Emit a `debug!` event when tracing is enabled.
macro_rules! debug_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)*);
    };
}

/// Emit a `warn!` event when tracing is enabled.
macro_rules! warn_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::warn!($($arg)*);
    };
}

pub mod bundle;
pub mod ownership;
pub mod pipeline;
pub mod source;
pub mod stages;
pub mod value;

pub use bundle::{Arity, Bundle, ByArg, ByValue, ByView, FlattenMode, MoveFn, ViewFn};
pub use ownership::{finalize, Arg, Effect, Finalized, OwnershipError, Provenance, Resolved};
pub use pipeline::{
    apply, apply_with, compose, BindContext, Bound, Chain, Composition, EngineConfig, ErrorCode,
    Flow, GroupOrder, IntoStages, Next, Pipeline, PipelineError, Result, Shape, Slot, Stage,
    StageDescriptor, StageError, StageInstance, Style, ValidationEngine, ValidationReport,
};
pub use source::{iota, iota_range, Generator, Source};
pub use stages::*;
pub use value::{AddError, IntoValue, Kind, Value};
