//! Chain construction and execution.
//!
//! - [`traits`]: the descriptor/instance seam every stage implements.
//! - [`validation`]: plan rules run before binding.
//! - [`builder`]: shape propagation, bridge insertion and binding.
//! - [`chain`]: bound chains and the [`Next`] cursor.
//! - [`runner`]: [`apply`] and [`Pipeline`].

pub mod builder;
pub mod chain;
pub mod compose;
pub mod config;
pub mod error_code;
pub mod errors;
pub mod runner;
pub mod shape;
pub mod style;
pub mod traits;
pub mod validation;

pub use builder::{bind_chain, build_chain, Feed};
pub use chain::{Chain, Next};
pub use compose::{compose, Composition, IntoBranches, IntoStages};
pub use config::{EngineConfig, GroupOrder, DEFAULT_MAX_STAGES};
pub use error_code::ErrorCode;
pub use errors::{PipelineError, Result, StageError};
pub use runner::{apply, apply_with, Pipeline};
pub use shape::{Shape, Slot};
pub use style::{connect, Flow, Style, Transition};
pub use traits::{BindContext, Bound, Stage, StageDescriptor, StageInstance, Wrap};
pub use validation::{
    ChainPlan, FeedKind, Severity, ValidationDiagnostic, ValidationEngine, ValidationReport,
    ValidationRule,
};
