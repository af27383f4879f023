//! Stage trait definitions for the pipeline.
//!
//! A stage exists in two forms. A [`StageDescriptor`] is the immutable
//! blueprint (callback, count, nested compositions) declared once and shared
//! by handle. Binding it to the concrete [`Shape`] of its input produces a
//! [`StageInstance`], the stateful realization that lives in one chain.

use std::fmt;
use std::rc::Rc;

use crate::bundle::Bundle;
use crate::ownership::Finalized;

use super::chain::Next;
use super::config::EngineConfig;
use super::error_code::ErrorCode;
use super::errors::{PipelineError, Result, StageError};
use super::shape::Shape;
use super::style::Style;
use super::validation::ValidationDiagnostic;

// ============================================================================
// StageDescriptor: the immutable blueprint
// ============================================================================

/// Declarative, reusable description of one processing step.
///
/// # Contract
///
/// - **Style**: fixed per descriptor, known before binding.
/// - **Bind**: may run many times (one sub-chain per group key), never
///   mutates the descriptor, and fails with a located error when the input
///   shape does not fit.
/// - **Check**: shape-independent self-validation, reported together with
///   the chain plan's other diagnostics.
pub trait StageDescriptor {
    /// Stable stage name used in diagnostics (e.g., `"take_n"`).
    fn name(&self) -> &'static str;

    fn style(&self) -> Style;

    /// Shape-independent findings about this descriptor at `path`.
    fn check(&self, _path: &str) -> Vec<ValidationDiagnostic> {
        Vec::new()
    }

    /// Number of stages this descriptor contributes to the chain depth,
    /// nested compositions included.
    fn stage_count(&self) -> usize {
        1
    }

    /// Bind to the shape of the elements (or complete value) this stage
    /// will receive.
    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound>;
}

// ============================================================================
// StageInstance: the bound, stateful realization
// ============================================================================

/// A bound stage inside a chain.
///
/// Each call receives a [`Next`] cursor over the rest of the chain and
/// recurses into it directly; the call stack is the pipeline.
///
/// Only the methods matching the stage's style are ever called. The
/// default `process_*` methods report an engine invariant violation.
pub trait StageInstance {
    /// Whether this stage wants no further input. A stage with no
    /// completion condition of its own returns `false`, leaving the decision
    /// to the stages after it.
    fn done(&self) -> bool {
        false
    }

    fn process_incremental(&mut self, _input: Bundle<'_>, _next: Next<'_>) -> Result<()> {
        Err(PipelineError::internal(
            "",
            "stage does not accept incremental input",
        ))
    }

    fn process_complete<'e>(
        &mut self,
        _input: Bundle<'e>,
        _next: Next<'_>,
    ) -> Result<Finalized<'e>> {
        Err(PipelineError::internal(
            "",
            "stage does not accept complete input",
        ))
    }

    /// Input is exhausted (or the chain stopped early): flush aggregates
    /// into the rest of the chain and return the terminal value. The
    /// default forwards the end unchanged.
    fn end(&mut self, next: Next<'_>) -> Result<Finalized<'static>> {
        next.end()
    }
}

/// Carrier a short-circuiting stage wraps around the downstream result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Optional,
    Outcome,
}

impl Wrap {
    /// Result shape seen upstream of the wrapping stage.
    pub fn apply(self, result: Shape) -> Shape {
        use crate::pipeline::shape::Slot;
        use crate::value::Kind;

        let packed = result.packed_kind();
        let wrapped = match (self, &packed) {
            (Wrap::Optional, Kind::Optional(_)) | (Wrap::Outcome, Kind::Outcome(_)) => {
                return result
            }
            (Wrap::Optional, _) => Kind::Optional(Box::new(packed)),
            (Wrap::Outcome, _) => Kind::Outcome(Box::new(packed)),
        };
        Shape::single(Slot::owned(wrapped))
    }
}

/// A descriptor bound to its input shape.
pub struct Bound {
    pub instance: Box<dyn StageInstance>,
    /// Shape of what the stage emits.
    pub output: Shape,
    pub wrap: Option<Wrap>,
}

impl Bound {
    pub fn new(instance: impl StageInstance + 'static, output: Shape) -> Self {
        Self {
            instance: Box::new(instance),
            output,
            wrap: None,
        }
    }

    pub fn wrapping(mut self, wrap: Wrap) -> Self {
        self.wrap = Some(wrap);
        self
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("output", &self.output)
            .field("wrap", &self.wrap)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Stage: shared descriptor handle
// ============================================================================

/// Cheap-clone handle to a stage descriptor.
#[derive(Clone)]
pub struct Stage(Rc<dyn StageDescriptor>);

impl Stage {
    pub fn new(descriptor: impl StageDescriptor + 'static) -> Self {
        Stage(Rc::new(descriptor))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn style(&self) -> Style {
        self.0.style()
    }

    pub fn descriptor(&self) -> &dyn StageDescriptor {
        &*self.0
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stage").field(&self.name()).finish()
    }
}

// ============================================================================
// BindContext: configuration and location while binding
// ============================================================================

/// Where a descriptor is being bound, and under which configuration.
#[derive(Debug, Clone)]
pub struct BindContext {
    config: Rc<EngineConfig>,
    path: String,
}

impl BindContext {
    pub fn new(config: Rc<EngineConfig>) -> Self {
        Self {
            config,
            path: String::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared handle to the configuration, for stages that rebuild
    /// sub-chains while running.
    pub fn shared_config(&self) -> Rc<EngineConfig> {
        Rc::clone(&self.config)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this is the outermost chain.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Context of a nested sub-chain, e.g. `nested("/branches/1")`.
    pub fn nested(&self, segment: &str) -> BindContext {
        BindContext {
            config: Rc::clone(&self.config),
            path: format!("{}{segment}", self.path),
        }
    }

    /// Context of stage `index` of this chain.
    pub fn stage(&self, index: usize) -> BindContext {
        self.nested(&format!("/stages/{index}"))
    }

    /// A bind error located at this context.
    pub fn error(&self, code: ErrorCode, message: impl Into<String>) -> PipelineError {
        PipelineError::Bind(StageError::new(code, self.path.clone(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::shape::Slot;
    use crate::value::Kind;

    #[test]
    fn test_nested_paths() {
        let cx = BindContext::new(Rc::new(EngineConfig::default()));
        assert!(cx.is_root());
        let branch = cx.stage(2).nested("/branches/1").stage(0);
        assert_eq!(branch.path(), "/stages/2/branches/1/stages/0");
        assert!(!branch.is_root());
    }

    #[test]
    fn test_wrap_does_not_double_wrap() {
        let plain = Shape::single(Slot::owned(Kind::Int));
        let once = Wrap::Optional.apply(plain);
        assert_eq!(once.packed_kind().to_string(), "optional<int>");
        let twice = Wrap::Optional.apply(once.clone());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_bind_error_carries_path() {
        let cx = BindContext::new(Rc::new(EngineConfig::default())).stage(4);
        let err = cx.error(ErrorCode::ArityMismatch, "bad arity");
        assert_eq!(err.stage_error().map(|e| e.path.as_str()), Some("/stages/4"));
    }
}
