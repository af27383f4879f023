//! Plan checks that run before any stage is bound.
//!
//! Every rule sees the whole [`ChainPlan`] and the findings of all rules are
//! kept, so a rejected chain reports each of its problems together.
//!
//! Rules only look at what is known before binding: stage styles, the kind
//! of feed, stage counts, descriptor self-checks and the configuration.
//! Shape-dependent failures surface later, from binding.
//!
//! ```
//! use sluice::pipeline::{ChainPlan, EngineConfig, FeedKind, ValidationEngine};
//! use sluice::{sort, take_n, to_vec};
//!
//! let stages = [take_n(2), sort(), to_vec()];
//! let config = EngineConfig::default();
//! let plan = ChainPlan { path: "", feed: FeedKind::Value, stages: &stages, config: &config };
//! let report = ValidationEngine::with_defaults().validate(&plan);
//! assert_eq!(report.errors().next().map(|e| e.path.as_str()), Some("/stages/1"));
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::config::EngineConfig;
use super::error_code::ErrorCode;
use super::errors::StageError;
use super::style::{connect, Flow, Transition};
use super::traits::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Rejects the chain.
    Error,
    /// Logged; rejects the chain only in strict mode.
    Warning,
}

/// A [`StageError`] tagged with how seriously the engine takes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    #[serde(flatten)]
    pub error: StageError,
}

impl ValidationDiagnostic {
    pub fn error(error: StageError) -> Self {
        Self { severity: Severity::Error, error }
    }

    pub fn warning(error: StageError) -> Self {
        Self { severity: Severity::Warning, error }
    }
}

/// Everything the rules found for one chain, in rule order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &StageError> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
            .map(|d| &d.error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &StageError> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StageError> {
        self.with_severity(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Promote every warning to an error.
    pub fn escalate(mut self) -> Self {
        for d in &mut self.diagnostics {
            d.severity = Severity::Error;
        }
        self
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// What feeds the first stage of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// A complete value.
    Value,
    /// A lazy generator, iterated element by element.
    Generator,
    /// Individual elements pushed by an enclosing stage.
    Elements,
}

impl FeedKind {
    pub fn flow(self) -> Flow {
        match self {
            FeedKind::Value => Flow::Complete,
            FeedKind::Generator | FeedKind::Elements => Flow::Incremental,
        }
    }
}

/// A chain as seen before binding.
#[derive(Debug, Clone, Copy)]
pub struct ChainPlan<'p> {
    /// Address of the chain (`""` for the outermost one).
    pub path: &'p str,
    pub feed: FeedKind,
    pub stages: &'p [Stage],
    pub config: &'p EngineConfig,
}

impl ChainPlan<'_> {
    fn stage_path(&self, index: usize) -> String {
        format!("{}/stages/{index}", self.path)
    }

    fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

pub trait ValidationRule {
    fn name(&self) -> &str;

    fn validate(&self, plan: &ChainPlan<'_>) -> Vec<ValidationDiagnostic>;
}

/// The rule set a chain is checked against. In strict mode the returned
/// report has its warnings escalated.
pub struct ValidationEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidationEngine {
    pub fn with_defaults() -> Self {
        Self {
            rules: vec![
                Box::new(StyleTransitionsRule),
                Box::new(GeneratorSourceRule),
                Box::new(TerminalStyleRule),
                Box::new(StageLimitRule),
                Box::new(DescriptorChecksRule),
                Box::new(UnknownConfigFieldsRule),
            ],
        }
    }

    /// Append a rule; it runs after the ones already present.
    pub fn with_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn validate(&self, plan: &ChainPlan<'_>) -> ValidationReport {
        let report = ValidationReport {
            diagnostics: self.rules.iter().flat_map(|r| r.validate(plan)).collect(),
        };
        if plan.config.strict {
            report.escalate()
        } else {
            report
        }
    }
}

// ─── 1. Incremental output never feeds a complete-input stage ───────────────

struct StyleTransitionsRule;

impl ValidationRule for StyleTransitionsRule {
    fn name(&self) -> &str {
        "style_transitions"
    }

    fn validate(&self, plan: &ChainPlan<'_>) -> Vec<ValidationDiagnostic> {
        let mut out = Vec::new();
        let mut flow = plan.feed.flow();
        let mut producer = match plan.feed {
            FeedKind::Value => "the source",
            FeedKind::Generator => "the generator",
            FeedKind::Elements => "the enclosing stage",
        };

        for (i, stage) in plan.stages.iter().enumerate() {
            let style = stage.style();
            // A generator feeding stage 0 is the generator_source rule's finding.
            let generator_head = i == 0 && plan.feed == FeedKind::Generator;
            if connect(flow, style.input) == Transition::Forbidden && !generator_head {
                out.push(ValidationDiagnostic::error(
                    StageError::new(
                        ErrorCode::IncompatibleStyle,
                        plan.stage_path(i),
                        format!(
                            "{} needs complete input but {producer} emits single elements",
                            stage.name()
                        ),
                    )
                    .with_hint("insert a collecting stage such as to_vec()"),
                ));
            }
            flow = style.output;
            producer = stage.name();
        }

        out
    }
}

// ─── 2. Generators only feed incremental stages ─────────────────────────────

struct GeneratorSourceRule;

impl ValidationRule for GeneratorSourceRule {
    fn name(&self) -> &str {
        "generator_source"
    }

    fn validate(&self, plan: &ChainPlan<'_>) -> Vec<ValidationDiagnostic> {
        if plan.feed != FeedKind::Generator {
            return vec![];
        }
        let hint = "generators can only feed incremental stages; collect with to_vec() first";
        match plan.stages.first() {
            None => vec![ValidationDiagnostic::error(
                StageError::new(
                    ErrorCode::GeneratorToComplete,
                    plan.path,
                    "a generator cannot be finalized directly",
                )
                .with_hint(hint),
            )],
            Some(first) if first.style().input == Flow::Complete => {
                vec![ValidationDiagnostic::error(
                    StageError::new(
                        ErrorCode::GeneratorToComplete,
                        plan.stage_path(0),
                        format!("{} needs complete input but is fed by a generator", first.name()),
                    )
                    .with_hint(hint),
                )]
            }
            Some(_) => vec![],
        }
    }
}

// ─── 3. The chain ends in a value-producing stage ───────────────────────────

struct TerminalStyleRule;

impl ValidationRule for TerminalStyleRule {
    fn name(&self) -> &str {
        "terminal_style"
    }

    fn validate(&self, plan: &ChainPlan<'_>) -> Vec<ValidationDiagnostic> {
        let last_flow = plan
            .stages
            .last()
            .map_or(plan.feed.flow(), |s| s.style().output);
        // An empty generator chain is already reported by generator_source.
        let empty_generator = plan.stages.is_empty() && plan.feed == FeedKind::Generator;
        if last_flow == Flow::Complete || empty_generator {
            return vec![];
        }

        let path = match plan.stages.len() {
            0 => plan.path.to_string(),
            n => plan.stage_path(n - 1),
        };
        vec![ValidationDiagnostic::error(
            StageError::new(
                ErrorCode::MissingTerminal,
                path,
                "pipeline must end in a value-producing stage",
            )
            .with_hint("finish with a collecting or folding stage such as to_vec() or count()"),
        )]
    }
}

// ─── 4. Stage count stays within the configured limit ───────────────────────

struct StageLimitRule;

impl ValidationRule for StageLimitRule {
    fn name(&self) -> &str {
        "stage_limit"
    }

    fn validate(&self, plan: &ChainPlan<'_>) -> Vec<ValidationDiagnostic> {
        // Nested chains are counted by their parent's stage_count.
        if !plan.is_root() {
            return vec![];
        }
        let total: usize = plan
            .stages
            .iter()
            .map(|s| s.descriptor().stage_count())
            .sum();
        if total <= plan.config.max_stages {
            return vec![];
        }
        vec![ValidationDiagnostic::error(
            StageError::new(
                ErrorCode::TooManyStages,
                plan.path,
                format!(
                    "chain has {total} stages, limit is {}",
                    plan.config.max_stages
                ),
            )
            .with_hint("raise max_stages in the engine configuration or split the pipeline"),
        )]
    }
}

// ─── 5. Descriptor self-checks ──────────────────────────────────────────────

struct DescriptorChecksRule;

impl ValidationRule for DescriptorChecksRule {
    fn name(&self) -> &str {
        "descriptor_checks"
    }

    fn validate(&self, plan: &ChainPlan<'_>) -> Vec<ValidationDiagnostic> {
        plan.stages
            .iter()
            .enumerate()
            .flat_map(|(i, stage)| stage.descriptor().check(&plan.stage_path(i)))
            .collect()
    }
}

// ─── 6. Unknown config fields ───────────────────────────────────────────────

struct UnknownConfigFieldsRule;

impl ValidationRule for UnknownConfigFieldsRule {
    fn name(&self) -> &str {
        "unknown_config_fields"
    }

    fn validate(&self, plan: &ChainPlan<'_>) -> Vec<ValidationDiagnostic> {
        if !plan.is_root() {
            return vec![];
        }
        // Strict escalation happens in the engine.
        unknown_fields(&plan.config.unknown_fields)
            .map(ValidationDiagnostic::warning)
            .collect()
    }
}

fn unknown_fields(
    fields: &HashMap<String, serde_json::Value>,
) -> impl Iterator<Item = StageError> + '_ {
    let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys.into_iter().map(|key| {
        StageError::new(
            ErrorCode::UnknownField,
            format!("/config/{key}"),
            format!("unrecognized field \"{key}\""),
        )
        .with_hint("known fields are max_stages, strict and group_order")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{count, filter, flatten_forward, sort, swizzle, take_n, tee, to_vec};
    use crate::value::Value;

    fn engine() -> ValidationEngine {
        ValidationEngine::with_defaults()
    }

    fn check(feed: FeedKind, stages: &[Stage], config: &EngineConfig) -> ValidationReport {
        engine().validate(&ChainPlan {
            path: "",
            feed,
            stages,
            config,
        })
    }

    fn codes(report: &ValidationReport) -> Vec<ErrorCode> {
        report.errors().map(|e| e.code).collect()
    }

    fn even(x: &Value) -> bool {
        x.as_int().map_or(false, |i| i % 2 == 0)
    }

    // ─── Valid plans ────────────────────────────────────────────────────

    #[test]
    fn test_empty_value_chain_is_valid() {
        let report = check(FeedKind::Value, &[], &EngineConfig::default());
        assert!(!report.has_errors());
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_bridged_chain_is_valid() {
        let stages = [sort(), filter(even), take_n(2), to_vec()];
        let report = check(FeedKind::Value, &stages, &EngineConfig::default());
        assert!(report.diagnostics.is_empty(), "{report}");
    }

    struct NoSort;

    impl ValidationRule for NoSort {
        fn name(&self) -> &str {
            "no_sort"
        }

        fn validate(&self, plan: &ChainPlan<'_>) -> Vec<ValidationDiagnostic> {
            plan.stages
                .iter()
                .enumerate()
                .filter(|(_, s)| s.name() == "sort")
                .map(|(i, _)| {
                    ValidationDiagnostic::warning(StageError::new(
                        ErrorCode::RiskyStage,
                        plan.stage_path(i),
                        "sorting is discouraged here",
                    ))
                })
                .collect()
        }
    }

    #[test]
    fn test_added_rule_runs_after_defaults() {
        let stages = [filter(even), sort(), to_vec()];
        let plan = ChainPlan {
            path: "",
            feed: FeedKind::Value,
            stages: &stages,
            config: &EngineConfig::default(),
        };
        let report = engine().with_rule(NoSort).validate(&plan);
        assert_eq!(codes(&report), vec![ErrorCode::IncompatibleStyle]);
        let warning = report.warnings().next().unwrap();
        assert_eq!(warning.code, ErrorCode::RiskyStage);
        assert_eq!(warning.path, "/stages/1");
    }

    #[test]
    fn test_strict_config_escalates_descriptor_warnings() {
        let stages = [flatten_forward(), to_vec()];
        let strict = EngineConfig::default().with_strict(true);
        let report = check(FeedKind::Value, &stages, &strict);
        assert_eq!(codes(&report), vec![ErrorCode::RiskyStage]);
        assert_eq!(report.warnings().count(), 0);
    }

    // ─── Style rules ────────────────────────────────────────────────────

    #[test]
    fn test_incremental_into_complete_is_rejected() {
        let stages = [filter(even), sort(), to_vec()];
        let report = check(FeedKind::Value, &stages, &EngineConfig::default());
        let err = report.errors().next().unwrap();
        assert_eq!(err.code, ErrorCode::IncompatibleStyle);
        assert_eq!(err.path, "/stages/1");
        assert!(err.message.contains("filter"));
        assert_eq!(
            err.hint.as_deref(),
            Some("insert a collecting stage such as to_vec()")
        );
    }

    #[test]
    fn test_generator_into_complete_is_reported_once() {
        let stages = [sort(), to_vec()];
        let report = check(FeedKind::Generator, &stages, &EngineConfig::default());
        assert_eq!(codes(&report), vec![ErrorCode::GeneratorToComplete]);
    }

    #[test]
    fn test_empty_generator_chain_is_rejected() {
        let report = check(FeedKind::Generator, &[], &EngineConfig::default());
        assert_eq!(codes(&report), vec![ErrorCode::GeneratorToComplete]);
    }

    #[test]
    fn test_missing_terminal_names_last_stage() {
        let stages = [to_vec(), filter(even)];
        let report = check(FeedKind::Value, &stages, &EngineConfig::default());
        let err = report.errors().next().unwrap();
        assert_eq!(err.code, ErrorCode::MissingTerminal);
        assert_eq!(err.path, "/stages/1");
        assert_eq!(err.message, "pipeline must end in a value-producing stage");
    }

    #[test]
    fn test_all_problems_are_collected() {
        let stages = [filter(even), sort(), take_n(1)];
        let report = check(FeedKind::Value, &stages, &EngineConfig::default());
        assert_eq!(
            codes(&report),
            vec![ErrorCode::IncompatibleStyle, ErrorCode::MissingTerminal]
        );
    }

    // ─── Limits and descriptors ─────────────────────────────────────────

    #[test]
    fn test_stage_limit_counts_nested_branches() {
        let stages = [tee((count(), (filter(even), count())))];
        let config = EngineConfig::default().with_max_stages(3);
        let report = check(FeedKind::Value, &stages, &config);
        assert_eq!(codes(&report), vec![ErrorCode::TooManyStages]);

        let roomy = EngineConfig::default().with_max_stages(4);
        assert!(!check(FeedKind::Value, &stages, &roomy).has_errors());
    }

    #[test]
    fn test_duplicate_swizzle_index_is_found_before_binding() {
        let stages = [swizzle([0, 0]), to_vec()];
        let report = check(FeedKind::Value, &stages, &EngineConfig::default());
        let err = report.errors().next().unwrap();
        assert_eq!(err.code, ErrorCode::DuplicateIndex);
        assert_eq!(err.path, "/stages/0");
    }

    #[test]
    fn test_forward_flatten_is_a_warning() {
        let stages = [flatten_forward(), to_vec()];
        let report = check(FeedKind::Value, &stages, &EngineConfig::default());
        assert!(!report.has_errors());
        assert_eq!(report.warnings().next().map(|w| w.code), Some(ErrorCode::RiskyStage));
        assert!(report.escalate().has_errors());
    }

    // ─── Configuration ──────────────────────────────────────────────────

    #[test]
    fn test_unknown_config_field_warns() {
        let config = EngineConfig::from_json(r#"{ "max_stagez": 3 }"#).unwrap();
        let report = check(FeedKind::Value, &[], &config);
        assert!(!report.has_errors());
        let warning = report.warnings().next().unwrap();
        assert_eq!(warning.path, "/config/max_stagez");
    }

    #[test]
    fn test_unknown_config_field_is_error_when_strict() {
        let config = EngineConfig::from_json(r#"{ "strict": true, "colour": "red" }"#).unwrap();
        let report = check(FeedKind::Value, &[], &config);
        assert_eq!(codes(&report), vec![ErrorCode::UnknownField]);
    }

    #[test]
    fn test_report_display_joins_errors() {
        let stages = [filter(even), sort(), take_n(1)];
        let report = check(FeedKind::Value, &stages, &EngineConfig::default());
        let text = report.to_string();
        assert!(text.starts_with("[incompatible_style] /stages/1"));
        assert!(text.contains("; [missing_terminal] /stages/2"));
    }

    #[test]
    fn test_report_serializes_flat_diagnostics() {
        let config = EngineConfig::from_json(r#"{ "colour": "red" }"#).unwrap();
        let report = check(FeedKind::Value, &[], &config);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["diagnostics"][0]["severity"], "warning");
        assert_eq!(json["diagnostics"][0]["code"], "unknown_field");
    }
}
