//! Engine configuration.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "max_stages": 256,
//!   "strict": false,
//!   "group_order": "first_seen"
//! }
//! ```
//!
//! Every field is optional. Unrecognized fields are kept and reported by
//! the validation engine (warnings, or errors in strict mode).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::Result;

/// Default upper bound on the number of stages in one chain, nested
/// sub-chains included.
pub const DEFAULT_MAX_STAGES: usize = 256;

/// Runtime settings shared by a chain and all of its sub-chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_stages")]
    pub max_stages: usize,

    /// If `true`, validation warnings are errors.
    #[serde(default)]
    pub strict: bool,

    /// Emission order of `map_group_by` groups that do not pick their own.
    #[serde(default)]
    pub group_order: GroupOrder,

    /// Captures any fields not recognized by the schema.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_json::Value>,
}

fn default_max_stages() -> usize {
    DEFAULT_MAX_STAGES
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stages: DEFAULT_MAX_STAGES,
            strict: false,
            group_order: GroupOrder::default(),
            unknown_fields: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_stages(mut self, max_stages: usize) -> Self {
        self.max_stages = max_stages;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_group_order(mut self, order: GroupOrder) -> Self {
        self.group_order = order;
        self
    }
}

/// Order in which a global group-by emits its groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    /// Order in which each key was first seen.
    #[default]
    FirstSeen,
    /// Ascending key order.
    Sorted,
    /// Hash-map iteration order. Deterministic for a given input and build,
    /// but otherwise unspecified.
    Hashed,
}

impl GroupOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstSeen => "first_seen",
            Self::Sorted => "sorted",
            Self::Hashed => "hashed",
        }
    }
}
