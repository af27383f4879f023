//! Stage styles and the compatibility rules between adjacent stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a stage side handles one element at a time or a whole value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Incremental,
    Complete,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incremental => "incremental",
            Self::Complete => "complete",
        }
    }
}

/// Input and output flow of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Style {
    pub input: Flow,
    pub output: Flow,
}

impl Style {
    pub const INCREMENTAL_TO_INCREMENTAL: Style = Style::new(Flow::Incremental, Flow::Incremental);
    pub const INCREMENTAL_TO_COMPLETE: Style = Style::new(Flow::Incremental, Flow::Complete);
    pub const COMPLETE_TO_COMPLETE: Style = Style::new(Flow::Complete, Flow::Complete);

    pub const fn new(input: Flow, output: Flow) -> Self {
        Self { input, output }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.input.as_str(), self.output.as_str())
    }
}

/// How the output of one stage reaches the input of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same flow on both sides.
    Direct,
    /// A complete value is iterated into an incremental stage.
    Bridge,
    /// Single elements cannot be handed to a stage that needs the whole
    /// value.
    Forbidden,
}

/// Connect a producer flow to a consumer flow.
pub fn connect(output: Flow, input: Flow) -> Transition {
    match (output, input) {
        (Flow::Incremental, Flow::Complete) => Transition::Forbidden,
        (Flow::Complete, Flow::Incremental) => Transition::Bridge,
        _ => Transition::Direct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rules() {
        assert_eq!(
            connect(Flow::Incremental, Flow::Complete),
            Transition::Forbidden
        );
        assert_eq!(
            connect(Flow::Complete, Flow::Incremental),
            Transition::Bridge
        );
        assert_eq!(connect(Flow::Complete, Flow::Complete), Transition::Direct);
        assert_eq!(
            connect(Flow::Incremental, Flow::Incremental),
            Transition::Direct
        );
    }

    #[test]
    fn test_style_display() {
        assert_eq!(
            Style::INCREMENTAL_TO_COMPLETE.to_string(),
            "incremental->complete"
        );
    }
}
