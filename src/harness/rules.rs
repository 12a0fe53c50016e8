//! Line rules applied by the log analyzer.

use std::fmt;

/// Pattern of the per-test status line printed by the runtime.
pub const EXECUTION_STATUS_PATTERN: &str = r"Execution status:\s+(\w+)";

/// Status word that counts as a pass (compared case-insensitively).
pub const PASS_STATUS: &str = "Pass";

/// Messages the runtime and its CLI print when a run cannot proceed.
const PATH_NOT_FOUND: &str = "cannot find the path";
const INVALID_DIRECTORY: &str = "valid directory";
const NO_PROJECT_EXPORTED: &str = "No project to be exported";
const REPORT_FAILED: &str = "Failed to generate report";
const ERROR: &str = "Error";

/// A line condition that fails the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The line contains the text anywhere.
    Contains(String),
    /// The line starts with the text.
    StartsWith(String),
}

impl Trigger {
    pub fn contains(text: impl Into<String>) -> Self {
        Trigger::Contains(text.into())
    }

    pub fn starts_with(text: impl Into<String>) -> Self {
        Trigger::StartsWith(text.into())
    }

    /// Whether `line` fires this trigger.
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Trigger::Contains(text) => line.contains(text.as_str()),
            Trigger::StartsWith(text) => line.starts_with(text.as_str()),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Contains(text) => write!(f, "contains {text:?}"),
            Trigger::StartsWith(text) => write!(f, "starts with {text:?}"),
        }
    }
}

/// What the analyzer looks for in each line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    /// Any match fails the run.
    pub triggers: Vec<Trigger>,
    /// Trim whitespace before matching.
    pub trim_lines: bool,
    /// Regex whose first group captures a per-test status word.
    pub status_pattern: Option<String>,
    /// Status word that counts as a pass.
    pub pass_word: String,
}

impl RuleSet {
    /// An empty rule set that passes every log.
    pub fn new() -> Self {
        Self {
            triggers: Vec::new(),
            trim_lines: false,
            status_pattern: None,
            pass_word: PASS_STATUS.to_string(),
        }
    }

    /// Add a failure trigger.
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Trim lines before matching.
    pub fn trim_lines(mut self) -> Self {
        self.trim_lines = true;
        self
    }

    /// Extract per-test statuses with `pattern`.
    pub fn status_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.status_pattern = Some(pattern.into());
        self
    }

    /// Hard-failure rules used to gate artifact export.
    ///
    /// Any line *containing* one of the error messages is invalid.
    pub fn validity() -> Self {
        Self::new()
            .trigger(Trigger::contains(ERROR))
            .trigger(Trigger::contains(PATH_NOT_FOUND))
            .trigger(Trigger::contains(INVALID_DIRECTORY))
            .trigger(Trigger::contains(NO_PROJECT_EXPORTED))
            .trigger(Trigger::contains(REPORT_FAILED))
    }

    /// Pass/fail rules for a test run.
    ///
    /// Lines are trimmed; a line *starting with* `Error` or containing one of the
    /// path/report messages fails, and every status line must say `Pass`.
    pub fn verdict() -> Self {
        Self::new()
            .trim_lines()
            .trigger(Trigger::starts_with(ERROR))
            .trigger(Trigger::contains(PATH_NOT_FOUND))
            .trigger(Trigger::contains(INVALID_DIRECTORY))
            .trigger(Trigger::contains(REPORT_FAILED))
            .status_pattern(EXECUTION_STATUS_PATTERN)
    }

    /// First trigger fired by `line`, if any.
    pub fn fired_by(&self, line: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.matches(line))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_matching() {
        assert!(Trigger::contains("Error").matches("Found Error in output"));
        assert!(!Trigger::starts_with("Error").matches("Found Error in output"));
        assert!(Trigger::starts_with("Error").matches("Error: disk full"));
    }

    #[test]
    fn test_validity_and_verdict_differ_on_embedded_error() {
        let line = "Found Error in output";
        assert!(RuleSet::validity().fired_by(line).is_some());
        assert!(RuleSet::verdict().fired_by(line).is_none());
    }

    #[test]
    fn test_no_project_only_in_validity() {
        let line = "No project to be exported";
        assert!(RuleSet::validity().fired_by(line).is_some());
        assert!(RuleSet::verdict().fired_by(line).is_none());
    }

    #[test]
    fn test_verdict_preset_shape() {
        let rules = RuleSet::verdict();
        assert!(rules.trim_lines);
        assert_eq!(rules.status_pattern.as_deref(), Some(EXECUTION_STATUS_PATTERN));
        assert_eq!(rules.pass_word, "Pass");
        assert_eq!(rules.triggers.len(), 4);
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(
            Trigger::contains("valid directory").to_string(),
            "contains \"valid directory\""
        );
        assert_eq!(Trigger::starts_with("Error").to_string(), "starts with \"Error\"");
    }
}
