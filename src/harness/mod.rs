//! Console log analysis for iTest runs.
//!
//! The analyzer sits after the runner in the pipeline: `CommandBuilder → ProcessRunner → LogAnalyzer`.
//! The runner appends raw output to the build log; the analyzer reads it back once and
//! interprets it using a [`RuleSet`].

mod formatter;
mod parser;
pub mod rules;

pub use formatter::ResultFormatter;
pub use parser::LogAnalyzer;
pub use rules::{RuleSet, Trigger};

/// Pass or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

/// Status reported for one test execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVerdict {
    /// Test case name, or `test #n` when more status lines than test cases appear.
    pub name: String,
    /// Status word as printed by the runtime.
    pub status: String,
    pub verdict: Verdict,
}

/// Why a scan failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A failure trigger fired.
    Trigger(String),
    /// A status line reported something other than a pass.
    Status(String),
    /// The log could not be read.
    LogUnavailable(String),
}

/// The line that decided a failed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCause {
    /// 1-based line number; 0 when the log could not be read.
    pub line_number: usize,
    pub line: String,
    pub reason: FailureReason,
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            FailureReason::Trigger(trigger) => {
                write!(f, "line {} {}: {}", self.line_number, trigger, self.line)
            }
            FailureReason::Status(status) => {
                write!(f, "line {} reports status {}: {}", self.line_number, status, self.line)
            }
            FailureReason::LogUnavailable(msg) => write!(f, "build log unavailable: {msg}"),
        }
    }
}

/// Result of scanning a build log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Overall verdict.
    pub succeeded: bool,
    /// Per-test verdicts in log order, up to the deciding line.
    pub verdicts: Vec<TestVerdict>,
    /// Set when the scan failed.
    pub cause: Option<FailureCause>,
}

impl ExecutionOutcome {
    /// Failed outcome for a log that could not be read.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            verdicts: Vec::new(),
            cause: Some(FailureCause {
                line_number: 0,
                line: String::new(),
                reason: FailureReason::LogUnavailable(msg.into()),
            }),
        }
    }

    /// Overall verdict.
    pub fn verdict(&self) -> Verdict {
        if self.succeeded { Verdict::Pass } else { Verdict::Fail }
    }

    /// Number of passed test executions.
    pub fn passed(&self) -> usize {
        self.verdicts
            .iter()
            .filter(|v| v.verdict == Verdict::Pass)
            .count()
    }

    /// Number of failed test executions.
    pub fn failed(&self) -> usize {
        self.verdicts.len() - self.passed()
    }
}
