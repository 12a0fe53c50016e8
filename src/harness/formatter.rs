//! Terminal output formatting for analyzed runs.

use std::fmt::Write;

use super::{ExecutionOutcome, Verdict};
use crate::runner::RunResult;

/// Formats and prints run results to the terminal.
#[derive(Debug)]
pub struct ResultFormatter {
    show_cause: bool,
}

impl ResultFormatter {
    /// Create a new formatter.
    pub fn new() -> Self {
        Self { show_cause: true }
    }

    /// Do not print the line that failed the run.
    pub fn hide_cause(mut self) -> Self {
        self.show_cause = false;
        self
    }

    /// Print the full report: per-test verdicts, failure cause and summary.
    pub fn report(&self, outcome: &ExecutionOutcome, run: Option<&RunResult>) {
        print!("{}", self.render(outcome, run));
    }

    /// The report as text.
    pub fn render(&self, outcome: &ExecutionOutcome, run: Option<&RunResult>) -> String {
        let mut out = String::new();

        for case in &outcome.verdicts {
            let marker = match case.verdict {
                Verdict::Pass => "PASS",
                Verdict::Fail => "FAIL",
            };
            let _ = writeln!(out, "[{marker}] {} ({})", case.name, case.status);
        }

        if self.show_cause {
            if let Some(ref cause) = outcome.cause {
                let _ = writeln!(out, "\nfailed at {cause}");
            }
        }

        let status = if outcome.succeeded { "ok" } else { "FAILED" };
        let _ = write!(
            out,
            "\ntest result: {status}. {} passed, {} failed",
            outcome.passed(),
            outcome.failed()
        );

        if let Some(run) = run {
            if run.timed_out {
                out.push_str(" (timed out)");
            } else if run.interrupted {
                out.push_str(" (interrupted)");
            } else if let Some(code) = run.exit_code {
                let _ = write!(out, " (exit code {code})");
            }
        }

        out.push('\n');
        out
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::LogAnalyzer;

    #[test]
    fn test_render_success() {
        let outcome = LogAnalyzer::verdict()
            .unwrap()
            .test_names(vec!["smoke".to_string()])
            .scan(["Execution status: Pass"]);
        let text = ResultFormatter::new().render(&outcome, Some(&RunResult::exited(0)));
        assert_eq!(
            text,
            "[PASS] smoke (Pass)\n\ntest result: ok. 1 passed, 0 failed (exit code 0)\n"
        );
    }

    #[test]
    fn test_render_failure_with_cause() {
        let outcome = LogAnalyzer::verdict()
            .unwrap()
            .scan(["Execution status: Pass", "Error: disk full"]);
        let text = ResultFormatter::new().render(&outcome, None);
        assert!(text.contains("[PASS] test #1 (Pass)"));
        assert!(text.contains("failed at line 2 starts with \"Error\": Error: disk full"));
        assert!(text.ends_with("test result: FAILED. 1 passed, 0 failed\n"));
    }

    #[test]
    fn test_render_hides_cause() {
        let outcome = LogAnalyzer::verdict().unwrap().scan(["Error"]);
        let text = ResultFormatter::new().hide_cause().render(&outcome, None);
        assert!(!text.contains("failed at"));
    }

    #[test]
    fn test_render_timeout() {
        let outcome = ExecutionOutcome::unavailable("missing");
        let run = RunResult::interrupted().with_timeout();
        let text = ResultFormatter::new().render(&outcome, Some(&run));
        assert!(text.ends_with("(timed out)\n"));
    }
}
