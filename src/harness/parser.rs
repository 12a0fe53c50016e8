//! Single-pass log analyzer driven by a [`RuleSet`].

use regex::Regex;
use std::io::BufRead;
use std::path::Path;

use super::rules::RuleSet;
use super::{ExecutionOutcome, FailureCause, FailureReason, TestVerdict, Verdict};
use crate::core::error::Result;

/// Scans console output and decides pass or fail.
pub struct LogAnalyzer {
    rules: RuleSet,
    status_regex: Option<Regex>,
    test_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    Decided(Verdict),
}

impl LogAnalyzer {
    /// Create an analyzer for a rule set.
    pub fn new(rules: RuleSet) -> Result<Self> {
        let status_regex = match rules.status_pattern {
            Some(ref pattern) => Some(Regex::new(pattern)?),
            None => None,
        };
        Ok(Self {
            rules,
            status_regex,
            test_names: Vec::new(),
        })
    }

    /// Analyzer for the pass/fail verdict of a test run.
    pub fn verdict() -> Result<Self> {
        Self::new(RuleSet::verdict())
    }

    /// Analyzer for the hard-failure check.
    pub fn validity() -> Result<Self> {
        Self::new(RuleSet::validity())
    }

    /// Names for the status lines, in the order the tests were run.
    pub fn test_names(mut self, names: Vec<String>) -> Self {
        self.test_names = names;
        self
    }

    /// Scan log lines in order.
    pub fn scan<I, S>(&self, lines: I) -> ExecutionOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut scan = Scan::new(self);
        for line in lines {
            if scan.feed(line.as_ref()) {
                break;
            }
        }
        scan.finish()
    }

    /// Scan a reader line by line. Invalid UTF-8 is replaced, a read error fails.
    pub fn scan_reader<R: BufRead>(&self, mut reader: R) -> ExecutionOutcome {
        let mut scan = Scan::new(self);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    if scan.feed(line.trim_end_matches(['\n', '\r'])) {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("failed reading build log: {e}");
                    return ExecutionOutcome::unavailable(e.to_string());
                }
            }
        }
        scan.finish()
    }

    /// Scan a log file. A missing or unreadable file fails.
    pub fn scan_file(&self, path: &Path) -> ExecutionOutcome {
        match std::fs::File::open(path) {
            Ok(file) => self.scan_reader(std::io::BufReader::new(file)),
            Err(e) => {
                log::error!("cannot open build log {}: {}", path.display(), e);
                ExecutionOutcome::unavailable(format!("{}: {}", path.display(), e))
            }
        }
    }
}

/// One in-progress scan.
struct Scan<'a> {
    analyzer: &'a LogAnalyzer,
    state: State,
    line_number: usize,
    verdicts: Vec<TestVerdict>,
    cause: Option<FailureCause>,
}

impl<'a> Scan<'a> {
    fn new(analyzer: &'a LogAnalyzer) -> Self {
        Self {
            analyzer,
            state: State::Scanning,
            line_number: 0,
            verdicts: Vec::new(),
            cause: None,
        }
    }

    /// Feed one line; returns `true` once the outcome is decided.
    fn feed(&mut self, raw: &str) -> bool {
        if self.state != State::Scanning {
            return true;
        }
        self.line_number += 1;

        let analyzer = self.analyzer;
        let rules = &analyzer.rules;
        let line = if rules.trim_lines { raw.trim() } else { raw };

        if let Some(trigger) = rules.fired_by(line) {
            self.fail(line, FailureReason::Trigger(trigger.to_string()));
            return true;
        }

        let status = analyzer
            .status_regex
            .as_ref()
            .and_then(|re| re.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        if let Some(status) = status {
            let passed = status.eq_ignore_ascii_case(&rules.pass_word);
            let verdict = if passed { Verdict::Pass } else { Verdict::Fail };
            let name = analyzer
                .test_names
                .get(self.verdicts.len())
                .cloned()
                .unwrap_or_else(|| format!("test #{}", self.verdicts.len() + 1));
            log::debug!("{name}: {status}");
            self.verdicts.push(TestVerdict {
                name,
                status: status.clone(),
                verdict,
            });
            if !passed {
                self.fail(line, FailureReason::Status(status));
                return true;
            }
        }
        false
    }

    fn fail(&mut self, line: &str, reason: FailureReason) {
        self.cause = Some(FailureCause {
            line_number: self.line_number,
            line: line.to_string(),
            reason,
        });
        self.state = State::Decided(Verdict::Fail);
    }

    fn finish(mut self) -> ExecutionOutcome {
        if self.state == State::Scanning {
            self.state = State::Decided(Verdict::Pass);
        }
        ExecutionOutcome {
            succeeded: self.state == State::Decided(Verdict::Pass),
            verdicts: self.verdicts,
            cause: self.cause,
        }
    }
}
