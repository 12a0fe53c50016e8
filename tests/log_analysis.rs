use itest_runner::harness::{FailureReason, LogAnalyzer, ResultFormatter, RuleSet, Trigger, Verdict};

#[test]
fn test_status_lines_are_case_insensitive() {
    let outcome = LogAnalyzer::verdict()
        .unwrap()
        .test_names(vec!["smoke".to_string(), "regression".to_string()])
        .scan(["Starting...", "Execution status: Pass", "Execution status: pass"]);

    assert!(outcome.succeeded);
    assert_eq!(outcome.passed(), 2);
    assert_eq!(outcome.verdicts[1].name, "regression");
    assert_eq!(outcome.verdicts[1].status, "pass");
}

#[test]
fn test_later_error_overrides_pass() {
    let outcome = LogAnalyzer::verdict()
        .unwrap()
        .scan(["Execution status: Pass", "Error: disk full"]);

    assert!(!outcome.succeeded);
    let cause = outcome.cause.unwrap();
    assert_eq!(cause.line_number, 2);
    assert_eq!(cause.reason, FailureReason::Trigger("starts with \"Error\"".to_string()));
}

#[test]
fn test_indented_error_fails_verdict() {
    let outcome = LogAnalyzer::verdict().unwrap().scan(["   Error: license expired"]);
    assert_eq!(outcome.verdict(), Verdict::Fail);
}

#[test]
fn test_embedded_error_word() {
    let lines = ["Retrying after Error 42", "Execution status: Pass"];

    let verdict = LogAnalyzer::verdict().unwrap().scan(lines);
    assert!(verdict.succeeded);

    let validity = LogAnalyzer::validity().unwrap().scan(lines);
    assert!(!validity.succeeded);
}

#[test]
fn test_missing_path_message_fails() {
    let outcome = LogAnalyzer::verdict()
        .unwrap()
        .scan(["The system cannot find the path specified."]);
    assert!(!outcome.succeeded);
    assert!(outcome.verdicts.is_empty());
}

#[test]
fn test_log_without_status_lines_passes() {
    let outcome = LogAnalyzer::verdict().unwrap().scan(["Starting...", "Done."]);
    assert!(outcome.succeeded);
    assert!(outcome.verdicts.is_empty());
}

#[test]
fn test_failed_status_stops_scan() {
    let outcome = LogAnalyzer::verdict().unwrap().scan([
        "Execution status: Pass",
        "Execution status: Aborted",
        "Execution status: Pass",
    ]);
    assert!(!outcome.succeeded);
    assert_eq!(outcome.verdicts.len(), 2);
    assert_eq!(
        outcome.cause.unwrap().reason,
        FailureReason::Status("Aborted".to_string())
    );
}

#[test]
fn test_scan_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = LogAnalyzer::verdict()
        .unwrap()
        .scan_file(&dir.path().join("absent.log"));
    assert!(!outcome.succeeded);
    assert!(matches!(
        outcome.cause.unwrap().reason,
        FailureReason::LogUnavailable(_)
    ));
}

#[test]
fn test_scan_file_with_crlf_and_invalid_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("build.log");
    std::fs::write(&log, b"Starting \xff\r\nExecution status: Pass\r\n").unwrap();

    let outcome = LogAnalyzer::verdict().unwrap().scan_file(&log);
    assert!(outcome.succeeded);
    assert_eq!(outcome.verdicts[0].status, "Pass");
}

#[test]
fn test_custom_rule_set() {
    let rules = RuleSet::new()
        .trigger(Trigger::contains("FATAL"))
        .status_pattern(r"Result=(\w+)");
    let analyzer = LogAnalyzer::new(rules).unwrap();

    assert!(analyzer.scan(["Result=PASS"]).succeeded);
    assert!(!analyzer.scan(["x FATAL y"]).succeeded);
}

#[test]
fn test_invalid_status_pattern() {
    let rules = RuleSet::new().status_pattern("(unclosed");
    assert!(matches!(
        LogAnalyzer::new(rules),
        Err(itest_runner::Error::Pattern(_))
    ));
}

#[test]
fn test_formatter_summary() {
    let outcome = LogAnalyzer::verdict()
        .unwrap()
        .test_names(vec!["smoke".to_string()])
        .scan(["Execution status: Pass"]);
    let text = ResultFormatter::new().render(&outcome, None);
    assert!(text.contains("[PASS] smoke (Pass)"));
    assert!(text.contains("test result: ok. 1 passed, 0 failed"));
}
