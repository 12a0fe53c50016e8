use itest_runner::command::{CommandBuilder, FLAG_PARAM, FLAG_TEST};
use itest_runner::config::{DatabaseSettings, GlobalSettings, RunRequest};
use itest_runner::runner::{ShellKind, normalize_separators};
use itest_runner::BuildContext;

fn licensed() -> GlobalSettings {
    let mut settings = GlobalSettings::default();
    settings.license_server.host = "licenses.lab".to_string();
    settings
}

#[test]
fn test_single_windows_test_case_without_report() {
    let settings = licensed();
    let request = RunRequest::from_form("C:\\ws", "C:\\tests\\a.tcml", "", "", "", false, "");
    let ctx = BuildContext::new("C:\\ws", "1").shell(ShellKind::Batch);

    let assembled = CommandBuilder::new(&request, &settings, &ctx).assemble();
    let line = normalize_separators(&assembled.render());

    assert!(line.starts_with("itestrt --licenseServer licenses.lab --itar \"C:/ws\""));
    assert!(line.contains("--test \"file:/C:/tests/a.tcml\""));
    assert!(!line.contains("--report"));
    assert!(!line.contains("--trdb.user"));
    assert_eq!(assembled.test_case_names, ["a"]);
}

#[test]
fn test_report_run_with_database_uri() {
    let mut settings = licensed();
    settings.database = Some(DatabaseSettings {
        uri: "jdbc:postgresql://results.lab:5432/itest".to_string(),
        username: "ci".to_string(),
        password: "pw".to_string(),
        ..Default::default()
    });
    let request = RunRequest::from_form(
        "${WORKSPACE}",
        "${WORKSPACE}/suite/smoke.tcml, project://suite/regression.tcml",
        "",
        "dut=10.0.0.5, loops=3",
        "",
        true,
        "nightly",
    );
    let ctx = BuildContext::new("/var/ci/job", "17").shell(ShellKind::Posix);

    let assembled = CommandBuilder::new(&request, &settings, &ctx).assemble();
    let cmd = &assembled.command_line;
    let line = assembled.render();

    assert_eq!(
        cmd.values_of(FLAG_TEST).collect::<Vec<_>>(),
        ["file:/var/ci/job/suite/smoke.tcml", "project://suite/regression.tcml"]
    );
    assert_eq!(cmd.values_of(FLAG_PARAM).count(), 2);
    assert!(line.contains("--report file:/var/ci/job/itest_reports_17/{tcfilename}.html"));
    assert!(line.contains("--trdb.user ci --trdb.password pw --tag nightly --host licenses.lab"));
    assert!(line.ends_with("--uri jdbc:postgresql://results.lab:5432/itest"));
    for flag in ["--catalog", "--dbtype", "--ipaddr", "--trdb.port"] {
        assert!(!cmd.contains(flag), "unexpected {flag}");
    }
    assert_eq!(assembled.test_case_names, ["smoke", "regression"]);
}

#[test]
fn test_spaces_are_escaped_per_shell() {
    let settings = licensed();
    let request = RunRequest::from_form(
        "${WORKSPACE}",
        "${WORKSPACE}/my tests/a b.tcml",
        "${WORKSPACE}/beds/lab bed.tbml",
        "",
        "",
        false,
        "",
    );

    let posix = BuildContext::new("/ci/my job", "1").shell(ShellKind::Posix);
    let line = CommandBuilder::new(&request, &settings, &posix).assemble().render();
    assert!(line.contains("--test \"file:/ci/my%20job/my%20tests/a%20b.tcml\""));
    assert!(line.contains("--testbed \"/ci/my%20job/beds/lab%20bed.tbml\""));

    let batch = BuildContext::new("/ci/my job", "1").shell(ShellKind::Batch);
    let line = CommandBuilder::new(&request, &settings, &batch).assemble().render();
    assert!(line.contains("--test \"file:/ci/my%%20job/my%%20tests/a%%20b.tcml\""));
}

#[test]
fn test_no_test_cases() {
    let request = RunRequest::from_form("/ws", " , ", "", "", "", false, "");
    let ctx = BuildContext::new("/ws", "1").shell(ShellKind::Posix);
    let assembled = CommandBuilder::new(&request, &licensed(), &ctx).assemble();
    assert!(!assembled.command_line.contains(FLAG_TEST));
    assert!(assembled.test_case_names.is_empty());
}
