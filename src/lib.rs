//! itest-runner: a build-step adapter for the Spirent iTest runtime.
//!
//! This library turns a job's test run request into an `itestrt` command line,
//! runs it through the host shell while streaming its output into the build log,
//! publishes the per-test HTML reports and derives a pass/fail verdict from the
//! runtime's console output.
//!
//! # Quick Start
//!
//! ## Using the Builder API
//!
//! ```no_run
//! use itest_runner::{builder, BuildContext, RunRequest};
//!
//! # fn main() -> itest_runner::Result<()> {
//! let request = RunRequest::from_form(
//!     "${WORKSPACE}/itest",
//!     "${WORKSPACE}/itest/smoke.tcml, ${WORKSPACE}/itest/regression.tcml",
//!     "",
//!     "dut=10.0.0.5",
//!     "",
//!     true,
//!     "nightly",
//! );
//!
//! let outcome = builder()
//!     .from_settings_file("itest-runner.toml")?
//!     .request(request)
//!     .context(BuildContext::new("/var/ci/job", "42"))
//!     .run()?;
//!
//! std::process::exit(if outcome.succeeded() { 0 } else { 1 });
//! # }
//! ```
//!
//! ## Settings file
//!
//! ```toml
//! [runner]
//! path = "/opt/itest/bin/itestrt"
//! timeout = 3600
//!
//! [license-server]
//! host = "licenses.lab"
//! port = "27000"
//!
//! [database]
//! uri = "jdbc:postgresql://results.lab:5432/itest"
//! username = "ci"
//! password = "secret"
//! ```
//!
//! Every setting can be overridden with an `ITEST_RUNNER_*` environment variable,
//! see [`config::env`].
//!
//! ## Job file
//!
//! ```toml
//! workspace = "${WORKSPACE}/itest"
//! testcases = ["${WORKSPACE}/itest/smoke.tcml"]
//! params = ["dut=10.0.0.5"]
//! report = true
//! tag = "nightly"
//! ```
//!
//! # Architecture
//!
//! A run flows through `CommandBuilder → Runner → ReportPublisher → LogAnalyzer`.
//! The seams are traits:
//!
//! - [`Runner`](runner::Runner): Executes a command line and streams its output
//! - [`LogSink`](runner::LogSink): Receives the output line by line
//! - [`Shell`](runner::Shell): Wraps the command line in a shell script
//! - [`ReportPublisher`](report::ReportPublisher): Publishes the generated reports
//!
//! # Custom Publisher Example
//!
//! ```no_run
//! use itest_runner::report::{ReportDescriptor, ReportPublisher};
//! use itest_runner::Result;
//!
//! struct PrintPublisher;
//!
//! impl ReportPublisher for PrintPublisher {
//!     fn publish(&self, reports: &[ReportDescriptor]) -> Result<()> {
//!         for report in reports {
//!             println!("{}: {}", report.title, report.path().display());
//!         }
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "print"
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Enables `cli`
//! - `cli` - The `itest-runner` command line front-end

pub mod command;
pub mod config;
pub mod core;
pub mod harness;
pub mod report;
pub mod runner;
pub mod util;

// Re-export commonly used types
pub use crate::core::{BuildContext, Error, Result, StepOutcome, TestStep, TestStepBuilder};
pub use config::{DatabaseSettings, DatabaseType, GlobalSettings, RunRequest};
pub use harness::{ExecutionOutcome, LogAnalyzer, Verdict};

/// Create a new test step builder.
///
/// This is the main entry point for the fluent API.
///
/// # Example
///
/// ```no_run
/// use itest_runner::{builder, BuildContext, GlobalSettings, RunRequest};
///
/// # fn main() -> itest_runner::Result<()> {
/// let step = builder()
///     .with_settings(GlobalSettings::default())
///     .from_job_file("job.toml")?
///     .context(BuildContext::new(".", "1"))
///     .build()?;
/// println!("{}", step.command().render());
/// # Ok(())
/// # }
/// ```
pub fn builder() -> TestStepBuilder {
    TestStepBuilder::new()
}
