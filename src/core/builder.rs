use crate::command::{AssembledCommand, CommandBuilder};
use crate::config::{GlobalSettings, RunRequest, SettingsLoader};
use crate::core::context::BuildContext;
use crate::core::error::{Error, Result};
use crate::harness::{ExecutionOutcome, LogAnalyzer};
use crate::report::{self, ManifestPublisher, ReportDescriptor, ReportPublisher};
use crate::runner::{LogSink, ProcessRunner, RunResult, Runner, TeeSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Builder for creating and running an iTest build step.
pub struct TestStepBuilder {
    settings: Option<GlobalSettings>,
    request: Option<RunRequest>,
    context: Option<BuildContext>,
    runner: Option<Box<dyn Runner>>,
    publisher: Option<Box<dyn ReportPublisher>>,
    cancel: Option<Arc<AtomicBool>>,
    echo: bool,
}

impl TestStepBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            settings: None,
            request: None,
            context: None,
            runner: None,
            publisher: None,
            cancel: None,
            echo: true,
        }
    }

    /// Set the global settings directly.
    pub fn with_settings(mut self, settings: GlobalSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Load global settings from a TOML file plus environment overrides.
    pub fn from_settings_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.settings = Some(SettingsLoader::new().config_file(path).load()?);
        Ok(self)
    }

    /// Set the run request.
    pub fn request(mut self, request: RunRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Load the run request from a TOML job file.
    pub fn from_job_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path: PathBuf = path.into();
        self.request = Some(RunRequest::from_toml_file(&path)?);
        Ok(self)
    }

    /// Set the host build context.
    pub fn context(mut self, context: BuildContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Set a custom runner implementation.
    pub fn runner<R: Runner + 'static>(mut self, runner: R) -> Self {
        self.runner = Some(Box::new(runner));
        self
    }

    /// Set a custom report publisher.
    pub fn publisher<P: ReportPublisher + 'static>(mut self, publisher: P) -> Self {
        self.publisher = Some(Box::new(publisher));
        self
    }

    /// Share a cancellation flag with the default process runner.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Write runtime output to the build log only.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    // --- Build and Execute ---

    /// Build the test step.
    pub fn build(self) -> Result<TestStep> {
        let settings = self
            .settings
            .ok_or_else(|| Error::config("no settings provided (call with_settings or from_settings_file)"))?;

        let request = self
            .request
            .ok_or_else(|| Error::config("no run request provided (call request or from_job_file)"))?;

        let context = self
            .context
            .ok_or_else(|| Error::config("build context not set (call context)"))?;

        let runner = match self.runner {
            Some(runner) => runner,
            None => Box::new(default_runner(&settings, &context, self.cancel)),
        };

        let publisher = self
            .publisher
            .unwrap_or_else(|| Box::new(ManifestPublisher::new()));

        Ok(TestStep {
            settings,
            request,
            context,
            runner,
            publisher,
            echo: self.echo,
        })
    }

    /// Build and immediately run.
    pub fn run(self) -> Result<StepOutcome> {
        let step = self.build()?;
        step.run()
    }
}

impl Default for TestStepBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_runner(
    settings: &GlobalSettings,
    context: &BuildContext,
    cancel: Option<Arc<AtomicBool>>,
) -> ProcessRunner {
    let mut runner = ProcessRunner::new(context.shell);
    if context.workspace.is_dir() {
        runner = runner.working_dir(&context.workspace);
    }
    if let Some(secs) = settings.runner.timeout {
        runner = runner.timeout(Duration::from_secs(secs));
    }
    if let Some(flag) = cancel {
        runner = runner.cancel_flag(flag);
    }
    runner
}

/// Stage of a test step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InitializeReports,
    Execute,
    PublishReports,
    Analyze,
}

/// Result of a completed test step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The command that was run.
    pub command: AssembledCommand,
    /// How the runtime process ended.
    pub run: RunResult,
    /// Reports handed to the publisher.
    pub reports: Vec<ReportDescriptor>,
    /// Verdict scan of the build log.
    pub analysis: ExecutionOutcome,
}

impl StepOutcome {
    /// Whether the build step passed.
    pub fn succeeded(&self) -> bool {
        self.analysis.succeeded
    }
}

/// One configured iTest build step.
///
/// `run` sequences: create the report directory, run the runtime, publish the
/// reports, scan the build log. The first failing stage ends the step.
pub struct TestStep {
    settings: GlobalSettings,
    request: RunRequest,
    context: BuildContext,
    runner: Box<dyn Runner>,
    publisher: Box<dyn ReportPublisher>,
    echo: bool,
}

impl TestStep {
    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// The command line `run` would execute.
    pub fn command(&self) -> AssembledCommand {
        CommandBuilder::new(&self.request, &self.settings, &self.context).assemble()
    }

    /// Run the step.
    ///
    /// `Err` means a stage failed before the verdict could be taken; `Ok` carries
    /// the verdict, which may still be a failure.
    pub fn run(&self) -> Result<StepOutcome> {
        if self.request.report {
            self.initialize_reports()
                .map_err(|e| stage_error(Stage::InitializeReports, e))?;
        }

        let command = self.command();
        let run = self
            .execute(&command.render())
            .map_err(|e| stage_error(Stage::Execute, e))?;

        let mut reports = Vec::new();
        if self.request.report {
            reports = report::descriptors(&command.test_case_names, &self.context.report_dir());
            self.publisher
                .publish(&reports)
                .map_err(|e| stage_error(Stage::PublishReports, e))?;
        }

        let analysis = LogAnalyzer::verdict()
            .map_err(|e| stage_error(Stage::Analyze, e))?
            .test_names(command.test_case_names.clone())
            .scan_file(self.context.log_file());

        if analysis.succeeded {
            log::info!("iTest run passed");
        } else if let Some(ref cause) = analysis.cause {
            log::error!("iTest run failed: {cause}");
        }

        Ok(StepOutcome {
            command,
            run,
            reports,
            analysis,
        })
    }

    /// Export the workspace projects as an iTAR archive and check the log for errors.
    pub fn export_itar(&self) -> Result<ExecutionOutcome> {
        let command = CommandBuilder::new(&self.request, &self.settings, &self.context).export_itar();
        self.execute(&command.render())?;
        Ok(LogAnalyzer::validity()?.scan_file(self.context.log_file()))
    }

    fn initialize_reports(&self) -> Result<()> {
        let dir = self.context.report_dir();
        crate::util::ensure_dir_exists(&dir).map_err(|e| {
            Error::report(format!("cannot create report directory {}: {}", dir.display(), e))
        })?;
        log::debug!("report directory ready: {}", dir.display());
        Ok(())
    }

    fn execute(&self, command_line: &str) -> Result<RunResult> {
        let mut sink = TeeSink::new(self.context.log_file())?;
        if !self.echo {
            sink = sink.quiet();
        }

        let result = self.runner.run(command_line, &mut sink as &mut dyn LogSink)?;
        if result.timed_out {
            return Err(Error::interrupted(format!(
                "{} timed out",
                self.runner.name()
            )));
        }
        if result.interrupted {
            return Err(Error::interrupted(format!(
                "{} did not run to completion",
                self.runner.name()
            )));
        }
        if let Some(code) = result.exit_code.filter(|c| *c != 0) {
            log::info!("runtime exited with code {code}");
        }
        Ok(result)
    }
}

fn stage_error(stage: Stage, err: Error) -> Error {
    log::error!("{stage:?} failed: {err}");
    err
}
