use crate::runner::ShellKind;
use std::path::{Path, PathBuf};

/// Prefix of the per-build report directory created under the workspace.
pub const REPORT_DIR_PREFIX: &str = "itest_reports_";

/// Prefix of the per-build log file used when none is given.
pub const LOG_FILE_PREFIX: &str = "itest-build-";

/// What the host build provides to a test step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Job workspace directory.
    pub workspace: PathBuf,

    /// Identifier unique to this build.
    pub build_id: String,

    /// Console log of the build; the runtime's output is appended here.
    pub log_path: PathBuf,

    /// Shell family used to run commands.
    pub shell: ShellKind,
}

impl BuildContext {
    /// Create a context for `workspace` and `build_id`.
    ///
    /// The log defaults to `<workspace>/itest-build-<build id>.log` and the shell
    /// to the host's. Steps of the same build share the log, other builds never do.
    pub fn new(workspace: impl Into<PathBuf>, build_id: impl Into<String>) -> Self {
        let workspace = workspace.into();
        let build_id = build_id.into();
        let log_path = workspace.join(format!("{LOG_FILE_PREFIX}{build_id}.log"));
        Self {
            workspace,
            build_id,
            log_path,
            shell: ShellKind::host(),
        }
    }

    /// Set the build log path.
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Set the shell family.
    pub fn shell(mut self, shell: ShellKind) -> Self {
        self.shell = shell;
        self
    }

    /// Workspace directory as a string.
    pub fn workspace_str(&self) -> String {
        self.workspace.display().to_string()
    }

    /// Name of the per-build report directory.
    pub fn report_dir_name(&self) -> String {
        format!("{REPORT_DIR_PREFIX}{}", self.build_id)
    }

    /// Absolute path of the per-build report directory.
    pub fn report_dir(&self) -> PathBuf {
        self.workspace.join(self.report_dir_name())
    }

    /// The build log.
    pub fn log_file(&self) -> &Path {
        &self.log_path
    }
}
