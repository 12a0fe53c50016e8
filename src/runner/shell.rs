//! Shell wrappers that turn a command line into a script invocation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Which interpreter family runs the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    /// POSIX `sh` script.
    Posix,
    /// Windows batch file run through `cmd`.
    Batch,
}

serde_plain::derive_display_from_serialize!(ShellKind);
serde_plain::derive_fromstr_from_deserialize!(ShellKind);

impl ShellKind {
    /// The shell family of the machine we are running on.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            ShellKind::Batch
        } else {
            ShellKind::Posix
        }
    }

    /// Replacement for a literal space inside a path argument.
    ///
    /// Batch files expand `%`, so the percent sign is doubled there.
    pub fn space_escape(self) -> &'static str {
        match self {
            ShellKind::Posix => "%20",
            ShellKind::Batch => "%%20",
        }
    }

    /// The wrapper implementing this shell family.
    pub fn shell(self) -> Box<dyn Shell> {
        match self {
            ShellKind::Posix => Box::new(PosixShell),
            ShellKind::Batch => Box::new(BatchShell),
        }
    }
}

impl Default for ShellKind {
    fn default() -> Self {
        Self::host()
    }
}

/// Renders a command line into a script and the process that executes it.
pub trait Shell: Send + Sync {
    /// Script file extension, including the dot.
    fn script_suffix(&self) -> &str;

    /// Script contents for the command line.
    fn script_body(&self, command_line: &str) -> String;

    /// Process that runs the script at `script`.
    fn command(&self, script: &Path) -> Command;

    /// Get a human-readable name for this shell.
    fn name(&self) -> &str;
}

/// `sh` script wrapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixShell;

impl Shell for PosixShell {
    fn script_suffix(&self) -> &str {
        ".sh"
    }

    fn script_body(&self, command_line: &str) -> String {
        format!("#!/bin/sh\n{command_line}\n")
    }

    fn command(&self, script: &Path) -> Command {
        // No -x: the trace would echo flag values into the build log.
        let mut cmd = Command::new("sh");
        cmd.arg("-e").arg(script);
        cmd
    }

    fn name(&self) -> &str {
        "sh"
    }
}

/// `cmd` batch file wrapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchShell;

impl Shell for BatchShell {
    fn script_suffix(&self) -> &str {
        ".bat"
    }

    fn script_body(&self, command_line: &str) -> String {
        format!("@echo off\r\n{command_line}\r\nexit /b %ERRORLEVEL%\r\n")
    }

    fn command(&self, script: &Path) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.arg("/c").arg("call").arg(script);
        cmd
    }

    fn name(&self) -> &str {
        "cmd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_escape_per_shell() {
        assert_eq!(ShellKind::Posix.space_escape(), "%20");
        assert_eq!(ShellKind::Batch.space_escape(), "%%20");
    }

    #[test]
    fn test_shell_kind_parse() {
        assert_eq!("posix".parse::<ShellKind>().unwrap(), ShellKind::Posix);
        assert_eq!("batch".parse::<ShellKind>().unwrap(), ShellKind::Batch);
        assert!("powershell".parse::<ShellKind>().is_err());
        assert_eq!(ShellKind::Batch.to_string(), "batch");
    }

    #[test]
    fn test_host_shell() {
        let expected = if cfg!(target_os = "windows") {
            ShellKind::Batch
        } else {
            ShellKind::Posix
        };
        assert_eq!(ShellKind::host(), expected);
    }

    #[test]
    fn test_posix_script() {
        let shell = ShellKind::Posix.shell();
        assert_eq!(shell.script_suffix(), ".sh");
        assert_eq!(
            shell.script_body("itestrt --test \"file:/a.tcml\""),
            "#!/bin/sh\nitestrt --test \"file:/a.tcml\"\n"
        );
        let cmd = shell.command(Path::new("/tmp/run.sh"));
        assert_eq!(cmd.get_program(), "sh");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["-e", "/tmp/run.sh"]);
    }

    #[test]
    fn test_batch_script() {
        let shell = ShellKind::Batch.shell();
        assert_eq!(shell.script_suffix(), ".bat");
        let body = shell.script_body("itestrt --itar \"C:/ws\"");
        assert!(body.starts_with("@echo off\r\n"));
        assert!(body.contains("itestrt --itar \"C:/ws\"\r\n"));
        let cmd = shell.command(Path::new("run.bat"));
        assert_eq!(cmd.get_program(), "cmd");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["/c", "call", "run.bat"]);
    }
}
