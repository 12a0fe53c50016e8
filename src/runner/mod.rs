//! Runner trait and the shell-backed process runner for the iTest runtime.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::core::error::{Error, Result};

pub mod io;
pub mod shell;

pub use io::{CaptureSink, LogSink, Stream, TeeSink};
pub use shell::{BatchShell, PosixShell, Shell, ShellKind};

/// How often the wait loop checks for exit, cancellation and timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to keep draining output after the process has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Runner trait for executing a command line.
pub trait Runner: Send + Sync {
    /// Execute the command line, streaming its output into `sink`.
    ///
    /// A non-zero exit code is not an error. `Err` means the process could not
    /// be started or waited on.
    fn run(&self, command_line: &str, sink: &mut dyn LogSink) -> Result<RunResult>;

    /// Get a human-readable name for this runner.
    fn name(&self) -> &str;
}

/// Result of running a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,

    /// Whether the run was cancelled or the process was killed by a signal.
    pub interrupted: bool,

    /// Whether the run was terminated due to a timeout.
    pub timed_out: bool,
}

impl RunResult {
    /// A process that exited on its own with `exit_code`.
    pub fn exited(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            interrupted: false,
            timed_out: false,
        }
    }

    /// A process that did not run to completion.
    pub fn interrupted() -> Self {
        Self {
            exit_code: None,
            interrupted: true,
            timed_out: false,
        }
    }

    /// Mark the result as timed out.
    pub fn with_timeout(mut self) -> Self {
        self.timed_out = true;
        self
    }

    /// Whether the process ran to completion, regardless of its exit code.
    pub fn completed(&self) -> bool {
        !self.interrupted && !self.timed_out
    }
}

/// Replace backslash separators with forward slashes.
///
/// A backslash directly before a double quote is a quote escape and is kept.
pub fn normalize_separators(command_line: &str) -> String {
    let mut out = String::with_capacity(command_line.len());
    let mut chars = command_line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => out.push(c),
            '\\' => out.push('/'),
            _ => out.push(c),
        }
    }
    out
}

/// Runs command lines through a platform shell script.
pub struct ProcessRunner {
    shell: Box<dyn Shell>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    cancel: Arc<AtomicBool>,
}

impl ProcessRunner {
    /// Create a runner for the given shell family.
    pub fn new(kind: ShellKind) -> Self {
        Self::with_shell(kind.shell())
    }

    /// Create a runner with a custom shell wrapper.
    pub fn with_shell(shell: Box<dyn Shell>) -> Self {
        Self {
            shell,
            working_dir: None,
            timeout: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the script from this directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill the process after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share a cancellation flag; setting it aborts the current run.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Handle that cancels the current run when set to `true`.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn spawn(&self, script: &std::path::Path) -> Result<Child> {
        let mut cmd = self.shell.command(script);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        // Own process group, so a kill also reaches the runtime started by the script.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd.spawn().map_err(|e| {
            Error::runner(format!("failed to launch {}: {}", self.shell.name(), e))
        })
    }

    fn wait(
        &self,
        child: &mut Child,
        rx: &mpsc::Receiver<(Stream, String)>,
        sink: &mut dyn LogSink,
    ) -> Result<RunResult> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut killed: Option<RunResult> = None;

        let status = loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok((stream, line)) => sink.on_line(stream, &line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(POLL_INTERVAL),
            }

            if killed.is_none() {
                if self.cancel.load(Ordering::SeqCst) {
                    log::warn!("run cancelled, terminating {}", self.shell.name());
                    terminate(child);
                    killed = Some(RunResult::interrupted());
                } else if deadline.is_some_and(|d| Instant::now() >= d) {
                    log::warn!("run timed out, terminating {}", self.shell.name());
                    terminate(child);
                    killed = Some(RunResult::interrupted().with_timeout());
                }
            }

            if let Some(status) = child
                .try_wait()
                .map_err(|e| Error::runner(format!("failed to wait for process: {}", e)))?
            {
                break status;
            }
        };

        let drain_until = Instant::now() + DRAIN_GRACE;
        while let Some(left) = drain_until.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(left) {
                Ok((stream, line)) => sink.on_line(stream, &line),
                Err(_) => break,
            }
        }

        Ok(killed.unwrap_or_else(|| result_from_status(status)))
    }
}

impl Runner for ProcessRunner {
    fn run(&self, command_line: &str, sink: &mut dyn LogSink) -> Result<RunResult> {
        let command_line = normalize_separators(command_line);

        let mut script = tempfile::Builder::new()
            .prefix("itest-runner-")
            .suffix(self.shell.script_suffix())
            .tempfile()?;
        script.write_all(self.shell.script_body(&command_line).as_bytes())?;
        script.flush()?;
        let script = script.into_temp_path();

        log::info!("executing: {command_line}");
        sink.on_start(&command_line);

        let mut child = self.spawn(&script)?;
        let (tx, rx) = mpsc::channel();
        let readers = [
            child.stdout.take().map(|out| forward_lines(out, Stream::Stdout, tx.clone())),
            child.stderr.take().map(|err| forward_lines(err, Stream::Stderr, tx.clone())),
        ];
        drop(tx);

        let result = self.wait(&mut child, &rx, sink)?;
        drop(rx);
        drop(readers);

        log::debug!("{} finished: {:?}", self.shell.name(), result);
        sink.on_exit(&result);
        sink.finish()?;
        Ok(result)
    }

    fn name(&self) -> &str {
        self.shell.name()
    }
}

/// Read `pipe` line by line on a background thread and forward each line.
fn forward_lines<R: Read + Send + 'static>(
    pipe: R,
    stream: Stream,
    tx: Sender<(Stream, String)>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("stopped reading {:?}: {}", stream, e);
                    break;
                }
            }
        }
    })
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = child.id() as i32;
        // SAFETY: signals the process group created for this child in `spawn`.
        if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
            return;
        }
    }
    if let Err(e) = child.kill() {
        log::debug!("kill failed: {e}");
    }
}

fn result_from_status(status: ExitStatus) -> RunResult {
    match status.code() {
        Some(code) => RunResult::exited(code),
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                log::warn!("process terminated by signal {:?}", status.signal());
            }
            RunResult::interrupted()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_result_exited() {
        let result = RunResult::exited(3);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.completed());
    }

    #[test]
    fn test_run_result_interrupted() {
        let result = RunResult::interrupted();
        assert_eq!(result.exit_code, None);
        assert!(!result.completed());
        assert!(!result.timed_out);
    }

    #[test]
    fn test_run_result_timeout() {
        let result = RunResult::interrupted().with_timeout();
        assert!(result.timed_out);
        assert!(!result.completed());
    }

    #[test]
    fn test_normalize_separators() {
        assert_eq!(
            normalize_separators(r#"itestrt --test "file:/C:\tests\a.tcml""#),
            r#"itestrt --test "file:/C:/tests/a.tcml""#
        );
    }

    #[test]
    fn test_normalize_keeps_quote_escapes() {
        assert_eq!(
            normalize_separators(r#"itestrt --param "msg=say \"hi\"" --testbed "C:\lab\bed.tbml""#),
            r#"itestrt --param "msg=say \"hi\"" --testbed "C:/lab/bed.tbml""#
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_quoted_values_reach_process_intact() {
        use crate::command::{CommandLine, FLAG_PARAM, FLAG_TESTBED};

        let mut cmd = CommandLine::new("printf '[%s]'");
        cmd.quoted(FLAG_PARAM, "msg=say \"hi there\"")
            .quoted(FLAG_TESTBED, r"C:\lab\bed.tbml");

        let runner = ProcessRunner::new(ShellKind::Posix);
        let mut sink = CaptureSink::new();
        runner.run(&cmd.render(), &mut sink).unwrap();

        assert_eq!(
            sink.lines().collect::<Vec<_>>(),
            [r#"[--param][msg=say "hi there"][--testbed][C:/lab/bed.tbml]"#]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_streams_output() {
        let runner = ProcessRunner::new(ShellKind::Posix);
        let mut sink = CaptureSink::new();
        let result = runner
            .run("echo 'Execution status: Pass'; echo oops 1>&2", &mut sink)
            .unwrap();

        assert_eq!(result, RunResult::exited(0));
        assert_eq!(sink.stream(Stream::Stdout), ["Execution status: Pass"]);
        assert_eq!(sink.stream(Stream::Stderr), ["oops"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let runner = ProcessRunner::new(ShellKind::Posix);
        let mut sink = CaptureSink::new();
        let result = runner.run("exit 7", &mut sink).unwrap();
        assert_eq!(result.exit_code, Some(7));
        assert!(result.completed());
    }

    #[cfg(unix)]
    #[test]
    fn test_backslashes_normalized_before_running() {
        let runner = ProcessRunner::new(ShellKind::Posix);
        let mut sink = CaptureSink::new();
        runner.run(r"echo C:\tests\a.tcml", &mut sink).unwrap();
        assert_eq!(sink.lines().collect::<Vec<_>>(), ["C:/tests/a.tcml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let runner = ProcessRunner::new(ShellKind::Posix).working_dir(dir.path());
        let mut sink = CaptureSink::new();
        runner.run("cat marker.txt", &mut sink).unwrap();
        assert_eq!(sink.lines().collect::<Vec<_>>(), ["here"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let runner = ProcessRunner::new(ShellKind::Posix).timeout(Duration::from_millis(300));
        let mut sink = CaptureSink::new();
        let started = Instant::now();
        let result = runner.run("echo started; sleep 30", &mut sink).unwrap();

        assert!(result.timed_out);
        assert!(!result.completed());
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(sink.lines().collect::<Vec<_>>(), ["started"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_flag_interrupts() {
        let runner = ProcessRunner::new(ShellKind::Posix);
        let cancel = runner.cancel_handle();
        let trigger = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            cancel.store(true, Ordering::SeqCst);
        });

        let mut sink = CaptureSink::new();
        let result = runner.run("sleep 30", &mut sink).unwrap();
        trigger.join().unwrap();

        assert!(result.interrupted);
        assert!(!result.timed_out);
        assert!(!result.completed());
    }

    #[test]
    fn test_spawn_failure_is_error() {
        struct MissingShell;
        impl Shell for MissingShell {
            fn script_suffix(&self) -> &str {
                ".sh"
            }
            fn script_body(&self, command_line: &str) -> String {
                command_line.to_string()
            }
            fn command(&self, script: &std::path::Path) -> std::process::Command {
                let mut cmd = std::process::Command::new("/nonexistent/itest-shell");
                cmd.arg(script);
                cmd
            }
            fn name(&self) -> &str {
                "missing"
            }
        }

        let runner = ProcessRunner::with_shell(Box::new(MissingShell));
        let mut sink = CaptureSink::new();
        let err = runner.run("true", &mut sink).unwrap_err();
        assert!(matches!(err, Error::Runner(_)));
        assert!(err.to_string().contains("failed to launch missing"));
    }
}
