//! Output sinks that receive the runtime's console output line by line.
//!
//! # Built-in Sinks
//!
//! - [`TeeSink`] - echoes to the terminal AND appends to the build log file
//! - [`CaptureSink`] - keeps every line in memory for inspection

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::RunResult;
use crate::core::error::{Error, Result};

/// Which pipe a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Receives process output as it is produced.
pub trait LogSink: Send {
    /// Called before the process starts with the normalized command line.
    fn on_start(&mut self, command_line: &str) {
        let _ = command_line;
    }

    /// Called for every output line, without its line terminator.
    fn on_line(&mut self, stream: Stream, line: &str);

    /// Called once the process has exited.
    fn on_exit(&mut self, result: &RunResult) {
        let _ = result;
    }

    /// Flush buffered output and report the first write failure, if any.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps all lines in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: Vec<(Stream, String)>,
}

impl CaptureSink {
    /// Create a new capture sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines, both streams interleaved in arrival order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|(_, line)| line.as_str())
    }

    /// Captured lines from one stream.
    pub fn stream(&self, stream: Stream) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line.as_str())
            .collect()
    }
}

impl LogSink for CaptureSink {
    fn on_line(&mut self, stream: Stream, line: &str) {
        self.lines.push((stream, line.to_string()));
    }
}

/// Sink that echoes output to the terminal and appends it to the build log.
pub struct TeeSink {
    path: PathBuf,
    log: BufWriter<File>,
    echo: bool,
    error: Option<std::io::Error>,
}

impl TeeSink {
    /// Open (or create) the build log at `path` for appending.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                crate::util::ensure_dir_exists(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::log(format!("cannot open {}: {}", path.display(), e)))?;
        Ok(Self {
            path: path.to_path_buf(),
            log: BufWriter::new(file),
            echo: true,
            error: None,
        })
    }

    /// Only write to the build log, without echoing to the terminal.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }
}

impl LogSink for TeeSink {
    fn on_line(&mut self, stream: Stream, line: &str) {
        if self.echo {
            match stream {
                Stream::Stdout => println!("{line}"),
                Stream::Stderr => eprintln!("{line}"),
            }
        }
        if self.error.is_none() {
            if let Err(e) = writeln!(self.log, "{line}") {
                log::warn!("failed to write build log {}: {}", self.path.display(), e);
                self.error = Some(e);
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(e) = self.error.take() {
            return Err(Error::log(format!("{}: {}", self.path.display(), e)));
        }
        self.log
            .flush()
            .map_err(|e| Error::log(format!("{}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink_keeps_order() {
        let mut sink = CaptureSink::new();
        sink.on_line(Stream::Stdout, "one");
        sink.on_line(Stream::Stderr, "two");
        sink.on_line(Stream::Stdout, "three");

        assert_eq!(sink.lines().collect::<Vec<_>>(), ["one", "two", "three"]);
        assert_eq!(sink.stream(Stream::Stdout), ["one", "three"]);
        assert_eq!(sink.stream(Stream::Stderr), ["two"]);
    }

    #[test]
    fn test_tee_sink_appends_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/build.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "earlier output\n").unwrap();

        let mut sink = TeeSink::new(&path).unwrap().quiet();
        sink.on_line(Stream::Stdout, "Execution status: Pass");
        sink.on_line(Stream::Stderr, "warning");
        sink.finish().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier output\nExecution status: Pass\nwarning\n"
        );
    }

    #[test]
    fn test_tee_sink_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/build.log");

        let mut sink = TeeSink::new(&path).unwrap().quiet();
        sink.on_line(Stream::Stdout, "hello");
        sink.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
