//! Destination for child process output.
//!
//! Children never inherit the supervisor's own descriptors: their stdout and
//! stderr go either to a shared append-only log file or to `/dev/null`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Local;

/// Where stdout/stderr of supervised commands end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// Discard all output.
    Discard,
    /// Append to a file, optionally preceded by a timestamped marker line.
    File { path: PathBuf, timestamp: bool },
}

impl OutputSink {
    pub fn from_path(path: Option<&Path>, timestamp: bool) -> Self {
        match path {
            Some(path) => OutputSink::File {
                path: path.to_path_buf(),
                timestamp,
            },
            None => OutputSink::Discard,
        }
    }

    /// Open the sink for one command, returning handles for stdout and stderr.
    ///
    /// `label` and `command_line` are written into the marker line.
    pub fn open(&self, label: &str, command_line: &str) -> io::Result<(Stdio, Stdio)> {
        match self {
            OutputSink::Discard => Ok((Stdio::null(), Stdio::null())),
            OutputSink::File { path, timestamp } => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                if *timestamp {
                    write_marker(&mut file, label, command_line)?;
                }
                let stderr = file.try_clone()?;
                Ok((Stdio::from(file), Stdio::from(stderr)))
            }
        }
    }
}

fn write_marker(file: &mut File, label: &str, command_line: &str) -> io::Result<()> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "==== {} [{}] {}", now, label, command_line)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_writes_marker_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.log");
        let sink = OutputSink::from_path(Some(&path), true);

        sink.open("sync", "rsync -a a/ b/").unwrap();
        sink.open("write-probe", "sh -c true").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("==== "));
        assert!(lines[0].ends_with("[sync] rsync -a a/ b/"));
        assert!(lines[1].contains("[write-probe]"));
    }

    #[test]
    fn marker_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.log");
        OutputSink::from_path(Some(&path), false)
            .open("sync", "rsync")
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn missing_path_discards() {
        assert_eq!(OutputSink::from_path(None, true), OutputSink::Discard);
    }
}
