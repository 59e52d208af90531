//! Runs the external simulator on one program through the file protocol:
//! the program goes in as a JSON array of instruction strings, the
//! simulator answers with a JSON array of per-cycle snapshots.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    process::{Child, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use crate::snapshot::Snapshot;

mod command;

pub use command::SimulatorCommand;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("`{command}` failed: {reason}")]
    Failure { command: String, reason: String },
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("invalid command template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },
    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {reason}", .path.display())]
    MalformedOutput { path: PathBuf, reason: String },
}

/// Input and output paths of one test case.
#[derive(Clone, Debug, PartialEq, Eq, derive_new::new)]
pub struct CaseFiles {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl CaseFiles {
    /// `<dir>/test_NNNNN.json` and `<dir>/<output_subdir>/test_NNNNN.json`.
    pub fn for_case(dir: &Path, output_subdir: &str, index: usize) -> Self {
        let name = format!("test_{index:05}.json");
        Self {
            input: dir.join(&name),
            output: dir.join(output_subdir).join(name),
        }
    }

    /// Where the simulator's stderr is captured.
    pub fn stderr(&self) -> PathBuf {
        self.output.with_extension("stderr")
    }
}

/// The snapshots of one simulator run. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotLog {
    snapshots: Vec<Snapshot>,
}

impl SnapshotLog {
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// The state after the last simulated cycle; the only one that is checked.
    pub fn final_snapshot(&self) -> &Snapshot {
        &self.snapshots[self.snapshots.len() - 1]
    }
}

#[derive(Clone, Debug)]
pub struct SimulatorAdapter {
    command: SimulatorCommand,
    timeout: Duration,
}

impl SimulatorAdapter {
    pub fn new(command: SimulatorCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn command(&self) -> &SimulatorCommand {
        &self.command
    }

    /// Writes `program` to the case input, runs the simulator and parses its
    /// output.
    pub fn run<S: AsRef<str>>(
        &self,
        program: &[S],
        files: &CaseFiles,
    ) -> Result<SnapshotLog, AdapterError> {
        write_program(program, &files.input)?;
        self.execute(files)
    }

    /// Runs the simulator on an existing input file and parses its output.
    pub fn execute(&self, files: &CaseFiles) -> Result<SnapshotLog, AdapterError> {
        self.invoke(files)?;
        read_snapshots(&files.output)
    }

    /// Runs the simulator on an existing input file, leaving its output on
    /// disk.
    pub fn invoke(&self, files: &CaseFiles) -> Result<(), AdapterError> {
        create_parent_dir(&files.output)?;
        remove_stale(&files.output)?;
        let stderr_path = files.stderr();
        let stderr = File::create(&stderr_path).map_err(|source| AdapterError::Io {
            context: "could not create",
            path: stderr_path.clone(),
            source,
        })?;

        tracing::debug!(command = %self.command, input = %files.input.display(), "invoking simulator");
        let mut child = self
            .command
            .to_command(files)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(|e| self.failure(format!("could not spawn: {e}")))?;

        let status = self.wait(&mut child)?;
        if !status.success() {
            let tail = stderr_tail(&stderr_path);
            return Err(self.failure(format!("exited with {status}{tail}")));
        }
        if !files.output.exists() {
            return Err(self.failure(format!(
                "no output written to {}",
                files.output.display()
            )));
        }
        remove_if_empty(&stderr_path);
        Ok(())
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, AdapterError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| self.failure(format!("could not wait: {e}")))?
            {
                return Ok(status);
            }
            let now = Instant::now();
            if now >= deadline {
                // The child may exit between the poll and the kill.
                let _ = child.kill();
                let _ = child.wait();
                return Err(AdapterError::Timeout {
                    command: self.command.to_string(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    fn failure(&self, reason: String) -> AdapterError {
        AdapterError::Failure {
            command: self.command.to_string(),
            reason,
        }
    }
}

pub fn write_program<S: AsRef<str>>(program: &[S], path: &Path) -> Result<(), AdapterError> {
    create_parent_dir(path)?;
    let lines: Vec<&str> = program.iter().map(AsRef::<str>::as_ref).collect();
    let json = serde_json::to_string_pretty(&lines).map_err(|e| AdapterError::MalformedOutput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, json).map_err(|source| AdapterError::Io {
        context: "could not write program",
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_snapshots(path: &Path) -> Result<SnapshotLog, AdapterError> {
    let content = fs::read_to_string(path).map_err(|source| AdapterError::Io {
        context: "could not read simulator output",
        path: path.to_path_buf(),
        source,
    })?;
    let snapshots: Vec<Snapshot> =
        serde_json::from_str(&content).map_err(|e| AdapterError::MalformedOutput {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if snapshots.is_empty() {
        return Err(AdapterError::MalformedOutput {
            path: path.to_path_buf(),
            reason: "snapshot array is empty".to_string(),
        });
    }
    Ok(SnapshotLog { snapshots })
}

fn create_parent_dir(path: &Path) -> Result<(), AdapterError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| AdapterError::Io {
                context: "could not create directory",
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn remove_stale(path: &Path) -> Result<(), AdapterError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(AdapterError::Io {
            context: "could not remove stale output",
            path: path.to_path_buf(),
            source: e,
        }),
        _ => Ok(()),
    }
}

/// Drops a stderr capture the simulator never wrote to.
fn remove_if_empty(path: &Path) {
    if fs::metadata(path).is_ok_and(|meta| meta.len() == 0) {
        let _ = fs::remove_file(path);
    }
}

fn stderr_tail(path: &Path) -> String {
    let Ok(content) = fs::read_to_string(path) else {
        return String::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    format!("\nstderr:\n{}", lines[start..].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ooo-adapter-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn case_files_are_partitioned_by_index() {
        let files = CaseFiles::for_case(Path::new("tests"), "out", 42);
        assert_eq!(files.input, Path::new("tests/test_00042.json"));
        assert_eq!(files.output, Path::new("tests/out/test_00042.json"));
        assert_eq!(files.stderr(), Path::new("tests/out/test_00042.stderr"));
    }

    #[test]
    fn program_file_is_a_json_string_array() {
        let dir = scratch_dir("program");
        let path = dir.join("nested/test.json");
        write_program(&["add x1, x2, x3", "addi x4, x1, -5"], &path).unwrap();
        let parsed: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, ["add x1, x2, x3", "addi x4, x1, -5"]);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn rejects_empty_and_malformed_output() {
        let dir = scratch_dir("output");
        fs::create_dir_all(&dir).unwrap();

        let empty = dir.join("empty.json");
        fs::write(&empty, "[]").unwrap();
        assert!(matches!(
            read_snapshots(&empty),
            Err(AdapterError::MalformedOutput { .. })
        ));

        let garbage = dir.join("garbage.json");
        fs::write(&garbage, "[{\"PC\": ").unwrap();
        assert!(matches!(
            read_snapshots(&garbage),
            Err(AdapterError::MalformedOutput { .. })
        ));

        assert!(matches!(
            read_snapshots(&dir.join("missing.json")),
            Err(AdapterError::Io { .. })
        ));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_binary_is_a_failure() {
        let dir = scratch_dir("spawn");
        let adapter = SimulatorAdapter::new(
            SimulatorCommand::binary(dir.join("does-not-exist")),
            Duration::from_secs(1),
        );
        let result = adapter.run(&["add x1, x2, x3"], &CaseFiles::for_case(&dir, "out", 0));
        assert!(matches!(result, Err(AdapterError::Failure { .. })));
        let _ = fs::remove_dir_all(dir);
    }
}
