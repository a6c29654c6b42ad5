//! External scan command adapter.
//!
//! # Design
//! - Runs the configured program with `--path <path>` appended, one process per file.
//! - Output is mirrored into tracing; stderr lines and lines starting with
//!   `error` or `exception` count as error-level.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{IndexError, IndexResult};
use crate::traits::{Indexer, ScanReport};

const PATH_FLAG: &str = "--path";
const ERROR_PREFIXES: &[&str] = &["error", "exception"];

/// Spawns the host's file scan command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandScanner {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

impl CommandScanner {
    /// Scanner invoking `program` with `args` before the path flag.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Run the command from `dir`.
    #[must_use]
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// Run a scan for `path` and classify its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or its output cannot
    /// be read.
    pub async fn run(&self, path: &str) -> IndexResult<ScanReport> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(PATH_FLAG)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| IndexError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout_errors, stderr_errors) = tokio::join!(
            self.collect(stdout, OutputStream::Stdout, path),
            self.collect(stderr, OutputStream::Stderr, path)
        );

        let status = child.wait().await.map_err(|source| IndexError::Output {
            program: self.program.clone(),
            source,
        })?;

        let mut error_lines = stdout_errors?;
        error_lines.extend(stderr_errors?);

        Ok(ScanReport {
            exit_code: status.code().unwrap_or(-1),
            error_lines,
        })
    }

    async fn collect<R>(
        &self,
        reader: Option<R>,
        stream: OutputStream,
        path: &str,
    ) -> IndexResult<Vec<String>>
    where
        R: AsyncRead + Unpin,
    {
        let mut error_lines = Vec::new();
        let Some(reader) = reader else {
            return Ok(error_lines);
        };
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|source| IndexError::Output {
                program: self.program.clone(),
                source,
            })?
        {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match stream {
                OutputStream::Stdout => debug!(scan_path = path, line = trimmed, "scan output"),
                OutputStream::Stderr => warn!(scan_path = path, line = trimmed, "scan stderr"),
            }
            if matches!(stream, OutputStream::Stderr) || is_error_line(trimmed) {
                error_lines.push(trimmed.to_string());
            }
        }
        Ok(error_lines)
    }
}

fn is_error_line(line: &str) -> bool {
    let lowered = line.to_ascii_lowercase();
    ERROR_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

#[async_trait]
impl Indexer for CommandScanner {
    async fn scan(&self, path: &str) -> IndexResult<ScanReport> {
        self.run(path).await
    }

    async fn lookup_file_id(
        &self,
        _storage_id: &str,
        _relative_path: &str,
    ) -> IndexResult<Option<i64>> {
        Err(IndexError::Unsupported {
            operation: "lookup_file_id",
        })
    }
}
