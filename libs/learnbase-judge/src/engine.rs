/// Execution Engine - Process Sandbox for Untrusted Code
///
/// **Core Responsibility:**
/// Run one composed unit with one test input and capture raw outputs.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to execute (child process, pipes, deadline)
/// - Engine does NOT know comparison rules
/// - Engine returns raw outputs for the evaluator to judge
///
/// **Isolation Model:**
/// - One fresh child process per run, in its own process group
/// - Environment scrubbed down to PATH plus the language's configured variables
/// - Working directory is a scratch directory private to the run; the staged
///   unit itself lives elsewhere and is only read
/// - Only the three standard streams are shared with the child
///
/// **Deadline:**
/// Enforced from the outside. When it expires the whole process group gets
/// SIGKILL and the child is reaped before this call returns. Output captured
/// up to that point is kept.

use crate::config::LanguageConfigManager;
use crate::evaluator::{ExecutionResult, TIMEOUT_EXIT_CODE};
use crate::harness::ComposedUnit;
use learnbase_common::types::Language;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Safety limits to keep pathological submissions away from the runtime
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2500);

const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";
const READ_CHUNK_BYTES: usize = 8 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("source code exceeds maximum size of {limit} bytes (got {actual})")]
    SourceTooLarge { actual: usize, limit: usize },

    #[error("test input exceeds maximum size of {limit} bytes (got {actual})")]
    InputTooLarge { actual: usize, limit: usize },

    #[error("no runtime configured for language '{0}'")]
    NotConfigured(Language),

    #[error("failed to stage composed unit: {0}")]
    Stage(#[source] std::io::Error),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for the child process: {0}")]
    Wait(#[source] std::io::Error),
}

/// A composed unit written to its own temporary directory.
///
/// Written once, read-only afterwards; several runs may share it. The directory
/// is removed on drop, so keep it alive until every run using it has returned.
#[derive(Debug)]
pub struct StagedUnit {
    language: Language,
    dir: TempDir,
    path: PathBuf,
}

impl StagedUnit {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Process-group cleanup guard - kills everything the child spawned on drop
/// This ensures descendants are cleaned up even if the caller cancels the run
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    #[cfg(unix)]
    fn kill(&self) {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pgid) = self.pgid else { return };
        match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!(pgid, error = %e, "Failed to kill process group"),
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Keeps the first `limit` bytes of a stream and counts the rest
#[derive(Debug, Default)]
struct CappedBuffer {
    bytes: Vec<u8>,
    limit: usize,
    dropped: usize,
}

impl CappedBuffer {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.bytes.len());
        let take = room.min(chunk.len());
        self.bytes.extend_from_slice(&chunk[..take]);
        self.dropped += chunk.len() - take;
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Read a pipe to EOF. Past the cap, data is still consumed so the child never
/// blocks on a full pipe.
async fn drain<R: AsyncRead + Unpin>(reader: Option<R>, sink: &mut CappedBuffer) {
    let Some(mut reader) = reader else { return };
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => sink.push(&chunk[..n]),
            Err(e) => {
                debug!(error = %e, "Stopped reading child pipe");
                break;
            }
        }
    }
}

/// Write the whole input, then close stdin so the child sees EOF.
/// A child that exits without reading yields EPIPE, which is not an error here.
async fn feed<W: AsyncWrite + Unpin>(writer: Option<W>, input: &[u8]) {
    let Some(mut writer) = writer else { return };
    if let Err(e) = writer.write_all(input).await {
        debug!(error = %e, "Child closed stdin before reading all input");
        return;
    }
    let _ = writer.shutdown().await;
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    TIMEOUT_EXIT_CODE
}

fn search_path() -> std::ffi::OsString {
    std::env::var_os("PATH").unwrap_or_else(|| FALLBACK_PATH.into())
}

/// Local process execution engine
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    config_manager: LanguageConfigManager,
}

impl ProcessEngine {
    pub fn new(config_manager: LanguageConfigManager) -> Self {
        Self { config_manager }
    }

    /// Default deadline for a language, from its configuration
    pub fn default_timeout(&self, language: &Language) -> Duration {
        self.config_manager
            .get_config(language)
            .map(|c| Duration::from_millis(c.timeout_ms))
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Persist a composed unit into a fresh temporary directory
    pub async fn stage(&self, unit: &ComposedUnit) -> Result<StagedUnit, EngineError> {
        if unit.len() > MAX_SOURCE_CODE_BYTES {
            return Err(EngineError::SourceTooLarge {
                actual: unit.len(),
                limit: MAX_SOURCE_CODE_BYTES,
            });
        }

        let config = self
            .config_manager
            .get_config(&unit.language)
            .map_err(|_| EngineError::NotConfigured(unit.language))?;

        let dir = tempfile::Builder::new()
            .prefix("learnbase-")
            .tempdir()
            .map_err(EngineError::Stage)?;
        let path = dir.path().join(config.execution.file_name());

        tokio::fs::write(&path, unit.source.as_bytes())
            .await
            .map_err(EngineError::Stage)?;

        debug!(path = %path.display(), bytes = unit.len(), "Staged composed unit");

        Ok(StagedUnit {
            language: unit.language,
            dir,
            path,
        })
    }

    /// Stage a private copy of `unit`, run it once, and remove the copy
    pub async fn run(
        &self,
        unit: &ComposedUnit,
        input: &[u8],
        timeout: Duration,
    ) -> Result<ExecutionResult, EngineError> {
        let staged = self.stage(unit).await?;
        self.run_staged(&staged, input, timeout).await
    }

    /// Run an already staged unit once with `input` on stdin.
    ///
    /// The run is complete when the child has exited and both output pipes
    /// reached EOF. A descendant that keeps a pipe open therefore keeps the run
    /// alive until the deadline, at which point the whole group is killed.
    pub async fn run_staged(
        &self,
        staged: &StagedUnit,
        input: &[u8],
        timeout: Duration,
    ) -> Result<ExecutionResult, EngineError> {
        if input.len() > MAX_TEST_INPUT_BYTES {
            return Err(EngineError::InputTooLarge {
                actual: input.len(),
                limit: MAX_TEST_INPUT_BYTES,
            });
        }

        let config = self
            .config_manager
            .get_config(&staged.language)
            .map_err(|_| EngineError::NotConfigured(staged.language))?;

        let workdir = tempfile::Builder::new()
            .prefix("learnbase-run-")
            .tempdir()
            .map_err(EngineError::Stage)?;

        let mut command = Command::new(&config.execution.command);
        command
            .args(&config.execution.args)
            .arg(&staged.path)
            .current_dir(workdir.path())
            .env_clear()
            .env("PATH", search_path())
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            command: config.execution.command.clone(),
            source,
        })?;

        // Set up the group guard immediately: cleanup must happen on every exit path
        let guard = ProcessGroupGuard::new(child.id());

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut stdout_buf = CappedBuffer::new(config.max_output_bytes);
        let mut stderr_buf = CappedBuffer::new(config.max_output_bytes);

        // Filled in as soon as the leader exits, even if a descendant
        // holds the pipes open past the deadline
        let mut leader_exit = None;
        let finished = tokio::time::timeout(timeout, async {
            let (_, _, _, status) = tokio::join!(
                feed(stdin, input),
                drain(stdout, &mut stdout_buf),
                drain(stderr, &mut stderr_buf),
                async {
                    let status = child.wait().await;
                    if let Ok(status) = &status {
                        leader_exit = Some(exit_code_of(*status));
                    }
                    status
                },
            );
            status
        })
        .await;

        let (exit_code, timed_out, leader_exit_code) = match finished {
            Ok(Ok(status)) => (exit_code_of(status), false, None),
            Ok(Err(e)) => return Err(EngineError::Wait(e)),
            Err(_) => {
                // HARD TIMEOUT: kill the group, then reap the leader
                guard.kill();
                if leader_exit.is_none() {
                    if let Err(e) = child.start_kill() {
                        debug!(error = %e, "Child already gone at deadline");
                    }
                    if let Err(e) = child.wait().await {
                        warn!(error = %e, "Failed to reap timed-out child");
                    }
                }
                (TIMEOUT_EXIT_CODE, true, leader_exit)
            }
        };

        // Leftover descendants die before their scratch directory is removed
        drop(guard);
        drop(workdir);

        let execution_time_ms = start.elapsed().as_millis() as u64;

        if stdout_buf.dropped > 0 || stderr_buf.dropped > 0 {
            warn!(
                stdout_dropped = stdout_buf.dropped,
                stderr_dropped = stderr_buf.dropped,
                limit = config.max_output_bytes,
                "Child output exceeded capture limit"
            );
        }

        if timed_out {
            warn!(
                execution_time_ms,
                timeout_ms = timeout.as_millis() as u64,
                ?leader_exit_code,
                "Execution timed out; process group killed"
            );
        } else {
            debug!(execution_time_ms, exit_code, "Execution completed");
        }

        Ok(ExecutionResult {
            stdout: stdout_buf.into_string(),
            stderr: stderr_buf.into_string(),
            exit_code,
            timed_out,
            leader_exit_code,
            execution_time_ms,
        })
    }
}
