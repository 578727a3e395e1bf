use crate::config::ToolCommand;
use crate::error::{AnalyzerError, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of one finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs `tool` with `args` in `cwd`, bounded by `timeout`.
///
/// A non-zero exit is not an error here; callers decide what an exit code
/// means. The tool runs in its own process group; when the bound is exceeded
/// the whole group is killed, so helpers it forked cannot keep writing into
/// the working directory, and [`AnalyzerError::Timeout`] is returned.
pub async fn run_tool(
    tool: &ToolCommand,
    args: &[OsString],
    cwd: &Path,
    timeout: Duration,
) -> Result<ToolOutput> {
    let mut command = Command::new(&tool.program);
    command
        .args(&tool.prefix_args)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    debug!(
        command = %tool.display_with(args),
        cwd = %cwd.display(),
        "spawning tool"
    );

    let start_time = Instant::now();
    let child = command.spawn().map_err(|source| AnalyzerError::Launch {
        program: tool.program.clone(),
        source,
    })?;
    let pid = child.id();

    // Dropping the wait future on timeout drops the child, which kills it.
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => {
            let output = output?;
            let elapsed = start_time.elapsed();
            debug!(
                program = %tool.program,
                code = ?output.status.code(),
                elapsed_ms = elapsed.as_millis() as u64,
                "tool exited"
            );

            Ok(ToolOutput {
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                elapsed,
            })
        }
        Err(_) => {
            kill_process_group(pid);
            warn!(
                program = %tool.program,
                timeout_secs = timeout.as_secs_f64(),
                "tool exceeded its time limit and was killed"
            );
            Err(AnalyzerError::Timeout {
                program: tool.program.clone(),
                timeout,
            })
        }
    }
}

/// SIGKILLs every process left in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };

    // SAFETY: killpg only sends a signal; a group that already emptied
    // yields ESRCH, which is fine.
    if unsafe { libc::killpg(pid, libc::SIGKILL) } != 0 {
        debug!(
            pgid = pid,
            error = %std::io::Error::last_os_error(),
            "process group already gone"
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
