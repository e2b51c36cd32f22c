use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::error::KubectlError;

/// Resolve `binary` on PATH (or as given, when it is a path).
pub(crate) fn locate(binary: &Path) -> Result<PathBuf, KubectlError> {
    which::which(binary).map_err(|_| KubectlError::NotFound(binary.display().to_string()))
}

/// Human-readable command line for logs and errors.
pub(crate) fn render_command(binary: &Path, args: &[OsString]) -> String {
    let mut line = binary.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Run `binary args…` to completion and return its stdout.
///
/// The child is killed when `limit` elapses (the dropped wait future drops
/// the child, and `kill_on_drop` reaps it). A non-zero exit is an error
/// carrying trimmed stderr.
pub(crate) async fn run(
    binary: &Path,
    args: &[OsString],
    limit: Duration,
) -> Result<Vec<u8>, KubectlError> {
    let resolved = locate(binary)?;
    let command = render_command(binary, args);
    debug!(command = %command, "running kubectl");

    let child = Command::new(&resolved)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| KubectlError::Spawn {
            command: command.clone(),
            source,
        })?;

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => return Err(KubectlError::Spawn { command, source }),
        Err(_elapsed) => {
            warn!(command = %command, secs = limit.as_secs(), "kubectl timed out");
            return Err(KubectlError::Timeout {
                command,
                secs: limit.as_secs(),
            });
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        warn!(command = %command, code, stderr = %stderr, "kubectl failed");
        return Err(KubectlError::Exited {
            command,
            code,
            stderr,
        });
    }
    if !stderr.is_empty() {
        debug!(command = %command, stderr = %stderr, "kubectl stderr");
    }

    Ok(output.stdout)
}
