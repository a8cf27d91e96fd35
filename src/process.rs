use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Runs an external tool to completion and collects its output.
///
/// The child is killed when the returned future is dropped, which is also how
/// `timeout` is enforced. A non-zero exit is not an error here; callers decide.
pub async fn run_tool<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    timeout: Option<Duration>,
) -> Result<Output> {
    let tool = program.display().to_string();
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| Error::Spawn {
            tool: tool.clone(),
            source,
        })?;

    let output = child.wait_with_output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, output)
            .await
            .map_err(|_| Error::Timeout {
                tool,
                timeout: limit,
            })?,
        None => output.await,
    };
    Ok(output?)
}
