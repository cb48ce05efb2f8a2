//! Process execution: spawn one build command, stream its output, wait for exit.
//!
//! Integrates with the logging pipeline via LogCollector: every child output
//! line is echoed to the terminal and persisted to the full log.

use crate::error::BuildError;
use crate::log_collector::LogCollector;
use crate::models::{BuildInvocation, ProcessOutput};
use futures::future::{BoxFuture, FutureExt};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Environment variable switching to the dry-run runner.
pub const DRY_RUN_ENV: &str = "APP_BUILDER_DRY_RUN";

/// Spawn-and-wait capability used by the driver.
///
/// `run` must not resolve until the process has exited.
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        invocation: &'a BuildInvocation,
    ) -> BoxFuture<'a, Result<ProcessOutput, BuildError>>;
}

/// Production runner backed by `tokio::process`.
#[derive(Clone, Default)]
pub struct TokioProcessRunner {
    log_collector: Option<Arc<LogCollector>>,
    /// Mirror child output to this process's stdout/stderr
    echo: bool,
}

impl TokioProcessRunner {
    pub fn new(log_collector: Option<Arc<LogCollector>>) -> Self {
        TokioProcessRunner {
            log_collector,
            echo: true,
        }
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a BuildInvocation,
    ) -> BoxFuture<'a, Result<ProcessOutput, BuildError>> {
        run_process(invocation, self.log_collector.as_deref(), self.echo).boxed()
    }
}

/// Runner that logs invocations without spawning anything.
#[derive(Clone, Default)]
pub struct DryRunRunner;

impl ProcessRunner for DryRunRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a BuildInvocation,
    ) -> BoxFuture<'a, Result<ProcessOutput, BuildError>> {
        async move {
            log::info!("[DRY-RUN] {}", invocation);
            Ok(ProcessOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
        .boxed()
    }
}

/// Pick the runner: dry-run when `APP_BUILDER_DRY_RUN` is set, else tokio.
pub fn runner_from_env(log_collector: Option<Arc<LogCollector>>) -> Arc<dyn ProcessRunner> {
    if std::env::var_os(DRY_RUN_ENV).is_some() {
        log::warn!("{} set: no build commands will be spawned", DRY_RUN_ENV);
        Arc::new(DryRunRunner)
    } else {
        Arc::new(TokioProcessRunner::new(log_collector))
    }
}

/// Spawn `invocation`, stream both pipes until they close, and wait for exit.
///
/// The environment overrides are applied to the child only.
pub async fn run_process(
    invocation: &BuildInvocation,
    log_collector: Option<&LogCollector>,
    echo: bool,
) -> Result<ProcessOutput, BuildError> {
    let spawn_failed = |reason: String| BuildError::SpawnFailed {
        program: invocation.program.clone(),
        reason,
    };

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .envs(&invocation.env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    log::debug!("Spawning: {}", invocation);
    let mut child = command.spawn().map_err(|e| spawn_failed(e.to_string()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| spawn_failed("Failed to capture stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| spawn_failed("Failed to capture stderr".to_string()))?;

    let mut stdout = BufReader::new(stdout);
    let mut stderr = BufReader::new(stderr);
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    let mut output = ProcessOutput::default();
    let mut stdout_closed = false;
    let mut stderr_closed = false;

    // Lines are split on raw bytes so that invalid UTF-8 never stops a pipe
    // from being drained while the child is still writing to it.
    while !(stdout_closed && stderr_closed) {
        tokio::select! {
            read = stdout.read_until(b'\n', &mut stdout_buf), if !stdout_closed => {
                match read {
                    Ok(0) => stdout_closed = true,
                    Ok(_) => {
                        let line = take_line(&mut stdout_buf);
                        if echo {
                            println!("{}", line);
                        }
                        if let Some(collector) = log_collector {
                            collector.log_str(line.as_str());
                        }
                        push_line(&mut output.stdout, &line);
                    }
                    Err(e) => {
                        log::warn!("stdout read error: {}", e);
                        stdout_closed = true;
                    }
                }
            }
            read = stderr.read_until(b'\n', &mut stderr_buf), if !stderr_closed => {
                match read {
                    Ok(0) => stderr_closed = true,
                    Ok(_) => {
                        let line = take_line(&mut stderr_buf);
                        if echo {
                            eprintln!("{}", line);
                        }
                        if let Some(collector) = log_collector {
                            collector.log_str(format!("[STDERR] {}", line));
                        }
                        push_line(&mut output.stderr, &line);
                    }
                    Err(e) => {
                        log::warn!("stderr read error: {}", e);
                        stderr_closed = true;
                    }
                }
            }
        }
    }

    // A cancelled read may leave an unterminated tail behind.
    if !stdout_buf.is_empty() {
        push_line(&mut output.stdout, &take_line(&mut stdout_buf));
    }
    if !stderr_buf.is_empty() {
        push_line(&mut output.stderr, &take_line(&mut stderr_buf));
    }

    let status = child
        .wait()
        .await
        .map_err(|e| spawn_failed(format!("Failed to wait for process: {}", e)))?;
    output.exit_code = status.code();

    log::debug!("'{}' exited with {:?}", invocation.program, output.exit_code);
    Ok(output)
}

/// Drain `buf` into one line without its terminator, decoding lossily.
fn take_line(buf: &mut Vec<u8>) -> String {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    let line = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    line
}

fn push_line(captured: &mut String, line: &str) {
    captured.push_str(line);
    captured.push('\n');
}
