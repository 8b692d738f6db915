// SPDX-License-Identifier: Apache-2.0

//! Running external tools (host compiler, reference compiler, prover and the
//! produced binary).
//!
//! Pipelines describe what to run as a [`ToolInvocation`] and hand it to a
//! [`ToolRunner`]; the system runner is the only place that spawns processes.
//! Output is captured and returned, never printed from here.

use std::ffi::{OsStr, OsString};
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use log::info;

use crate::tv_error::TvError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Short human-readable name used in logs and errors, e.g. "transpile".
    pub description: String,
    pub program: OsString,
    pub args: Vec<OsString>,
    /// Variables set on top of the inherited environment.
    pub env: Vec<(OsString, OsString)>,
    pub current_dir: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(description: &str, program: impl AsRef<OsStr>) -> Self {
        Self {
            description: description.to_string(),
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Lossy rendering of the arguments, for assertions and diagnostics.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') && !self.stderr.is_empty() {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }

    pub fn status_description(&self) -> String {
        if self.timed_out {
            "timed out".to_string()
        } else {
            match self.exit_code {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            }
        }
    }

    fn from_output(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            timed_out: false,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Seam between the pipelines and process execution.
pub trait ToolRunner {
    /// Runs the invocation to completion. A tool that starts and fails is a
    /// successful call returning a non-success [`ToolOutput`]; only a tool that
    /// cannot be started at all is an error.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, TvError>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, TvError> {
        (**self).run(invocation)
    }
}

/// Runs tools as real subprocesses, optionally killing any that exceed
/// `timeout`.
#[derive(Debug, Clone, Default)]
pub struct SystemToolRunner {
    timeout: Option<Duration>,
}

impl SystemToolRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

fn spawn_error(invocation: &ToolInvocation, e: std::io::Error) -> TvError {
    TvError::ToolSpawn {
        description: invocation.description.clone(),
        message: format!("{}: {}", invocation.program.to_string_lossy(), e),
    }
}

fn read_capture(file: &mut std::fs::File) -> std::io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Kills the process group led by `child`, falling back to the child alone
/// when the group is already gone.
fn kill_process_group(child: &mut std::process::Child) {
    let pgid = child.id() as libc::pid_t;
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let _ = child.kill();
    }
}

/// Output goes to anonymous files rather than pipes so a chatty child cannot
/// block on a full pipe while we poll for its exit.
///
/// The tool leads its own process group so a timeout also takes down the
/// compiler drivers' subprocesses (`cc1plus` and friends).
fn run_with_deadline(
    mut command: Command,
    invocation: &ToolInvocation,
    timeout: Duration,
) -> Result<ToolOutput, TvError> {
    let capture_error = |e: std::io::Error| TvError::Io {
        path: PathBuf::from("<capture file>"),
        source: e,
    };
    let mut stdout_file = tempfile::tempfile().map_err(capture_error)?;
    let mut stderr_file = tempfile::tempfile().map_err(capture_error)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file.try_clone().map_err(capture_error)?))
        .stderr(Stdio::from(stderr_file.try_clone().map_err(capture_error)?));
    unsafe {
        command.pre_exec(|| {
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let started_at = Instant::now();
    let mut child = command.spawn().map_err(|e| spawn_error(invocation, e))?;
    let (exit_code, timed_out) = loop {
        match child.try_wait() {
            Ok(Some(status)) => break (status.code(), false),
            Ok(None) => {
                if started_at.elapsed() >= timeout {
                    log::warn!(
                        "{} exceeded {:?}; killing process group {}",
                        invocation.description,
                        timeout,
                        child.id()
                    );
                    kill_process_group(&mut child);
                    let status = child.wait().map_err(|e| spawn_error(invocation, e))?;
                    break (status.code(), true);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(spawn_error(invocation, e)),
        }
    };

    Ok(ToolOutput {
        exit_code,
        timed_out,
        stdout: read_capture(&mut stdout_file).map_err(capture_error)?,
        stderr: read_capture(&mut stderr_file).map_err(capture_error)?,
    })
}

impl ToolRunner for SystemToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, TvError> {
        let mut command = invocation.to_command();
        info!("Running {}: {:?}", invocation.description, command);
        let output = match self.timeout {
            Some(timeout) => run_with_deadline(command, invocation, timeout)?,
            None => {
                let output = command
                    .stdin(Stdio::null())
                    .output()
                    .map_err(|e| spawn_error(invocation, e))?;
                ToolOutput::from_output(output)
            }
        };
        info!(
            "{} finished with {}",
            invocation.description,
            output.status_description()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolInvocation {
        ToolInvocation::new("shell", "/bin/sh").arg("-c").arg(script)
    }

    #[test]
    fn test_captures_stdout_stderr_and_exit_code() {
        let runner = SystemToolRunner::default();
        let output = runner.run(&sh("echo out; echo err 1>&2; exit 3")).unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.combined(), "out\nerr\n");
    }

    #[test]
    fn test_env_and_current_dir_are_applied() {
        let temp_dir = tempfile::tempdir().unwrap();
        let runner = SystemToolRunner::default();
        let invocation = sh("echo \"$BIMPLE_TV_GREETING\"; pwd")
            .env("BIMPLE_TV_GREETING", "hello")
            .current_dir(temp_dir.path());
        let output = runner.run(&invocation).unwrap();
        assert!(output.success());
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("hello"));
        let pwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(
            pwd.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_deadline_runner_captures_output() {
        let runner = SystemToolRunner::new(Some(Duration::from_secs(30)));
        let output = runner.run(&sh("echo fine; echo warn 1>&2")).unwrap();
        assert!(output.success());
        assert!(!output.timed_out);
        assert_eq!(output.stdout, "fine\n");
        assert_eq!(output.stderr, "warn\n");
    }

    #[test]
    fn test_deadline_kills_hung_tool() {
        let runner = SystemToolRunner::new(Some(Duration::from_millis(200)));
        let started_at = Instant::now();
        let output = runner.run(&sh("echo before; exec sleep 30")).unwrap();
        assert!(output.timed_out);
        assert!(!output.success());
        assert_eq!(output.status_description(), "timed out");
        assert_eq!(output.stdout, "before\n");
        assert!(started_at.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn test_deadline_kills_grandchildren() {
        let runner = SystemToolRunner::new(Some(Duration::from_millis(200)));
        let output = runner.run(&sh("sleep 30 & echo $!; wait")).unwrap();
        assert!(output.timed_out);
        let pid: libc::pid_t = output.stdout.trim().parse().unwrap();
        // Dead means gone or a zombie waiting for whichever process adopted it.
        let alive = |pid: libc::pid_t| {
            match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
                Ok(stat) => !stat
                    .rsplit(')')
                    .next()
                    .unwrap_or("")
                    .trim_start()
                    .starts_with('Z'),
                Err(_) => false,
            }
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while alive(pid) {
            assert!(Instant::now() < deadline, "pid {} outlived the deadline", pid);
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = SystemToolRunner::default();
        let err = runner
            .run(&ToolInvocation::new(
                "prover",
                "/definitely/not/a/real/alive-tv",
            ))
            .unwrap_err();
        match err {
            TvError::ToolSpawn { description, .. } => assert_eq!(description, "prover"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_combined_inserts_separator_only_when_needed() {
        let output = ToolOutput {
            exit_code: Some(0),
            timed_out: false,
            stdout: "a".to_string(),
            stderr: "b".to_string(),
        };
        assert_eq!(output.combined(), "a\nb");
        let output = ToolOutput {
            stdout: String::new(),
            ..output
        };
        assert_eq!(output.combined(), "b");
    }
}
