// src/executor.rs

//! Running command sequences inside a root shell.
//!
//! The executor is a thin boundary around `su`: it writes the commands to the shell's stdin,
//! captures stdout line by line, and reports the shell's final exit status, which is the status
//! of the last command. Output is handed back untouched apart from line splitting.
//!
//! Acquisition and execution share one wall-clock deadline. A shell that cannot be spawned,
//! refuses the session, or misses the deadline is reported as
//! [`ExecError::PrivilegeUnavailable`]; callers decide whether to fall back.
//!
//! On Unix each session runs in its own process group, and a session that misses the deadline
//! is killed as a group so background children cannot outlive it holding the output pipe.

use crate::error::ExecError;
use log::{debug, trace, warn};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running session is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The outcome of one privileged command sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit status of the session; `-1` if it was terminated by a signal.
    pub exit_code: i32,
    /// Everything the session wrote to stdout, split into lines.
    pub stdout_lines: Vec<String>,
    pub succeeded: bool,
}

impl ExecutionResult {
    /// Joins the captured lines back into one block of text.
    pub fn stdout(&self) -> String {
        self.stdout_lines.join("\n")
    }
}

/// Something that can run commands with root privileges.
pub trait PrivilegedExecutor: Send + Sync {
    fn run_privileged(&self, commands: &[&str]) -> Result<ExecutionResult, ExecError>;
}

/// Runs command sequences through an `su` binary.
pub struct SuExecutor {
    su_path: PathBuf,
    timeout: Duration,
    /// Held for the whole sequence so concurrent callers cannot interleave sessions.
    session: Mutex<()>,
}

impl SuExecutor {
    pub fn new(su_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            su_path: su_path.into(),
            timeout,
            session: Mutex::new(()),
        }
    }

    pub fn su_path(&self) -> &Path {
        &self.su_path
    }

    fn spawn(&self) -> Result<Child, ExecError> {
        let mut command = Command::new(&self.su_path);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
            .spawn()
            .map_err(|e| {
                ExecError::PrivilegeUnavailable(format!(
                    "failed to spawn {}: {}",
                    self.su_path.display(),
                    e
                ))
            })
    }
}

impl PrivilegedExecutor for SuExecutor {
    fn run_privileged(&self, commands: &[&str]) -> Result<ExecutionResult, ExecError> {
        // A poisoned lock only means another caller panicked mid-session; the guard holds no data.
        let _session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let deadline = Instant::now() + self.timeout;
        trace!("Running {} command(s) via {}", commands.len(), self.su_path.display());

        let mut child = self.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut script = commands.join("\n");
            script.push_str("\nexit\n");
            // If the shell refused the session it may already be gone; the exit status tells us.
            if let Err(e) = stdin.write_all(script.as_bytes()) {
                debug!("Writing to {} failed: {}", self.su_path.display(), e);
            }
        }

        // Drain stdout on a separate thread so a chatty session cannot fill the pipe and stall.
        let (tx, rx) = mpsc::channel();
        if let Some(mut stdout) = child.stdout.take() {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stdout.read_to_end(&mut buf);
                let _ = tx.send(buf);
            });
        }

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    kill_session(&mut child);
                    warn!(
                        "{} did not finish within {:?}",
                        self.su_path.display(),
                        self.timeout
                    );
                    return Err(ExecError::PrivilegeUnavailable(format!(
                        "timed out after {:?}",
                        self.timeout
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill_session(&mut child);
                    return Err(ExecError::PrivilegeUnavailable(format!(
                        "failed to wait for {}: {}",
                        self.su_path.display(),
                        e
                    )));
                }
            }
        };

        // Descendants of the shell may still hold stdout open; never wait past the deadline.
        let remaining = deadline.saturating_duration_since(Instant::now());
        let raw = match rx.recv_timeout(remaining) {
            Ok(raw) => raw,
            Err(_) => {
                kill_group(child.id());
                return Err(ExecError::PrivilegeUnavailable(format!(
                    "output of {} not closed within {:?}",
                    self.su_path.display(),
                    self.timeout
                )));
            }
        };

        let stdout_lines = split_lines(&String::from_utf8_lossy(&raw));
        let result = ExecutionResult {
            exit_code: status.code().unwrap_or(-1),
            stdout_lines,
            succeeded: status.success(),
        };
        debug!(
            "{} exited with {} ({} line(s) captured)",
            self.su_path.display(),
            result.exit_code,
            result.stdout_lines.len()
        );
        Ok(result)
    }
}

/// Splits captured output on `\n` only, so a `\r` the session printed stays in its line.
/// A single trailing newline does not produce an empty last line.
fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.strip_suffix('\n')
        .unwrap_or(text)
        .split('\n')
        .map(str::to_string)
        .collect()
}

fn kill_session(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

/// Kills the process group led by `pid`, taking background children of the session with it.
#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // Safety: kill(2) takes no pointers. A negative pid addresses the session's process group.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        debug!(
            "Killing process group {} failed: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sh(timeout_ms: u64) -> SuExecutor {
        SuExecutor::new("/bin/sh", Duration::from_millis(timeout_ms))
    }

    #[test]
    fn captures_all_output_and_last_status() {
        let result = sh(5_000)
            .run_privileged(&["echo first", "echo second", "false"])
            .unwrap();
        assert_eq!(result.stdout_lines, vec!["first", "second"]);
        assert_eq!(result.exit_code, 1);
        assert!(!result.succeeded);
    }

    #[test]
    fn successful_sequence() {
        let result = sh(5_000).run_privileged(&["echo apd 11039"]).unwrap();
        assert!(result.succeeded);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout(), "apd 11039");
    }

    #[test]
    fn output_is_not_trimmed() {
        let result = sh(5_000).run_privileged(&["echo '  padded  '"]).unwrap();
        assert_eq!(result.stdout_lines, vec!["  padded  "]);
    }

    #[test]
    fn carriage_returns_are_kept() {
        let result = sh(5_000).run_privileged(&[r"printf 'a\r\nb\n\nc'"]).unwrap();
        assert_eq!(result.stdout_lines, vec!["a\r", "b", "", "c"]);
    }

    #[test]
    fn line_splitting() {
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("\n"), vec![""]);
        assert_eq!(split_lines("x\r\n"), vec!["x\r"]);
        assert_eq!(split_lines("x\n\n"), vec!["x", ""]);
    }

    #[test]
    fn concurrent_callers_run_one_session_at_a_time() {
        let executor = Arc::new(sh(10_000));
        let started = Instant::now();
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let executor = Arc::clone(&executor);
                thread::spawn(move || executor.run_privileged(&["echo a; sleep 1; echo b"]))
            })
            .collect();
        for worker in workers {
            let result = worker.join().unwrap().unwrap();
            assert_eq!(result.stdout_lines, vec!["a", "b"]);
        }
        // Two one-second sessions back to back, never overlapping.
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn missing_su_is_privilege_unavailable() {
        let executor = SuExecutor::new("/nonexistent/su", Duration::from_secs(1));
        assert!(matches!(
            executor.run_privileged(&["id"]),
            Err(ExecError::PrivilegeUnavailable(_))
        ));
    }

    #[test]
    fn timeout_is_privilege_unavailable() {
        let started = Instant::now();
        let err = sh(200).run_privileged(&["sleep 5"]).unwrap_err();
        assert!(matches!(err, ExecError::PrivilegeUnavailable(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    /// Whether `pid` is still a live (not zombie) process.
    #[cfg(target_os = "linux")]
    fn alive(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/status", pid)) {
            Ok(status) => !status.lines().any(|l| l.starts_with("State:") && l.contains('Z')),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let command = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
        let err = sh(500).run_privileged(&[command.as_str()]).unwrap_err();
        assert!(matches!(err, ExecError::PrivilegeUnavailable(_)));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        let deadline = Instant::now() + Duration::from_secs(3);
        while alive(pid) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(!alive(pid), "background sleep {} survived the timeout", pid);
    }
}
