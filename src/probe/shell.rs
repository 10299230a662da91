// src/probe/shell.rs

//! Asking an installed helper binary for its version through a root shell.

use super::{Probe, ProbeResult, Reported};
use crate::constants::VERSION_FLAG;
use crate::error::ExecError;
use crate::executor::PrivilegedExecutor;
use crate::utils::{first_digit_run, shell_quote};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Runs `<binary> -V` as root and scrapes the first digit run from its output.
///
/// A failed privileged call is never read as "not installed": absence has to be confirmed by
/// the filesystem fallback, since a transient root failure says nothing about the layer.
pub struct ShellProbe {
    executor: Arc<dyn PrivilegedExecutor>,
    binary: PathBuf,
}

impl ShellProbe {
    pub fn new(executor: Arc<dyn PrivilegedExecutor>, binary: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            binary: binary.into(),
        }
    }
}

impl Probe for ShellProbe {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn probe(&self) -> ProbeResult {
        let binary = self.binary.to_string_lossy();
        let command = format!("{} {}", shell_quote(&binary), VERSION_FLAG);
        let result = match self.executor.run_privileged(&[command.as_str()]) {
            Ok(result) => result,
            Err(ExecError::PrivilegeUnavailable(reason)) => {
                warn!("`{}` could not run: {}", command, reason);
                return ProbeResult::ProbeFailed(reason);
            }
        };

        let output = result.stdout();
        info!("`{}` exited {} with {:?}", command, result.exit_code, output);

        // A failed run says nothing about the version, whatever it printed.
        if !result.succeeded {
            warn!("`{}` exited {}", command, result.exit_code);
            return ProbeResult::ProbeFailed(format!(
                "`{}` exited {}",
                command, result.exit_code
            ));
        }
        match first_digit_run(&output) {
            Some(digits) => ProbeResult::Resolved(Reported::Raw(digits.to_string())),
            None => ProbeResult::Inconclusive(format!("`{}` printed no version", command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionResult;
    use std::sync::Mutex;

    /// Replays a canned answer and records the commands it was given.
    struct Canned {
        answer: Result<ExecutionResult, String>,
        seen: Mutex<Vec<String>>,
    }

    impl PrivilegedExecutor for Canned {
        fn run_privileged(&self, commands: &[&str]) -> Result<ExecutionResult, ExecError> {
            self.seen
                .lock()
                .unwrap()
                .extend(commands.iter().map(|c| c.to_string()));
            self.answer
                .clone()
                .map_err(ExecError::PrivilegeUnavailable)
        }
    }

    fn run(answer: Result<ExecutionResult, String>) -> (ProbeResult, Vec<String>) {
        let executor = Arc::new(Canned {
            answer,
            seen: Mutex::new(Vec::new()),
        });
        let result = ShellProbe::new(executor.clone(), "/data/adb/apd").probe();
        let seen = executor.seen.lock().unwrap().clone();
        (result, seen)
    }

    fn output(exit_code: i32, lines: &[&str]) -> Result<ExecutionResult, String> {
        Ok(ExecutionResult {
            exit_code,
            stdout_lines: lines.iter().map(|l| l.to_string()).collect(),
            succeeded: exit_code == 0,
        })
    }

    #[test]
    fn extracts_version_code() {
        let (result, seen) = run(output(0, &["apd 11039"]));
        assert_eq!(result, ProbeResult::Resolved(Reported::Raw("11039".into())));
        assert_eq!(seen, vec!["'/data/adb/apd' -V"]);
    }

    #[test]
    fn failed_run_ignores_printed_digits() {
        let (result, _) = run(output(1, &["error: EINVAL (22)"]));
        assert!(matches!(result, ProbeResult::ProbeFailed(_)));
        let (result, _) = run(output(1, &["warning", "apd 11039"]));
        assert!(matches!(result, ProbeResult::ProbeFailed(_)));
    }

    #[test]
    fn binary_path_is_quoted() {
        let executor = Arc::new(Canned {
            answer: output(0, &["apd 11039"]),
            seen: Mutex::new(Vec::new()),
        });
        ShellProbe::new(executor.clone(), "/data/adb/my apd;reboot").probe();
        assert_eq!(
            *executor.seen.lock().unwrap(),
            vec!["'/data/adb/my apd;reboot' -V"]
        );
    }

    #[test]
    fn empty_output_is_inconclusive() {
        let (result, _) = run(output(0, &[]));
        assert!(matches!(result, ProbeResult::Inconclusive(_)));
        let (result, _) = run(output(0, &["garbage"]));
        assert!(matches!(result, ProbeResult::Inconclusive(_)));
    }

    #[test]
    fn failures_are_not_absence() {
        let (result, _) = run(Err("root denied".into()));
        assert_eq!(result, ProbeResult::ProbeFailed("root denied".into()));
        let (result, _) = run(output(127, &[]));
        assert!(matches!(result, ProbeResult::ProbeFailed(_)));
    }
}
