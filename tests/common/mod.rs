use apstate::Engine;
use apstate::config::Config;
use apstate::error::ExecError;
use apstate::executor::{ExecutionResult, PrivilegedExecutor};
use apstate::probe::KernelInterface;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// What the fake root shell answers to every command sequence.
#[derive(Clone)]
pub enum Shell {
    Prints(i32, &'static str),
    Denied,
}

pub struct FakeExecutor {
    shell: Shell,
    pub calls: AtomicUsize,
}

impl PrivilegedExecutor for FakeExecutor {
    fn run_privileged(&self, _commands: &[&str]) -> Result<ExecutionResult, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.shell {
            Shell::Prints(code, out) => Ok(ExecutionResult {
                exit_code: *code,
                stdout_lines: out.lines().map(str::to_string).collect(),
                succeeded: *code == 0,
            }),
            Shell::Denied => Err(ExecError::PrivilegeUnavailable("denied".to_string())),
        }
    }
}

pub struct FakeKernel {
    pub version: i64,
    pub build_time: &'static str,
}

impl FakeKernel {
    pub fn absent() -> Self {
        Self {
            version: -38,
            build_time: "ERROR_38",
        }
    }

    pub fn at(version: i64) -> Self {
        Self {
            version,
            build_time: "Mon Jun  2 08:00:00 UTC 2025",
        }
    }
}

impl KernelInterface for FakeKernel {
    fn version(&self) -> i64 {
        self.version
    }

    fn build_time(&self) -> String {
        self.build_time.to_string()
    }
}

/// A fake device: a temporary `/data/adb`, a fake kernel and a fake root shell.
pub struct Device {
    _tmp: TempDir,
    pub adb: PathBuf,
    pub executor: Arc<FakeExecutor>,
    kernel: Arc<FakeKernel>,
    pub config: Config,
}

impl Device {
    pub fn new(kernel: FakeKernel, shell: Shell) -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let adb = tmp.path().join("adb");
        fs::create_dir_all(&adb).expect("create adb dir");

        let config = Config {
            apd_path: adb.join("apd"),
            version_file: adb.join("ap").join("version"),
            install_dir: adb.join("ap"),
            expected_kernel: "0.11.1".to_string(),
            expected_android: 11039,
            ..Config::default()
        };

        Self {
            _tmp: tmp,
            adb,
            executor: Arc::new(FakeExecutor {
                shell,
                calls: AtomicUsize::new(0),
            }),
            kernel: Arc::new(kernel),
            config,
        }
    }

    pub fn install_binary(&self) {
        fs::write(self.adb.join("apd"), b"\x7fELF").expect("write apd");
    }

    pub fn install_dir(&self) {
        fs::create_dir_all(self.adb.join("ap")).expect("create ap dir");
    }

    pub fn write_version_file(&self, content: &str) {
        self.install_dir();
        fs::write(self.adb.join("ap").join("version"), content).expect("write version file");
    }

    pub fn engine(&self) -> Engine {
        Engine::with_backends(
            self.config.clone(),
            self.kernel.clone(),
            self.executor.clone(),
        )
        .expect("valid config")
    }
}
