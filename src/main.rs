// src/main.rs

//! Command-line front end for the patch state engine.
//!
//! This binary has multiple modes of operation based on its command-line arguments:
//! - No arguments or `state`: Resolves both layers and prints their states.
//! - `kernel` / `android`: Resolves and prints a single layer.
//! - `build-time`: Prints the build time of the loaded KernelPatch image.
//! - `check-update <file>`: Compares a saved update-endpoint body with this build.
//! - `version`: Prints the tool version and the versions it ships.
//!
//! Configuration is read from the TOML file named by `APSTATE_CONFIG`, if set.

use anyhow::{Context, Result, bail};
use apstate::config::Config;
use apstate::constants::{self, APSTATE_VERSION, BUILD_KPV, MANAGER_VERSION_CODE};
use apstate::resolver::{CancelToken, Layer};
use apstate::update::UpdateCheck;
use apstate::{Engine, LayerStatus};
use log::error;
use std::fs;

/// Initializes the Android logger with a specific tag.
fn init_android_logger(tag: &str) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(constants::MAX_LOG_LEVEL)
            .with_tag(tag),
    );
}

fn engine() -> Result<Engine> {
    let config = Config::from_env_or_default().context("Failed to load configuration")?;
    Engine::new(config).context("Invalid expected kernel version")
}

/// Parses command-line arguments and dispatches to the correct logic.
fn start() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cancel = CancelToken::new();
    match args.get(1).map(String::as_str) {
        None | Some("state") => {
            let state = engine()?.current_state(&cancel);
            println!("{}", LayerStatus::Kernel(state.kernel));
            println!("{}", LayerStatus::Android(state.android));
        }
        Some("kernel") => println!("{}", engine()?.resolve(Layer::Kernel, &cancel)),
        Some("android") => println!("{}", engine()?.resolve(Layer::Android, &cancel)),
        Some("build-time") => match engine()?.kernel_build_time() {
            Some(time) => println!("{}", time),
            None => bail!("KernelPatch build time unavailable"),
        },
        Some("check-update") => {
            let Some(path) = args.get(2) else {
                bail!("check-update: missing body file argument");
            };
            let body = fs::read_to_string(path)
                .with_context(|| format!("Failed to read update body from {}", path))?;
            match UpdateCheck::evaluate(&body, MANAGER_VERSION_CODE) {
                UpdateCheck::Available { remote } => {
                    println!("update available: {} -> {}", MANAGER_VERSION_CODE, remote)
                }
                UpdateCheck::UpToDate { remote } => {
                    println!("up to date ({} >= {})", MANAGER_VERSION_CODE, remote)
                }
                UpdateCheck::Unparseable => bail!("check-update: body holds no version code"),
            }
        }
        Some("version") => {
            println!(
                "apstate {} (KernelPatch {}, AndroidPatch {})",
                APSTATE_VERSION, BUILD_KPV, MANAGER_VERSION_CODE
            );
        }
        Some(other) => bail!("Unknown command: {}", other),
    }
    Ok(())
}

fn main() {
    // Use the binary name as the log tag.
    let arg0 = std::env::args().next().unwrap_or_default();
    let process_name = arg0.split('/').next_back().unwrap_or("apstate");
    init_android_logger(process_name);

    if let Err(e) = start() {
        error!("apstate failed: {:?}", e);
        eprintln!("apstate: {:#}", e);
        std::process::exit(1);
    }
}
