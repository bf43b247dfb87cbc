//! Environment smoke test for a development checkout.
//!
//! Verifies required tools, the critical project files, optionally installs
//! frontend dependencies and tries to boot the backend. Failures are reported
//! but only missing critical files make the summary "setup incomplete".

pub mod checks;
pub mod report;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub use checks::{BootProbe, CRITICAL_FILES};
pub use report::{CheckKind, CheckResult, CheckStatus, DoctorReport};

#[derive(Debug, Clone, Parser)]
#[command(name = "purretys-doctor")]
#[command(about = "Check that a Purretys checkout is ready to run")]
pub struct DoctorOptions {
    /// Project root containing frontend/ and backend/.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Port used for the backend boot test.
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Run `npm install` in frontend/.
    #[arg(long)]
    pub install: bool,

    /// Skip the backend boot test.
    #[arg(long)]
    pub no_boot: bool,

    /// Disable ANSI colors.
    #[arg(long)]
    pub no_color: bool,

    /// Tools that must answer `--version`.
    #[arg(long, value_delimiter = ',', default_value = "node,npm,cargo")]
    pub tools: Vec<String>,

    /// Command started inside backend/ for the boot test.
    #[arg(long, default_value = "cargo run --quiet --bin purretys-server")]
    pub server_cmd: String,

    /// Seconds to wait before probing the backend port.
    #[arg(long, default_value_t = 10)]
    pub boot_wait_secs: u64,
}

impl Default for DoctorOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            port: 8000,
            install: false,
            no_boot: false,
            no_color: false,
            tools: vec!["node".to_string(), "npm".to_string(), "cargo".to_string()],
            server_cmd: "cargo run --quiet --bin purretys-server".to_string(),
            boot_wait_secs: 10,
        }
    }
}

impl DoctorOptions {
    fn boot_probe(&self) -> BootProbe {
        BootProbe {
            command: self.server_cmd.split_whitespace().map(str::to_string).collect(),
            port: self.port,
            wait: Duration::from_secs(self.boot_wait_secs),
        }
    }

    fn npm(&self) -> &str {
        self.tools
            .iter()
            .find(|t| t.as_str() == "npm")
            .map(String::as_str)
            .unwrap_or("npm")
    }
}

/// Run every check in order and collect the results.
pub async fn run_doctor(options: &DoctorOptions) -> DoctorReport {
    let mut report = DoctorReport::default();
    info!(root = %options.root.display(), "Running environment checks");

    for tool in &options.tools {
        report.push(checks::check_tool(tool).await);
    }

    for (path, description) in CRITICAL_FILES {
        report.push(checks::check_file(&options.root, path, description));
    }

    if options.install {
        report.push(checks::install_frontend(&options.root, options.npm()).await);
    } else {
        report.push(CheckResult::new(
            CheckKind::Install,
            CheckStatus::Skip,
            "dependency install skipped (pass --install)",
        ));
    }

    if options.no_boot {
        report.push(CheckResult::new(
            CheckKind::Boot,
            CheckStatus::Skip,
            "backend boot test skipped (--no-boot)",
        ));
    } else {
        report.push(checks::boot_backend(&options.root, &options.boot_probe()).await);
    }

    info!(
        passed = report.count(CheckStatus::Pass),
        failed = report.count(CheckStatus::Fail),
        healthy = report.is_healthy(),
        "Environment checks finished"
    );
    report
}
