//! Individual environment checks. Each returns a [`CheckResult`] and never
//! fails the run.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::debug;

use super::report::{CheckKind, CheckResult, CheckStatus};

/// Files that must exist under the project root, with a description.
pub const CRITICAL_FILES: &[(&str, &str)] = &[
    ("package.json", "root package descriptor"),
    ("frontend/package.json", "frontend package descriptor"),
    ("backend/Cargo.toml", "backend dependency list"),
];

/// Run `<tool> --version` and report the first line of its output.
pub async fn check_tool(tool: &str) -> CheckResult {
    let output = Command::new(tool)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await;
    match output {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout)
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            CheckResult::new(
                CheckKind::Tool,
                CheckStatus::Pass,
                format!("{tool} installed ({version})"),
            )
        }
        Ok(out) => CheckResult::new(
            CheckKind::Tool,
            CheckStatus::Fail,
            format!("{tool} --version exited with {}", out.status),
        ),
        Err(e) => {
            debug!(tool = %tool, error = %e, "Tool lookup failed");
            CheckResult::new(CheckKind::Tool, CheckStatus::Fail, format!("{tool} not found"))
        }
    }
}

pub fn check_file(root: &Path, relative: &str, description: &str) -> CheckResult {
    if root.join(relative).is_file() {
        CheckResult::new(
            CheckKind::CriticalFile,
            CheckStatus::Pass,
            format!("{relative} found ({description})"),
        )
    } else {
        CheckResult::new(
            CheckKind::CriticalFile,
            CheckStatus::Fail,
            format!("{relative} missing ({description})"),
        )
    }
}

/// `npm install` inside `frontend/`.
pub async fn install_frontend(root: &Path, npm: &str) -> CheckResult {
    let frontend = root.join("frontend");
    if !frontend.is_dir() {
        return CheckResult::new(
            CheckKind::Install,
            CheckStatus::Skip,
            "frontend/ not found, skipping dependency install",
        );
    }
    let status = Command::new(npm)
        .arg("install")
        .current_dir(&frontend)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(s) if s.success() => CheckResult::new(
            CheckKind::Install,
            CheckStatus::Pass,
            "frontend dependencies installed",
        ),
        Ok(s) => CheckResult::new(
            CheckKind::Install,
            CheckStatus::Fail,
            format!("npm install failed ({s})"),
        ),
        Err(e) => CheckResult::new(
            CheckKind::Install,
            CheckStatus::Fail,
            format!("could not run {npm}: {e}"),
        ),
    }
}

/// How the backend is started for the boot probe.
#[derive(Debug, Clone)]
pub struct BootProbe {
    pub command: Vec<String>,
    pub port: u16,
    pub wait: Duration,
}

/// Start the backend with `PORT` set, wait, probe the port, then kill it.
pub async fn boot_backend(root: &Path, probe: &BootProbe) -> CheckResult {
    let backend = root.join("backend");
    if !backend.is_dir() {
        return CheckResult::new(
            CheckKind::Boot,
            CheckStatus::Skip,
            "backend/ not found, skipping boot test",
        );
    }
    let Some((program, args)) = probe.command.split_first() else {
        return CheckResult::new(CheckKind::Boot, CheckStatus::Skip, "no server command configured");
    };

    let child = Command::new(program)
        .args(args)
        .current_dir(&backend)
        .env("PORT", probe.port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            return CheckResult::new(
                CheckKind::Boot,
                CheckStatus::Fail,
                format!("could not start backend: {e}"),
            )
        }
    };

    tokio::time::sleep(probe.wait).await;
    let exited = matches!(child.try_wait(), Ok(Some(_)));
    let listening = !exited && port_open(probe.port).await;

    if let Err(e) = child.kill().await {
        debug!(error = %e, "Backend process already gone");
    }

    if listening {
        CheckResult::new(
            CheckKind::Boot,
            CheckStatus::Pass,
            format!("backend started on port {}", probe.port),
        )
    } else if exited {
        CheckResult::new(CheckKind::Boot, CheckStatus::Fail, "backend exited during startup")
    } else {
        CheckResult::new(
            CheckKind::Boot,
            CheckStatus::Warn,
            format!("backend did not answer on port {} within {:?}", probe.port, probe.wait),
        )
    }
}

async fn port_open(port: u16) -> bool {
    matches!(
        tokio::time::timeout(Duration::from_secs(2), TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}
