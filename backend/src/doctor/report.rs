//! Check results and their terminal rendering.

use std::fmt::Write as _;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skip,
}

impl CheckStatus {
    pub fn glyph(self) -> &'static str {
        match self {
            CheckStatus::Pass => "✓",
            CheckStatus::Fail => "✗",
            CheckStatus::Warn => "⚠",
            CheckStatus::Skip => "↷",
        }
    }

    fn color(self) -> &'static str {
        match self {
            CheckStatus::Pass => GREEN,
            CheckStatus::Fail => RED,
            CheckStatus::Warn => YELLOW,
            CheckStatus::Skip => DIM,
        }
    }
}

/// Which group a check belongs to. Only critical files decide the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Tool,
    CriticalFile,
    Install,
    Boot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub kind: CheckKind,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    pub fn new(kind: CheckKind, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub results: Vec<CheckResult>,
}

impl DoctorReport {
    pub fn push(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    /// True when every critical file was found.
    pub fn is_healthy(&self) -> bool {
        self.results
            .iter()
            .filter(|r| r.kind == CheckKind::CriticalFile)
            .all(|r| r.status == CheckStatus::Pass)
    }

    pub fn summary(&self) -> &'static str {
        if self.is_healthy() {
            "setup looks good"
        } else {
            "setup incomplete"
        }
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Render one line per check followed by the summary.
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();
        for result in &self.results {
            let glyph = result.status.glyph();
            if color {
                let _ = writeln!(out, "{}{}{} {}", result.status.color(), glyph, RESET, result.message);
            } else {
                let _ = writeln!(out, "{} {}", glyph, result.message);
            }
        }
        out.push('\n');
        let status = if self.is_healthy() {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };
        let summary = self.summary();
        if color {
            let _ = writeln!(
                out,
                "{BOLD}{}{} {}{RESET}",
                status.color(),
                status.glyph(),
                summary
            );
        } else {
            let _ = writeln!(out, "{} {}", status.glyph(), summary);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(file_status: CheckStatus) -> DoctorReport {
        let mut report = DoctorReport::default();
        report.push(CheckResult::new(CheckKind::Tool, CheckStatus::Fail, "node not found"));
        report.push(CheckResult::new(CheckKind::CriticalFile, file_status, "package.json"));
        report.push(CheckResult::new(CheckKind::Boot, CheckStatus::Skip, "boot skipped"));
        report
    }

    #[test]
    fn test_summary_follows_critical_files_only() {
        assert!(report(CheckStatus::Pass).is_healthy());
        assert_eq!(report(CheckStatus::Pass).summary(), "setup looks good");
        assert!(!report(CheckStatus::Fail).is_healthy());
        assert_eq!(report(CheckStatus::Fail).summary(), "setup incomplete");
    }

    #[test]
    fn test_render_without_color_has_no_escapes() {
        let text = report(CheckStatus::Pass).render(false);
        assert!(!text.contains('\x1b'));
        assert!(text.contains("✗ node not found"));
        assert!(text.contains("↷ boot skipped"));
        assert!(text.trim_end().ends_with("✓ setup looks good"));
    }

    #[test]
    fn test_render_with_color() {
        let text = report(CheckStatus::Fail).render(true);
        assert!(text.contains(RED));
        assert!(text.contains("setup incomplete"));
    }

    #[test]
    fn test_render_unhealthy_ends_with_failure_line() {
        let text = report(CheckStatus::Fail).render(false);
        assert!(text.trim_end().ends_with("✗ setup incomplete"));
    }

    #[test]
    fn test_count() {
        let r = report(CheckStatus::Pass);
        assert_eq!(r.count(CheckStatus::Fail), 1);
        assert_eq!(r.count(CheckStatus::Skip), 1);
        assert_eq!(r.count(CheckStatus::Warn), 0);
    }
}
