//! Human-readable batch report.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::task::Outcome;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
struct LedgerEntry {
    outcome: Outcome,
    recorded_at: DateTime<Local>,
}

/// Accumulates outcomes and renders them as a Markdown report.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLedger {
    entries: Vec<LedgerEntry>,
}

impl OutcomeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.entries.push(LedgerEntry {
            outcome,
            recorded_at: Local::now(),
        });
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = Outcome>) {
        for outcome in outcomes {
            self.record(outcome);
        }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.entries.iter().map(|e| &e.outcome)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn render_markdown(&self) -> String {
        let generated_at = Local::now();
        let mut rows: Vec<&LedgerEntry> = self.entries.iter().collect();
        rows.sort_by_key(|e| e.outcome.ordinal());

        let mut out = String::new();
        let _ = writeln!(out, "# TTS Conversion Report\n");
        let _ = writeln!(out, "**Generated**: {}\n", generated_at.format(TIME_FORMAT));
        let _ = writeln!(out, "**Total records**: {}\n", self.total());

        let _ = writeln!(out, "## Summary\n");
        let _ = writeln!(out, "| Item | Count |");
        let _ = writeln!(out, "|------|-------|");
        let _ = writeln!(out, "| Succeeded | {} |", self.succeeded());
        let _ = writeln!(out, "| Failed | {} |", self.failed());
        let _ = writeln!(out, "| Total | {} |\n", self.total());

        let _ = writeln!(out, "## Details\n");
        let _ = writeln!(out, "| # | Text | Output | Status | Time | Note |");
        let _ = writeln!(out, "|---|------|--------|--------|------|------|");
        for entry in rows {
            let outcome = &entry.outcome;
            let status = if outcome.succeeded() {
                "✅ Succeeded"
            } else {
                "❌ Failed"
            };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                outcome.ordinal(),
                escape_cell(outcome.text_preview()),
                code_span(&escape_cell(&outcome.destination().display().to_string())),
                status,
                entry.recorded_at.format(TIME_FORMAT),
                escape_cell(outcome.error()),
            );
        }

        out.push_str("\n---\n\n*Generated automatically by tts-batch*\n");
        out
    }

    /// Render and write the report to `path`, creating its directory.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        std::fs::write(path, self.render_markdown())?;
        log::info!(
            "Wrote report for {} record(s) to {}",
            self.total(),
            path.display()
        );
        Ok(())
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Wrap `value` in a code span whose fence is longer than any backtick run
/// inside it.
fn code_span(value: &str) -> String {
    let longest_run = value
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);
    if value.starts_with('`') || value.ends_with('`') {
        format!("{fence} {value} {fence}")
    } else {
        format!("{fence}{value}{fence}")
    }
}
