use crate::{OutputFormat, Stage};

/// Snapshot of a run; also the summary returned when a run ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunView {
    pub lessons_total: usize,
    pub chapters_total: usize,
    pub lessons_started: usize,
    pub html_written: usize,
    pub fetch_failures: usize,
    pub sanitize_fallbacks: usize,
    pub sanitize_skips: usize,
    pub conversions_succeeded: usize,
    pub conversions_failed: usize,
    pub conversions_cancelled: usize,
    pub benign_diagnostics: usize,
    pub cancelled: bool,
    pub current: Option<(String, Stage)>,
    /// `(ordinal, format)` pairs that failed; `None` format means the lesson itself.
    pub failures: Vec<(String, Option<OutputFormat>)>,
}

impl RunView {
    /// True when no lesson or conversion failed.
    pub fn is_clean(&self) -> bool {
        self.fetch_failures == 0 && self.sanitize_skips == 0 && self.conversions_failed == 0
    }

    pub fn progress_label(&self) -> String {
        format!("{} of {}", self.lessons_started, self.lessons_total)
    }
}
