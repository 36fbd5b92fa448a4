use std::collections::BTreeSet;

use crate::view_model::RunView;
use crate::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Queued,
    Fetching,
    WritingHtml,
    Sanitizing,
    Converting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    pub(crate) lessons_total: usize,
    pub(crate) chapters_total: usize,
    pub(crate) lessons_started: usize,
    pub(crate) html_written: usize,
    pub(crate) fetch_failures: usize,
    pub(crate) sanitize_fallbacks: usize,
    pub(crate) sanitize_skips: usize,
    pub(crate) conversions_succeeded: usize,
    pub(crate) conversions_failed: usize,
    pub(crate) conversions_cancelled: usize,
    pub(crate) benign_diagnostics: usize,
    pub(crate) cancelled: bool,
    pub(crate) current: Option<(String, Stage)>,
    pub(crate) failed: BTreeSet<(String, Option<OutputFormat>)>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> RunView {
        RunView {
            lessons_total: self.lessons_total,
            chapters_total: self.chapters_total,
            lessons_started: self.lessons_started,
            html_written: self.html_written,
            fetch_failures: self.fetch_failures,
            sanitize_fallbacks: self.sanitize_fallbacks,
            sanitize_skips: self.sanitize_skips,
            conversions_succeeded: self.conversions_succeeded,
            conversions_failed: self.conversions_failed,
            conversions_cancelled: self.conversions_cancelled,
            benign_diagnostics: self.benign_diagnostics,
            cancelled: self.cancelled,
            current: self.current.clone(),
            failures: self.failed.iter().cloned().collect(),
        }
    }

    pub(crate) fn set_current(&mut self, ordinal: String, stage: Stage) {
        self.current = Some((ordinal, stage));
    }

    pub(crate) fn record_failure(&mut self, ordinal: String, format: Option<OutputFormat>) {
        self.failed.insert((ordinal, format));
    }
}
