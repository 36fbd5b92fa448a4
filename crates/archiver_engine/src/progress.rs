use std::sync::atomic::{AtomicUsize, Ordering};

use archive_logging::{archive_debug, archive_info, archive_warn};
use archiver_core::{ConversionResultKind, ProgressMsg};

/// Receives progress messages from the pipeline.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, msg: ProgressMsg);
}

/// Reports progress through the log, one line per lesson.
#[derive(Debug, Default)]
pub struct LogProgressSink {
    total: AtomicUsize,
}

impl LogProgressSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for LogProgressSink {
    fn emit(&self, msg: ProgressMsg) {
        match msg {
            ProgressMsg::CatalogReady { lessons, chapters } => {
                self.total.store(lessons, Ordering::Relaxed);
                archive_info!("Found {lessons} lessons in {chapters} chapters");
            }
            ProgressMsg::LessonStarted { index, ordinal } => {
                let total = self.total.load(Ordering::Relaxed);
                archive_info!("Downloading {} of {total} ... ({ordinal})", index + 1);
            }
            ProgressMsg::StageChanged { ordinal, stage } => {
                archive_debug!("{ordinal}: {stage:?}");
            }
            ProgressMsg::HtmlWritten { ordinal } => {
                archive_debug!("{ordinal}: html written");
            }
            ProgressMsg::FetchFailed { ordinal } => {
                archive_warn!("{ordinal}: fetch failed, lesson skipped");
            }
            ProgressMsg::SanitizeFailed { ordinal, kept_raw } => {
                if kept_raw {
                    archive_warn!("{ordinal}: sanitizing failed, raw page kept");
                } else {
                    archive_warn!("{ordinal}: sanitizing failed, lesson skipped");
                }
            }
            ProgressMsg::ConversionDone {
                ordinal,
                format,
                result,
            } => match result {
                ConversionResultKind::Success | ConversionResultKind::SuccessWithDiagnostic => {
                    archive_debug!("{ordinal}: {format} done");
                }
                ConversionResultKind::Failed => archive_warn!("{ordinal}: {format} failed"),
                ConversionResultKind::Cancelled => archive_debug!("{ordinal}: {format} cancelled"),
            },
            ProgressMsg::Cancelled => archive_warn!("Interrupted, waiting for running conversions"),
        }
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _msg: ProgressMsg) {}
}
