use crate::{OutputFormat, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionResultKind {
    Success,
    /// Output written; the renderer reported its known-benign diagnostic.
    SuccessWithDiagnostic,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressMsg {
    /// Catalog discovery finished.
    CatalogReady { lessons: usize, chapters: usize },
    /// The driver picked up the lesson at `index` (0-based catalog position).
    LessonStarted { index: usize, ordinal: String },
    /// A lesson moved to a new stage.
    StageChanged { ordinal: String, stage: Stage },
    /// Archival HTML is on disk.
    HtmlWritten { ordinal: String },
    /// The lesson could not be fetched and was skipped.
    FetchFailed { ordinal: String },
    /// Sanitizing failed; `kept_raw` tells whether the unsanitized page was kept.
    SanitizeFailed { ordinal: String, kept_raw: bool },
    /// A pooled conversion finished.
    ConversionDone {
        ordinal: String,
        format: OutputFormat,
        result: ConversionResultKind,
    },
    /// The user interrupted the run.
    Cancelled,
}
