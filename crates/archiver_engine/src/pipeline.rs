use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use archive_logging::{archive_debug, archive_error, archive_info, archive_warn};
use archiver_core::{
    update, Catalog, ConversionResultKind, LessonRef, OutputArtifact, OutputFormat, OutputLayout,
    ProgressMsg, RunState, RunView, Stage,
};
use futures_util::FutureExt;
use serde_json::json;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::catalog::{fetch_catalog, CatalogError};
use crate::config::EngineConfig;
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::markdown::{Converter, MarkdownConverter};
use crate::pdf::{PdfRenderer, PdfStatus, RenderError, WkhtmltopdfRenderer};
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::pool::ConversionPool;
use crate::progress::ProgressSink;
use crate::sanitize::Sanitizer;
use crate::{CanonicalDocument, FetchError, RawDocument};

pub const MANIFEST_FILENAME: &str = "catalog.json";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("output directory unusable: {0}")]
    Output(#[from] PersistError),
    #[error("http client could not be created: {0}")]
    Fetcher(#[from] FetchError),
    #[error(
        "interrupted after {} of {} lessons",
        .summary.lessons_started,
        .summary.lessons_total
    )]
    Interrupted { summary: RunView },
}

/// Failure of one lesson/format conversion. Never aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("markdown could not be written: {0}")]
    Markdown(PersistError),
    #[error("pdf rendering failed: {0}")]
    Pdf(RenderError),
    #[error("pdf could not be stored: {0}")]
    Output(PersistError),
    #[error("conversion task failed: {0}")]
    Join(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub artifact: OutputArtifact,
    pub benign_diagnostic: bool,
}

/// What a pooled conversion task hands back to the driver.
#[derive(Debug)]
pub struct ConversionReport {
    pub ordinal: String,
    pub format: OutputFormat,
    pub result: Result<ConversionOutput, ConversionError>,
}

impl ConversionReport {
    pub fn kind(&self) -> ConversionResultKind {
        match &self.result {
            Ok(output) if output.benign_diagnostic => ConversionResultKind::SuccessWithDiagnostic,
            Ok(_) => ConversionResultKind::Success,
            Err(ConversionError::Pdf(RenderError::Cancelled)) => ConversionResultKind::Cancelled,
            Err(_) => ConversionResultKind::Failed,
        }
    }
}

/// Forwards messages to the sink and folds them into the run state.
struct Tracker<'a> {
    sink: &'a dyn ProgressSink,
    state: RunState,
}

impl<'a> Tracker<'a> {
    fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            state: RunState::new(),
        }
    }

    fn emit(&mut self, msg: ProgressMsg) {
        self.sink.emit(msg.clone());
        self.state = update(std::mem::take(&mut self.state), msg);
    }

    fn stage(&mut self, lesson: &LessonRef, stage: Stage) {
        self.emit(ProgressMsg::StageChanged {
            ordinal: lesson.page_ordinal.clone(),
            stage,
        });
    }

    fn record(&mut self, joined: Result<ConversionReport, JoinError>) {
        let report = match joined {
            Ok(report) => report,
            Err(err) => {
                // Tasks catch their own panics, so only an aborted task ends up here.
                archive_error!("Conversion task aborted: {err}");
                return;
            }
        };
        let result = report.kind();
        match &report.result {
            Ok(output) => archive_debug!("{}: wrote {:?}", report.ordinal, output.artifact.path),
            Err(ConversionError::Pdf(RenderError::Cancelled)) => {}
            Err(err) => archive_warn!("{}: {} conversion failed: {err}", report.ordinal, report.format),
        }
        self.emit(ProgressMsg::ConversionDone {
            ordinal: report.ordinal,
            format: report.format,
            result,
        });
    }

    fn view(&self) -> RunView {
        self.state.view()
    }
}

/// Drives one archiving run: catalog, fetch, sanitize, archival HTML, then
/// pooled conversions.
pub struct Pipeline {
    config: EngineConfig,
    fetcher: Arc<dyn Fetcher>,
    renderer: Arc<dyn PdfRenderer>,
    sanitizer: Sanitizer,
    converter: Arc<MarkdownConverter>,
}

impl Pipeline {
    pub fn new(
        config: EngineConfig,
        fetcher: Arc<dyn Fetcher>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        let sanitizer = Sanitizer::new(config.removal_policy.clone());
        let converter = Arc::new(MarkdownConverter::new(
            config.markdown.clone(),
            config.format,
        ));
        Self {
            config,
            fetcher,
            renderer,
            sanitizer,
            converter,
        }
    }

    /// Pipeline with the reqwest fetcher and the wkhtmltopdf renderer.
    pub fn from_config(config: EngineConfig) -> Result<Self, PipelineError> {
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone())?);
        let renderer = Arc::new(WkhtmltopdfRenderer::new(config.pdf.clone()));
        Ok(Self::new(config, fetcher, renderer))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn build_catalog(&self) -> Result<Catalog, CatalogError> {
        fetch_catalog(
            self.fetcher.as_ref(),
            &self.config.landing_url,
            self.config.ordinal_style,
        )
        .await
    }

    pub async fn run_from_landing(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RunView, PipelineError> {
        archive_info!("Reading catalog from {}", self.config.landing_url);
        let catalog = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(PipelineError::Interrupted {
                    summary: RunView {
                        cancelled: true,
                        ..RunView::default()
                    },
                });
            }
            catalog = self.build_catalog() => catalog?,
        };
        self.run(&catalog, sink, cancel).await
    }

    pub async fn run(
        &self,
        catalog: &Catalog,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RunView, PipelineError> {
        let layout = self.config.layout();
        ensure_output_dir(&layout.tool_dir())?;

        let mut tracker = Tracker::new(sink);
        tracker.emit(ProgressMsg::CatalogReady {
            lessons: catalog.len(),
            chapters: catalog.chapters().len(),
        });

        let mut pool = ConversionPool::new(self.config.max_concurrent_conversions);
        let formats = self.config.mode.conversion_formats();

        for (index, lesson) in catalog.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            tracker.emit(ProgressMsg::LessonStarted {
                index,
                ordinal: lesson.page_ordinal.clone(),
            });
            for joined in pool.try_collect() {
                tracker.record(joined);
            }

            let Some(document) = self
                .archive_lesson(lesson, &layout, &mut tracker, cancel)
                .await
            else {
                continue;
            };

            if !formats.is_empty() {
                tracker.stage(lesson, Stage::Converting);
            }
            for &format in formats {
                let task = self.conversion_task(format, document.clone(), &layout, cancel);
                if let Err(err) = pool.submit(task, cancel).await {
                    archive_debug!("{}: {format} not submitted: {err}", lesson.page_ordinal);
                    break;
                }
            }
            tracker.stage(lesson, Stage::Done);
        }

        if cancel.is_cancelled() {
            tracker.emit(ProgressMsg::Cancelled);
        }
        archive_debug!("Waiting for {} pending conversions", pool.pending());
        for joined in pool.drain().await {
            tracker.record(joined);
        }
        // Ctrl-C may arrive while the last conversions are still running.
        if cancel.is_cancelled() && !tracker.view().cancelled {
            tracker.emit(ProgressMsg::Cancelled);
        }

        let summary = tracker.view();
        if summary.cancelled {
            return Err(PipelineError::Interrupted { summary });
        }
        if self.config.write_manifest {
            if let Err(err) = self.write_manifest(catalog, &layout) {
                archive_warn!("Could not write {MANIFEST_FILENAME}: {err}");
            }
        }
        archive_info!(
            "Archived {} of {} lessons ({} conversions, {} failed)",
            summary.html_written,
            summary.lessons_total,
            summary.conversions_succeeded,
            summary.conversions_failed
        );
        Ok(summary)
    }

    /// Fetch one lesson and leave its archival HTML on disk.
    ///
    /// Returns the document to convert, or `None` when the lesson was skipped
    /// or the run was cancelled mid-fetch.
    async fn archive_lesson(
        &self,
        lesson: &LessonRef,
        layout: &OutputLayout,
        tracker: &mut Tracker<'_>,
        cancel: &CancellationToken,
    ) -> Option<CanonicalDocument> {
        let ordinal = lesson.page_ordinal.clone();
        tracker.stage(lesson, Stage::Fetching);
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = self.fetcher.fetch(lesson.url.as_str()) => result,
        };
        let output = match fetched {
            Ok(output) => output,
            Err(err) => {
                archive_warn!("{ordinal}: could not fetch {}: {err}", lesson.url);
                tracker.emit(ProgressMsg::FetchFailed { ordinal });
                return None;
            }
        };
        let raw = RawDocument::new(lesson.clone(), output);

        let writer = AtomicFileWriter::new(layout.chapter_dir(OutputFormat::Html, lesson));
        let file_name = layout.file_name(OutputFormat::Html, lesson);
        tracker.stage(lesson, Stage::WritingHtml);
        if let Err(err) = writer.write(&file_name, &raw.bytes) {
            html_write_failed(tracker, &ordinal, &err);
            return None;
        }

        tracker.stage(lesson, Stage::Sanitizing);
        let document = match self.sanitizer.clean(&raw) {
            Ok(document) => {
                if let Err(err) = writer.write(&file_name, document.to_archival_html()) {
                    html_write_failed(tracker, &ordinal, &err);
                    return None;
                }
                document
            }
            Err(err) if self.config.keep_raw_on_sanitize_failure => {
                archive_warn!("{ordinal}: {err}; keeping the unsanitized page");
                tracker.emit(ProgressMsg::SanitizeFailed {
                    ordinal: ordinal.clone(),
                    kept_raw: true,
                });
                CanonicalDocument {
                    lesson: lesson.clone(),
                    html: String::from_utf8_lossy(&raw.bytes).into_owned(),
                }
            }
            Err(err) => {
                archive_warn!("{ordinal}: {err}; lesson skipped");
                if let Err(err) = writer.remove(&file_name) {
                    archive_warn!("{ordinal}: could not remove unsanitized page: {err}");
                }
                tracker.emit(ProgressMsg::SanitizeFailed {
                    ordinal,
                    kept_raw: false,
                });
                return None;
            }
        };

        tracker.emit(ProgressMsg::HtmlWritten { ordinal });
        Some(document)
    }

    fn conversion_task(
        &self,
        format: OutputFormat,
        document: CanonicalDocument,
        layout: &OutputLayout,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ConversionReport> + Send + 'static {
        let ordinal = document.lesson.page_ordinal.clone();
        let artifact = layout.artifact(format, &document.lesson);
        let writer = AtomicFileWriter::new(layout.chapter_dir(format, &document.lesson));
        let file_name = layout.file_name(format, &document.lesson);
        let html_path = layout.path_for(OutputFormat::Html, &document.lesson);
        let converter = Arc::clone(&self.converter);
        let renderer = Arc::clone(&self.renderer);
        let cancel = cancel.clone();

        async move {
            let work = async {
                match format {
                    OutputFormat::Markdown => {
                        write_markdown(converter, document, writer, file_name).await
                    }
                    OutputFormat::Pdf => {
                        render_pdf(renderer.as_ref(), &html_path, &writer, &file_name, &cancel)
                            .await
                    }
                    OutputFormat::Html => Ok(false),
                }
            };
            // A panicking converter still reports against its lesson and format.
            let benign = AssertUnwindSafe(work)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ConversionError::Join(panic_message(panic.as_ref()))));
            ConversionReport {
                ordinal,
                format,
                result: benign.map(|benign_diagnostic| ConversionOutput {
                    artifact,
                    benign_diagnostic,
                }),
            }
        }
    }

    fn write_manifest(&self, catalog: &Catalog, layout: &OutputLayout) -> Result<PathBuf, PersistError> {
        let formats = self.config.mode.formats();
        let lessons: Vec<_> = catalog
            .iter()
            .map(|lesson| {
                let files: serde_json::Map<String, serde_json::Value> = formats
                    .iter()
                    .map(|&format| {
                        (
                            format.to_string(),
                            json!(layout.relative_path(format, lesson)),
                        )
                    })
                    .collect();
                json!({
                    "ordinal": lesson.page_ordinal,
                    "chapter": lesson.chapter_slug,
                    "slug": lesson.original_slug,
                    "url": lesson.url.as_str(),
                    "files": files,
                })
            })
            .collect();
        let manifest = json!({
            "landing_url": self.config.landing_url,
            "lesson_count": catalog.len(),
            "lessons": lessons,
        });
        let content = serde_json::to_vec_pretty(&manifest)
            .map_err(|err| PersistError::Io(std::io::Error::other(err)))?;
        AtomicFileWriter::new(layout.tool_dir()).write(MANIFEST_FILENAME, content)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("no message");
    format!("conversion panicked: {detail}")
}

fn html_write_failed(tracker: &mut Tracker<'_>, ordinal: &str, err: &PersistError) {
    archive_error!("{ordinal}: could not write html: {err}");
    tracker.emit(ProgressMsg::ConversionDone {
        ordinal: ordinal.to_string(),
        format: OutputFormat::Html,
        result: ConversionResultKind::Failed,
    });
}

async fn write_markdown(
    converter: Arc<MarkdownConverter>,
    document: CanonicalDocument,
    writer: AtomicFileWriter,
    file_name: String,
) -> Result<bool, ConversionError> {
    let written = tokio::task::spawn_blocking(move || {
        let markdown = converter.to_markdown(&document.html, Some(document.lesson.url.as_str()));
        writer.write(&file_name, markdown)
    })
    .await;
    match written {
        Ok(Ok(_)) => Ok(false),
        Ok(Err(err)) => Err(ConversionError::Markdown(err)),
        Err(err) => Err(ConversionError::Join(err.to_string())),
    }
}

/// Render into a temp file next to the target and rename it on success. A
/// failed or cancelled render drops the temp file. Returns whether the
/// renderer printed its benign diagnostic.
async fn render_pdf(
    renderer: &dyn PdfRenderer,
    source: &Path,
    writer: &AtomicFileWriter,
    file_name: &str,
    cancel: &CancellationToken,
) -> Result<bool, ConversionError> {
    let tmp = writer.temp_file(".pdf").map_err(ConversionError::Output)?;
    let status = renderer
        .render(source, tmp.path(), cancel)
        .await
        .map_err(ConversionError::Pdf)?;
    writer.persist(tmp, file_name).map_err(ConversionError::Output)?;
    Ok(status == PdfStatus::RenderedWithBenignDiagnostic)
}
