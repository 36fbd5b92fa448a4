use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use archiver_core::{
    Catalog, LessonRef, OrdinalStyle, OutputFormat, ProgressMsg, RunMode, Url,
};
use archiver_engine::{
    EngineConfig, FetchError, FetchMetadata, FetchOutput, FetchSettings, Fetcher,
    NullProgressSink, PdfRenderer, PdfStatus, Pipeline, PipelineError, ProgressSink, RenderError,
    ReqwestFetcher, MANIFEST_FILENAME,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LANDING: &str = r#"<html><body>
<div class="lessontable">
  <div class="lessontable-header"><a name="Chapter1"></a>
    <div class="lessontable-header-title">Intro</div></div>
  <div class="lessontable-row-title"><a href="/cpp-tutorial/statements/">Statements</a></div>
  <div class="lessontable-row-title"><a href="/cpp-tutorial/comments/">Comments</a></div>
</div>
<div class="lessontable">
  <div class="lessontable-header"><a name="Chapter2"></a>
    <div class="lessontable-header-title">Control Flow</div></div>
  <div class="lessontable-row-title"><a href="/cpp-tutorial/if-statements/">If</a></div>
</div>
</body></html>"#;

fn lesson_page(title: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body>
<div id="site-header-main">menu</div>
<h1>{title}</h1><p>Body of {title}.</p><pre>int x{{ 5 }};</pre>
<div id="comments"><p>reader comment</p></div>
</body></html>"#
    )
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<ProgressMsg>>,
}

impl RecordingSink {
    fn started(&self) -> Vec<usize> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|msg| match msg {
                ProgressMsg::LessonStarted { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, msg: ProgressMsg) {
        self.messages.lock().unwrap().push(msg);
    }
}

/// Writes a fake PDF, except for lessons whose file name contains `fail_on`.
struct FakeRenderer {
    fail_on: Option<&'static str>,
}

#[async_trait::async_trait]
impl PdfRenderer for FakeRenderer {
    async fn render(
        &self,
        source: &Path,
        target: &Path,
        _cancel: &CancellationToken,
    ) -> Result<PdfStatus, RenderError> {
        let name = source.file_name().unwrap().to_string_lossy().to_string();
        if self.fail_on.is_some_and(|needle| name.contains(needle)) {
            return Err(RenderError::Failed {
                status: Some(1),
                stderr: "Error: Failed loading page".to_string(),
            });
        }
        let html = fs::read_to_string(source)?;
        fs::write(target, format!("%PDF-1.4 {}", html.len()))?;
        Ok(PdfStatus::RenderedWithBenignDiagnostic)
    }
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(LANDING, "text/html; charset=utf-8"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cpp-tutorial/statements/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(lesson_page("Statements"), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cpp-tutorial/comments/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cpp-tutorial/if-statements/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(lesson_page("If statements"), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn config(server: &MockServer, root: &Path, mode: RunMode) -> EngineConfig {
    let mut config = EngineConfig::default_with_output(root);
    config.landing_url = format!("{}/", server.uri());
    config.mode = mode;
    config.ordinal_style = OrdinalStyle::UNPADDED;
    config.max_concurrent_conversions = 2;
    config
}

fn pipeline(config: EngineConfig, renderer: Arc<dyn PdfRenderer>) -> Pipeline {
    let fetcher = Arc::new(ReqwestFetcher::new(FetchSettings::default()).unwrap());
    Pipeline::new(config, fetcher, renderer)
}

fn temp_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            found.extend(temp_files(&path));
        } else if entry.file_name().to_string_lossy().starts_with(".tmp-") {
            found.push(path);
        }
    }
    found
}

#[tokio::test]
async fn markdown_run_archives_every_reachable_lesson() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let out = TempDir::new().unwrap();
    let pipeline = pipeline(
        config(&server, out.path(), RunMode::HtmlMarkdown),
        Arc::new(FakeRenderer { fail_on: None }),
    );
    let sink = RecordingSink::default();

    let view = pipeline
        .run_from_landing(&sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(view.lessons_total, 3);
    assert_eq!(view.chapters_total, 2);
    assert_eq!(view.html_written, 2);
    assert_eq!(view.fetch_failures, 1);
    assert_eq!(view.conversions_succeeded, 2);
    assert_eq!(view.failures, vec![("1-2".to_string(), None)]);
    assert_eq!(sink.started(), vec![0, 1, 2]);

    let tool = out.path().join("learncpp");
    let html = fs::read_to_string(tool.join("html/1-Intro/1-1-statements.html")).unwrap();
    assert!(html.contains("<h1>Statements</h1>"));
    assert!(!html.contains("reader comment"));
    assert!(!html.contains("menu"));
    assert!(!tool.join("html/1-Intro/1-2-comments.html").exists());

    let markdown = fs::read_to_string(tool.join("md/2-Control_Flow/2-1-if-statements.md")).unwrap();
    assert_eq!(
        markdown,
        "# If statements\n\nBody of If statements.\n\n```cpp\nint x{ 5 };\n```\n"
    );
    assert!(!tool.join("pdf").exists());

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(tool.join(MANIFEST_FILENAME)).unwrap()).unwrap();
    assert_eq!(manifest["lesson_count"], 3);
    assert_eq!(manifest["lessons"][2]["ordinal"], "2-1");
    assert_eq!(
        manifest["lessons"][2]["files"]["markdown"],
        "md/2-Control_Flow/2-1-if-statements.md"
    );
    assert!(temp_files(out.path()).is_empty());
}

#[tokio::test]
async fn pdf_failures_are_scoped_to_one_lesson() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    // Every lesson is reachable in this run.
    Mock::given(method("GET"))
        .and(path("/cpp-tutorial/comments/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(lesson_page("Comments"), "text/html"),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    let out = TempDir::new().unwrap();
    let pipeline = pipeline(
        config(&server, out.path(), RunMode::HtmlPdf),
        Arc::new(FakeRenderer { fail_on: Some("comments") }),
    );

    let view = pipeline
        .run_from_landing(&NullProgressSink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(view.html_written, 3);
    assert_eq!(view.conversions_succeeded, 2);
    assert_eq!(view.benign_diagnostics, 2);
    assert_eq!(view.conversions_failed, 1);
    assert_eq!(
        view.failures,
        vec![("1-2".to_string(), Some(OutputFormat::Pdf))]
    );

    let pdf = out.path().join("learncpp/pdf");
    assert!(pdf.join("1-Intro/1-1-statements.pdf").is_file());
    assert!(pdf.join("2-Control_Flow/2-1-if-statements.pdf").is_file());
    assert!(!pdf.join("1-Intro/1-2-comments.pdf").exists());
    assert!(temp_files(out.path()).is_empty());
}

#[tokio::test]
async fn undecodable_page_keeps_raw_html_by_default() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    Mock::given(method("GET"))
        .and(path("/cpp-tutorial/statements/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"<p>bad \xff\xfd bytes</p>".to_vec(), "text/html; charset=utf-8"),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    let out = TempDir::new().unwrap();
    let pipeline = pipeline(
        config(&server, out.path(), RunMode::HtmlOnly),
        Arc::new(FakeRenderer { fail_on: None }),
    );

    let view = pipeline
        .run_from_landing(&NullProgressSink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(view.sanitize_fallbacks, 1);
    assert_eq!(view.html_written, 2);
    let raw = fs::read(out.path().join("learncpp/html/1-Intro/1-1-statements.html")).unwrap();
    assert_eq!(raw, b"<p>bad \xff\xfd bytes</p>");
}

#[tokio::test]
async fn undecodable_page_is_skipped_when_raw_fallback_is_off() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    Mock::given(method("GET"))
        .and(path("/cpp-tutorial/statements/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"<p>bad \xff\xfd bytes</p>".to_vec(), "text/html; charset=utf-8"),
        )
        .with_priority(1)
        .mount(&server)
        .await;
    let out = TempDir::new().unwrap();
    let mut config = config(&server, out.path(), RunMode::HtmlMarkdown);
    config.keep_raw_on_sanitize_failure = false;
    let pipeline = pipeline(config, Arc::new(FakeRenderer { fail_on: None }));

    let view = pipeline
        .run_from_landing(&NullProgressSink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(view.sanitize_skips, 1);
    assert!(view.failures.contains(&("1-1".to_string(), None)));
    let tool = out.path().join("learncpp");
    assert!(!tool.join("html/1-Intro/1-1-statements.html").exists());
    assert!(!tool.join("md/1-Intro/1-1-statements.md").exists());
}

#[tokio::test]
async fn broken_landing_page_fails_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>down for maintenance</p>", "text/html"))
        .mount(&server)
        .await;
    let out = TempDir::new().unwrap();
    let pipeline = pipeline(
        config(&server, out.path(), RunMode::HtmlOnly),
        Arc::new(FakeRenderer { fail_on: None }),
    );

    let err = pipeline
        .run_from_landing(&NullProgressSink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Catalog(_)));
}

#[tokio::test]
async fn unwritable_output_root_is_reported() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let blocker = out.path().join("file");
    fs::write(&blocker, "not a directory").unwrap();
    let pipeline = pipeline(
        config(&server, &blocker, RunMode::HtmlOnly),
        Arc::new(FakeRenderer { fail_on: None }),
    );

    let err = pipeline
        .run(&Catalog::default(), &NullProgressSink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Output(_)));
}

/// Serves a fixed page and cancels the run on the second request.
struct CancellingFetcher {
    calls: AtomicUsize,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl Fetcher for CancellingFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == 2 {
            self.cancel.cancel();
            std::future::pending::<()>().await;
        }
        let body = lesson_page("Lesson");
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                content_type: Some("text/html".to_string()),
                byte_len: body.len() as u64,
            },
            bytes: body.into(),
        })
    }
}

#[tokio::test]
async fn cancellation_stops_new_fetches_and_reports_interrupt() {
    let out = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let fetcher = Arc::new(CancellingFetcher {
        calls: AtomicUsize::new(0),
        cancel: cancel.clone(),
    });
    let mut config = EngineConfig::default_with_output(out.path());
    config.mode = RunMode::HtmlMarkdown;
    let pipeline = Pipeline::new(config, fetcher.clone(), Arc::new(FakeRenderer { fail_on: None }));

    let catalog = Catalog::new(
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, slug)| {
                let url = Url::parse(&format!("https://www.learncpp.com/cpp-tutorial/{slug}/")).unwrap();
                LessonRef::new(url, "001-Intro", format!("001-{:03}", i + 1))
            })
            .collect(),
    );

    let err = pipeline
        .run(&catalog, &NullProgressSink, &cancel)
        .await
        .unwrap_err();
    let summary = match err {
        PipelineError::Interrupted { summary } => summary,
        other => panic!("expected an interrupted run, got {other:?}"),
    };
    assert!(summary.cancelled);
    assert_eq!(summary.html_written, 1);
    assert_eq!(summary.lessons_started, 2);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

    let tool = out.path().join("learncpp");
    assert!(tool.join("md/001-Intro/001-001-a.md").is_file());
    assert!(!tool.join("html/001-Intro/001-002-b.html").exists());
    assert!(!tool.join(MANIFEST_FILENAME).exists());
    assert!(temp_files(out.path()).is_empty());
}

/// Serves the same lesson page for every URL.
struct StaticFetcher;

#[async_trait::async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let body = lesson_page("Lesson");
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                content_type: Some("text/html".to_string()),
                byte_len: body.len() as u64,
            },
            bytes: body.into(),
        })
    }
}

fn single_lesson_catalog() -> Catalog {
    let url = Url::parse("https://www.learncpp.com/cpp-tutorial/variables/").unwrap();
    Catalog::new(vec![LessonRef::new(url, "001-Intro", "001-001")])
}

/// Stands in for a renderer killed by Ctrl-C after the driver loop finished.
struct InterruptedRenderer {
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl PdfRenderer for InterruptedRenderer {
    async fn render(
        &self,
        _source: &Path,
        _target: &Path,
        _cancel: &CancellationToken,
    ) -> Result<PdfStatus, RenderError> {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        self.cancel.cancel();
        Err(RenderError::Cancelled)
    }
}

#[tokio::test]
async fn interrupt_while_draining_conversions_is_reported() {
    let out = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let mut config = EngineConfig::default_with_output(out.path());
    config.mode = RunMode::HtmlPdf;
    let pipeline = Pipeline::new(
        config,
        Arc::new(StaticFetcher),
        Arc::new(InterruptedRenderer {
            cancel: cancel.clone(),
        }),
    );
    let sink = RecordingSink::default();

    let err = pipeline
        .run(&single_lesson_catalog(), &sink, &cancel)
        .await
        .unwrap_err();
    let summary = match err {
        PipelineError::Interrupted { summary } => summary,
        other => panic!("expected an interrupted run, got {other:?}"),
    };
    assert!(summary.cancelled);
    assert_eq!(summary.html_written, 1);
    assert_eq!(summary.conversions_cancelled, 1);
    let cancelled_msgs = sink
        .messages
        .lock()
        .unwrap()
        .iter()
        .filter(|msg| **msg == ProgressMsg::Cancelled)
        .count();
    assert_eq!(cancelled_msgs, 1);

    let tool = out.path().join("learncpp");
    assert!(tool.join("html/001-Intro/001-001-variables.html").is_file());
    assert!(!tool.join("pdf/001-Intro/001-001-variables.pdf").exists());
    assert!(!tool.join(MANIFEST_FILENAME).exists());
    assert!(temp_files(out.path()).is_empty());
}

struct PanickingRenderer;

#[async_trait::async_trait]
impl PdfRenderer for PanickingRenderer {
    async fn render(
        &self,
        _source: &Path,
        _target: &Path,
        _cancel: &CancellationToken,
    ) -> Result<PdfStatus, RenderError> {
        panic!("renderer crashed");
    }
}

#[tokio::test]
async fn panicking_conversion_counts_as_a_failure() {
    let out = TempDir::new().unwrap();
    let mut config = EngineConfig::default_with_output(out.path());
    config.mode = RunMode::HtmlPdf;
    let pipeline = Pipeline::new(config, Arc::new(StaticFetcher), Arc::new(PanickingRenderer));

    let view = pipeline
        .run(
            &single_lesson_catalog(),
            &NullProgressSink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(view.html_written, 1);
    assert_eq!(view.conversions_failed, 1);
    assert_eq!(
        view.failures,
        vec![("001-001".to_string(), Some(OutputFormat::Pdf))]
    );
    assert!(!view.is_clean());
    assert!(temp_files(out.path()).is_empty());
}
