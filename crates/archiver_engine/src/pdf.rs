//! PDF rendering through an external HTML-to-PDF binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use archive_logging::archive_debug;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Printed by wkhtmltopdf on pages that load external resources. The PDF it
/// produces is complete.
pub const BENIGN_RENDERER_DIAGNOSTIC: &str =
    "QNetworkReplyImplPrivate::error: Internal problem, this method must only be called once.";

/// True when the known harmless diagnostic appears anywhere in stderr. Load
/// warnings printed next to it do not change that.
pub fn is_benign_diagnostic(stderr: &str) -> bool {
    stderr
        .lines()
        .any(|line| line.contains(BENIGN_RENDERER_DIAGNOSTIC))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfStatus {
    Rendered,
    RenderedWithBenignDiagnostic,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("could not start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("renderer produced no output")]
    EmptyOutput,
    #[error("render cancelled")]
    Cancelled,
    #[error("renderer did not finish within {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct PdfSettings {
    pub binary: PathBuf,
    pub enable_local_file_access: bool,
    pub extra_args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("wkhtmltopdf"),
            enable_local_file_access: true,
            extra_args: Vec::new(),
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Renders one HTML file on disk into a PDF at `target`.
#[async_trait::async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(
        &self,
        source: &Path,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<PdfStatus, RenderError>;
}

#[derive(Debug, Clone, Default)]
pub struct WkhtmltopdfRenderer {
    settings: PdfSettings,
}

impl WkhtmltopdfRenderer {
    pub fn new(settings: PdfSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PdfSettings {
        &self.settings
    }

    fn command(&self, source: &Path, target: &Path) -> Command {
        let mut command = Command::new(&self.settings.binary);
        command.arg("--quiet");
        if self.settings.enable_local_file_access {
            command.arg("--enable-local-file-access");
        }
        command
            .args(&self.settings.extra_args)
            .arg(source)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait::async_trait]
impl PdfRenderer for WkhtmltopdfRenderer {
    async fn render(
        &self,
        source: &Path,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<PdfStatus, RenderError> {
        let child = self
            .command(source, target)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                binary: self.settings.binary.display().to_string(),
                source,
            })?;

        // Dropping the output future kills the child.
        let output = child.wait_with_output();
        let output = match self.settings.timeout {
            Some(limit) => tokio::select! {
                _ = cancel.cancelled() => return Err(RenderError::Cancelled),
                result = tokio::time::timeout(limit, output) => {
                    result.map_err(|_| RenderError::Timeout(limit))??
                }
            },
            None => tokio::select! {
                _ = cancel.cancelled() => return Err(RenderError::Cancelled),
                result = output => result?,
            },
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        archive_debug!("renderer finished for {:?}: {}", source, output.status);
        let status = classify(output.status.success(), output.status.code(), &stderr)?;
        let written = tokio::fs::metadata(target).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(RenderError::EmptyOutput);
        }
        Ok(status)
    }
}

/// Map renderer exit status and stderr to a render result.
///
/// wkhtmltopdf exits with 1 when it only hit the benign diagnostic, so a
/// failing status is accepted in that case.
pub fn classify(success: bool, code: Option<i32>, stderr: &str) -> Result<PdfStatus, RenderError> {
    let stderr = stderr.trim();
    if is_benign_diagnostic(stderr) {
        return Ok(PdfStatus::RenderedWithBenignDiagnostic);
    }
    if success {
        return Ok(PdfStatus::Rendered);
    }
    Err(RenderError::Failed {
        status: code,
        stderr: stderr.to_string(),
    })
}
