use archiver_core::LessonRef;
use bytes::Bytes;

/// Body and response details of one successful GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    /// URL as requested.
    pub original_url: String,
    /// URL after redirects.
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

/// Why one page could not be retrieved. Never fatal for a lesson run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn too_large(max_bytes: u64, actual: u64) -> Self {
        Self::new(
            FailureKind::TooLarge {
                max_bytes,
                actual: Some(actual),
            },
            format!("{actual} bytes"),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("invalid url")]
    InvalidUrl,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timed out")]
    Timeout,
    #[error("page larger than {max_bytes} bytes")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    #[error("unsupported content type {content_type}")]
    UnsupportedContentType { content_type: String },
    #[error("network error")]
    Network,
}

/// Bytes fetched for one lesson, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub lesson: LessonRef,
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl RawDocument {
    pub fn new(lesson: LessonRef, output: FetchOutput) -> Self {
        Self {
            lesson,
            bytes: output.bytes,
            content_type: output.metadata.content_type,
        }
    }
}

/// Sanitized markup for one lesson, owned by exactly one processing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalDocument {
    pub lesson: LessonRef,
    pub html: String,
}

impl CanonicalDocument {
    /// Archival HTML is the canonical markup itself.
    pub fn to_archival_html(&self) -> &[u8] {
        self.html.as_bytes()
    }
}
