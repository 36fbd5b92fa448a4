//! Archiver engine: catalog discovery, fetching, sanitizing, conversion and
//! atomic persistence of lesson pages.
mod catalog;
mod config;
mod decode;
mod fetch;
mod format;
mod markdown;
mod pdf;
mod persist;
mod pipeline;
mod pool;
mod progress;
mod sanitize;
mod types;

pub use catalog::{build_catalog, fetch_catalog, CatalogError};
pub use config::{
    EngineConfig, DEFAULT_LANDING_URL, DEFAULT_MAX_CONCURRENT_CONVERSIONS, DEFAULT_TOOL_NAME,
};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use format::{format_markdown, FormatOptions, Wrap};
pub use markdown::{Converter, HeadingStyle, MarkdownConverter, MarkdownOptions};
pub use pdf::{
    classify, is_benign_diagnostic, PdfRenderer, PdfSettings, PdfStatus, RenderError,
    WkhtmltopdfRenderer, BENIGN_RENDERER_DIAGNOSTIC,
};
pub use persist::{ensure_dir, ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{
    ConversionError, ConversionOutput, ConversionReport, Pipeline, PipelineError,
    MANIFEST_FILENAME,
};
pub use pool::{ConversionPool, PoolError};
pub use progress::{LogProgressSink, NullProgressSink, ProgressSink};
pub use sanitize::{SanitizeError, Sanitizer};
pub use types::{
    CanonicalDocument, FailureKind, FetchError, FetchMetadata, FetchOutput, RawDocument,
};
