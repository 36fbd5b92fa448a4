use std::path::PathBuf;

use archiver_core::{OrdinalStyle, OutputLayout, RemovalPolicy, RunMode};

use crate::fetch::FetchSettings;
use crate::format::FormatOptions;
use crate::markdown::MarkdownOptions;
use crate::pdf::PdfSettings;

pub const DEFAULT_LANDING_URL: &str = "https://www.learncpp.com";
pub const DEFAULT_TOOL_NAME: &str = "learncpp";
pub const DEFAULT_MAX_CONCURRENT_CONVERSIONS: usize = 192;

/// Everything one archiving run needs to know.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub landing_url: String,
    /// Name of the directory under `output_root` that holds every format.
    pub tool_name: String,
    pub output_root: PathBuf,
    pub mode: RunMode,
    pub ordinal_style: OrdinalStyle,
    pub max_concurrent_conversions: usize,
    pub removal_policy: RemovalPolicy,
    /// Keep the unsanitized page when sanitizing fails instead of skipping the lesson.
    pub keep_raw_on_sanitize_failure: bool,
    pub fetch: FetchSettings,
    pub markdown: MarkdownOptions,
    pub format: FormatOptions,
    pub pdf: PdfSettings,
    /// Write `catalog.json` next to the format directories.
    pub write_manifest: bool,
}

impl EngineConfig {
    pub fn default_with_output(output_root: impl Into<PathBuf>) -> Self {
        Self {
            landing_url: DEFAULT_LANDING_URL.to_string(),
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            output_root: output_root.into(),
            mode: RunMode::default(),
            ordinal_style: OrdinalStyle::default(),
            max_concurrent_conversions: DEFAULT_MAX_CONCURRENT_CONVERSIONS,
            removal_policy: RemovalPolicy::learncpp(),
            keep_raw_on_sanitize_failure: true,
            fetch: FetchSettings::default(),
            markdown: MarkdownOptions::default(),
            format: FormatOptions::default(),
            pdf: PdfSettings::default(),
            write_manifest: true,
        }
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(self.output_root.clone(), self.tool_name.clone())
    }
}
