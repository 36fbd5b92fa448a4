use std::fmt;
use std::path::{Path, PathBuf};

use crate::LessonRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputFormat {
    Html,
    Markdown,
    Pdf,
}

impl OutputFormat {
    pub fn dir_name(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Pdf => write!(f, "pdf"),
        }
    }
}

/// Which formats a run produces. Archival HTML is always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    HtmlOnly,
    #[default]
    HtmlPdf,
    HtmlMarkdown,
}

impl RunMode {
    /// Formats handed to the conversion pool for every lesson.
    pub fn conversion_formats(self) -> &'static [OutputFormat] {
        match self {
            RunMode::HtmlOnly => &[],
            RunMode::HtmlPdf => &[OutputFormat::Pdf],
            RunMode::HtmlMarkdown => &[OutputFormat::Markdown],
        }
    }

    pub fn formats(self) -> Vec<OutputFormat> {
        let mut formats = vec![OutputFormat::Html];
        formats.extend_from_slice(self.conversion_formats());
        formats
    }
}

/// One file a run produces. Written once through a temp file and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputArtifact {
    pub chapter_slug: String,
    pub page_ordinal: String,
    pub format: OutputFormat,
    pub path: PathBuf,
}

/// `<root>/<tool_name>/<format>/<chapter_slug>/<ordinal>-<slug>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    tool_name: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, tool_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            tool_name: tool_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tool_dir(&self) -> PathBuf {
        self.root.join(&self.tool_name)
    }

    pub fn chapter_dir(&self, format: OutputFormat, lesson: &LessonRef) -> PathBuf {
        self.tool_dir()
            .join(format.dir_name())
            .join(&lesson.chapter_slug)
    }

    pub fn file_name(&self, format: OutputFormat, lesson: &LessonRef) -> String {
        format!("{}.{}", lesson.file_stem(), format.extension())
    }

    pub fn path_for(&self, format: OutputFormat, lesson: &LessonRef) -> PathBuf {
        self.chapter_dir(format, lesson)
            .join(self.file_name(format, lesson))
    }

    pub fn artifact(&self, format: OutputFormat, lesson: &LessonRef) -> OutputArtifact {
        OutputArtifact {
            chapter_slug: lesson.chapter_slug.clone(),
            page_ordinal: lesson.page_ordinal.clone(),
            format,
            path: self.path_for(format, lesson),
        }
    }

    /// Path relative to the tool directory, with `/` separators, for manifests.
    pub fn relative_path(&self, format: OutputFormat, lesson: &LessonRef) -> String {
        format!(
            "{}/{}/{}",
            format.dir_name(),
            lesson.chapter_slug,
            self.file_name(format, lesson)
        )
    }
}
