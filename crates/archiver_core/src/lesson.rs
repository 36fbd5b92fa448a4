use std::collections::HashSet;

use url::Url;

use crate::slug::{original_slug, sanitize_component};

/// Zero-padding applied to numeric chapter and page indices so that
/// lexicographic filename order matches catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalStyle {
    pub width: usize,
}

impl OrdinalStyle {
    /// No padding: `1-1`, `1-Intro`.
    pub const UNPADDED: OrdinalStyle = OrdinalStyle { width: 0 };

    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Pads purely numeric indices; anything else (appendix letters) is kept verbatim.
    pub fn index(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
            return raw.to_string();
        }
        let digits = raw.trim_start_matches('0');
        let digits = if digits.is_empty() { "0" } else { digits };
        format!("{digits:0>width$}", width = self.width)
    }

    pub fn page_ordinal(&self, chapter_index: &str, page: usize) -> String {
        format!(
            "{}-{}",
            self.index(chapter_index),
            self.index(&page.to_string())
        )
    }

    pub fn chapter_slug(&self, chapter_index: &str, title: &str) -> String {
        let combined = format!("{}-{}", self.index(chapter_index), title.trim());
        sanitize_component(&combined, "chapter")
    }
}

impl Default for OrdinalStyle {
    fn default() -> Self {
        Self { width: 3 }
    }
}

/// One discovered lesson page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LessonRef {
    pub url: Url,
    pub chapter_slug: String,
    pub page_ordinal: String,
    pub original_slug: String,
}

impl LessonRef {
    pub fn new(url: Url, chapter_slug: impl Into<String>, page_ordinal: impl Into<String>) -> Self {
        let original_slug = original_slug(&url);
        Self {
            url,
            chapter_slug: chapter_slug.into(),
            page_ordinal: page_ordinal.into(),
            original_slug,
        }
    }

    /// File stem shared by every output format: `<ordinal>-<original slug>`.
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.page_ordinal, self.original_slug)
    }
}

/// Ordered, immutable list of lessons discovered for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    lessons: Vec<LessonRef>,
}

impl Catalog {
    pub fn new(lessons: Vec<LessonRef>) -> Self {
        Self { lessons }
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn lessons(&self) -> &[LessonRef] {
        &self.lessons
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LessonRef> {
        self.lessons.iter()
    }

    /// Distinct chapter slugs in catalog order.
    pub fn chapters(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.lessons
            .iter()
            .map(|lesson| lesson.chapter_slug.as_str())
            .filter(|slug| seen.insert(*slug))
            .collect()
    }

    pub fn first_duplicate_ordinal(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.lessons.len());
        self.lessons
            .iter()
            .map(|lesson| lesson.page_ordinal.as_str())
            .find(|ordinal| !seen.insert(*ordinal))
    }

    pub fn has_unique_ordinals(&self) -> bool {
        self.first_duplicate_ordinal().is_none()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a LessonRef;
    type IntoIter = std::slice::Iter<'a, LessonRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.lessons.iter()
    }
}
