use archiver_core::{Catalog, LessonRef, OrdinalStyle};
use archive_logging::{archive_debug, archive_info};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::decode::{decode_html, DecodeError};
use crate::fetch::Fetcher;
use crate::FetchError;

/// Anchor names in chapter headers look like `Chapter12`.
const CHAPTER_ANCHOR_PREFIX: &str = "Chapter";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid landing url {url}: {message}")]
    InvalidLandingUrl { url: String, message: String },
    #[error("landing page could not be fetched: {0}")]
    Fetch(#[from] FetchError),
    #[error("landing page could not be decoded: {0}")]
    Decode(#[from] DecodeError),
    #[error("landing page contains no chapter tables")]
    NoChapters,
    #[error("chapter #{position} is malformed: {reason}")]
    MalformedChapter { position: usize, reason: String },
    #[error("lesson link {href:?} in chapter {chapter} is not a valid url")]
    InvalidLessonUrl { chapter: String, href: String },
    #[error("invalid selector {0}")]
    Selector(String),
    #[error("page ordinal {0} occurs more than once")]
    DuplicateOrdinal(String),
}

/// CSS selectors describing the landing page structure.
struct CatalogSelectors {
    chapter: Selector,
    header: Selector,
    header_anchor: Selector,
    header_title: Selector,
    lesson_row: Selector,
    anchor: Selector,
}

impl CatalogSelectors {
    fn new() -> Result<Self, CatalogError> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|err| CatalogError::Selector(format!("{css}: {err:?}")))
        };
        Ok(Self {
            chapter: parse("div.lessontable")?,
            header: parse("div.lessontable-header")?,
            header_anchor: parse("a[name]")?,
            header_title: parse("div.lessontable-header-title")?,
            lesson_row: parse("div.lessontable-row-title")?,
            anchor: parse("a")?,
        })
    }
}

/// Fetch the landing page once and build the catalog from it.
pub async fn fetch_catalog(
    fetcher: &dyn Fetcher,
    landing_url: &str,
    style: OrdinalStyle,
) -> Result<Catalog, CatalogError> {
    let base = Url::parse(landing_url).map_err(|err| CatalogError::InvalidLandingUrl {
        url: landing_url.to_string(),
        message: err.to_string(),
    })?;
    let output = fetcher.fetch(base.as_str()).await?;
    build_catalog(
        &output.bytes,
        output.metadata.content_type.as_deref(),
        &base,
        style,
    )
}

/// Turn landing page markup into the ordered lesson catalog.
///
/// Chapters come in document order and lessons in document order within their
/// chapter. Any structural problem fails the whole build; a partial catalog is
/// never returned.
pub fn build_catalog(
    landing_html: &[u8],
    content_type: Option<&str>,
    base_url: &Url,
    style: OrdinalStyle,
) -> Result<Catalog, CatalogError> {
    let decoded = decode_html(landing_html, content_type)?;
    let document = Html::parse_document(&decoded.html);
    let selectors = CatalogSelectors::new()?;

    let mut lessons = Vec::new();
    let mut chapter_count = 0;
    for (position, chapter) in document.select(&selectors.chapter).enumerate() {
        chapter_count += 1;
        let (chapter_index, chapter_title) = read_chapter_header(chapter, &selectors, position + 1)?;
        let chapter_slug = style.chapter_slug(&chapter_index, &chapter_title);
        archive_debug!("chapter {chapter_index} {chapter_title:?} -> {chapter_slug}");

        let mut page_index = 1;
        for row in chapter.select(&selectors.lesson_row) {
            for anchor in row.select(&selectors.anchor) {
                let url = resolve_lesson_url(anchor, base_url, &chapter_slug)?;
                let ordinal = style.page_ordinal(&chapter_index, page_index);
                lessons.push(LessonRef::new(url, chapter_slug.clone(), ordinal));
                page_index += 1;
            }
        }
    }

    if chapter_count == 0 {
        return Err(CatalogError::NoChapters);
    }

    let catalog = Catalog::new(lessons);
    if let Some(ordinal) = catalog.first_duplicate_ordinal() {
        return Err(CatalogError::DuplicateOrdinal(ordinal.to_string()));
    }
    archive_info!(
        "Catalog built: {} lessons in {} chapters",
        catalog.len(),
        chapter_count
    );
    Ok(catalog)
}

fn read_chapter_header(
    chapter: ElementRef<'_>,
    selectors: &CatalogSelectors,
    position: usize,
) -> Result<(String, String), CatalogError> {
    let malformed = |reason: &str| CatalogError::MalformedChapter {
        position,
        reason: reason.to_string(),
    };

    let header = chapter
        .select(&selectors.header)
        .next()
        .ok_or_else(|| malformed("missing header"))?;

    let anchor_name = header
        .select(&selectors.header_anchor)
        .next()
        .and_then(|anchor| anchor.value().attr("name"))
        .ok_or_else(|| malformed("missing chapter anchor"))?;
    let index = anchor_name.replace(CHAPTER_ANCHOR_PREFIX, "").trim().to_string();
    if index.is_empty() {
        return Err(malformed("empty chapter index"));
    }

    let title = header
        .select(&selectors.header_title)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    Ok((index, title))
}

fn resolve_lesson_url(
    anchor: ElementRef<'_>,
    base: &Url,
    chapter_slug: &str,
) -> Result<Url, CatalogError> {
    let href = anchor.value().attr("href").map(str::trim).unwrap_or("");
    let invalid = || CatalogError::InvalidLessonUrl {
        chapter: chapter_slug.to_string(),
        href: href.to_string(),
    };
    if href.is_empty() {
        return Err(invalid());
    }
    let url = Url::parse(href)
        .or_else(|_| base.join(href))
        .map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    Ok(url)
}
