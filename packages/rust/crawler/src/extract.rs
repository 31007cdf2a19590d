//! Record extraction from catalog and description pages.
//!
//! Three page kinds are understood:
//! - the catalog detail page of an object ([`extract_main`]),
//! - a catalog category page ([`extract_category_page`]),
//! - an external description page ([`extract_description_page`]).
//!
//! Nothing here fails hard: a selector that matches nothing yields an empty value.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use orbitscrape_shared::{NoradId, OrbitScrapeError, Result};

/// Category links on a detail page.
pub const CATEGORY_LINK_SELECTOR: &str = ".arrow a";
/// Candidate links to the external description page.
pub const DESCRIPTION_LINK_SELECTOR: &str = "tbody a";
/// Heading of a category page.
pub const CATEGORY_HEADING_SELECTOR: &str = "h1";
/// Body of a category page.
pub const CATEGORY_TABLE_SELECTOR: &str = "table";
/// Description paragraphs.
pub const PARAGRAPH_SELECTOR: &str = ".urone p";
/// Gallery images next to the description.
pub const GALLERY_IMAGE_SELECTOR: &str = ".urtwo img";

static CATEGORY_LINK: LazyLock<Selector> = LazyLock::new(|| selector(CATEGORY_LINK_SELECTOR));
static DESCRIPTION_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector(DESCRIPTION_LINK_SELECTOR));
static CATEGORY_HEADING: LazyLock<Selector> =
    LazyLock::new(|| selector(CATEGORY_HEADING_SELECTOR));
static CATEGORY_TABLE: LazyLock<Selector> = LazyLock::new(|| selector(CATEGORY_TABLE_SELECTOR));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector(PARAGRAPH_SELECTOR));
static GALLERY_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(GALLERY_IMAGE_SELECTOR));

static TRAILING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]*$").expect("valid trailing digits pattern"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid static selector")
}

// ---------------------------------------------------------------------------
// Detail page
// ---------------------------------------------------------------------------

/// A category link as found on a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    /// Link target as written in the page.
    pub href: String,
    /// Trailing digit run of `href`; empty when there is none.
    pub raw_id: String,
}

impl CategoryRef {
    fn from_href(href: &str) -> Self {
        let raw_id = TRAILING_DIGITS
            .find(href)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Self {
            href: href.to_string(),
            raw_id,
        }
    }

    /// Numeric category id parsed from the trailing digits.
    pub fn id(&self) -> Result<NoradId> {
        self.raw_id.parse().map_err(|e| {
            OrbitScrapeError::extraction(format!("no category id in '{}': {e}", self.href))
        })
    }
}

/// What the detail page tells us about an object.
#[derive(Debug, Clone, Default)]
pub struct MainPage {
    /// Category links in document order.
    pub categories: Vec<CategoryRef>,
    /// First link to the external description page, if any.
    pub description_url: Option<Url>,
}

/// Extract category links and the description link from a detail page.
///
/// The description link is the first `tbody` anchor whose host is
/// `description_domain` or one of its subdomains.
pub fn extract_main(doc: &Html, description_domain: &str) -> MainPage {
    let categories = doc
        .select(&CATEGORY_LINK)
        .filter_map(|el| el.value().attr("href"))
        .map(CategoryRef::from_href)
        .collect();

    let description_url = doc
        .select(&DESCRIPTION_LINK)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| Url::parse(href).ok())
        .find(|url| host_matches(url, description_domain));

    MainPage {
        categories,
        description_url,
    }
}

fn host_matches(url: &Url, domain: &str) -> bool {
    match url.host_str() {
        Some(host) => {
            host.eq_ignore_ascii_case(domain)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Category page
// ---------------------------------------------------------------------------

/// Extract the description text of a category page.
///
/// The heading text anchors the lookup inside the table text; see
/// [`isolate_description`].
pub fn extract_category_page(doc: &Html) -> String {
    let heading: String = doc
        .select(&CATEGORY_HEADING)
        .flat_map(|el| el.text())
        .collect();
    let table: String = doc.select(&CATEGORY_TABLE).flat_map(|el| el.text()).collect();

    isolate_description(&table, &heading)
}

/// Replace `table_text` with the line that follows `heading`.
///
/// Whitespace after the heading, newlines included, is skipped and the next
/// line is taken with its trailing newline. A heading at a line start wins,
/// the last such one first, and the result is that line alone. Otherwise the
/// first occurrence anywhere that is followed by a line is used, and the text
/// before it is kept in front of the line. Without a match the table text
/// comes back unchanged.
pub fn isolate_description(table_text: &str, heading: &str) -> String {
    if heading.is_empty() {
        return table_text.to_string();
    }

    let occurrences: Vec<usize> = table_text
        .char_indices()
        .map(|(i, _)| i)
        .filter(|&i| table_text[i..].starts_with(heading))
        .collect();
    let line_after = |start: usize| line_after_whitespace(&table_text[start + heading.len()..]);

    let at_line_start = occurrences
        .iter()
        .rev()
        .filter(|&&start| start == 0 || table_text.as_bytes()[start - 1] == b'\n')
        .find_map(|&start| line_after(start));
    if let Some(line) = at_line_start {
        return line.to_string();
    }

    occurrences
        .iter()
        .find_map(|&start| line_after(start).map(|line| format!("{}{line}", &table_text[..start])))
        .unwrap_or_else(|| table_text.to_string())
}

fn is_pattern_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

fn line_after_whitespace(text: &str) -> Option<&str> {
    let rest = text.trim_start_matches(is_pattern_space);
    if let Some(nl) = rest.find('\n') {
        return Some(&rest[..=nl]);
    }

    // No newline after the skipped run: the run's own last newline is the line.
    let skipped = &text[..text.len() - rest.len()];
    skipped.contains('\n').then_some("\n")
}

// ---------------------------------------------------------------------------
// Description page
// ---------------------------------------------------------------------------

/// Paragraphs and gallery images of an external description page.
#[derive(Debug, Clone, Default)]
pub struct DescriptionPage {
    /// Non-blank paragraphs, trimmed, in document order.
    pub paragraphs: Vec<String>,
    /// Gallery image URLs in document order, duplicates kept.
    pub image_urls: Vec<Url>,
}

impl DescriptionPage {
    /// Paragraphs joined with single newlines.
    pub fn description(&self) -> String {
        self.paragraphs.join("\n")
    }
}

/// Extract paragraphs and image URLs; relative `src` values resolve against `page_url`.
pub fn extract_description_page(doc: &Html, page_url: &Url) -> DescriptionPage {
    let paragraphs = doc
        .select(&PARAGRAPH)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    let image_urls = doc
        .select(&GALLERY_IMAGE)
        .filter_map(|el| el.value().attr("src"))
        .filter_map(|src| page_url.join(src).ok())
        .collect();

    DescriptionPage {
        paragraphs,
        image_urls,
    }
}

/// Last non-empty path segment of an image URL, usable as a file name.
pub fn image_basename(url: &Url) -> Option<String> {
    let name = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if name == "." || name == ".." || name.contains('\\') {
        return None;
    }
    Some(name.to_string())
}
