//! Gallery page glue — id extraction, seed scraping, title handling
//!
//! Everything in this module deals with the gallery site itself rather than
//! the image mirrors: pulling the gallery id out of a user-supplied URL,
//! scraping thumbnail references (the pattern seeds) and the title out of
//! page markup, and making titles safe to use in filenames. The discovery
//! and fetch machinery is agnostic to all of it.

use crate::error::{Error, Result};
use regex::Regex;

/// Maximum filename length produced by [`sanitize_title`]
const MAX_TITLE_CHARS: usize = 255;

/// Extract the numeric gallery id from a gallery URL.
///
/// Accepts the canonical `/g/<id>/` shape anywhere in the URL; as a
/// fallback, the last all-digit path segment is used. Anything else is
/// [`Error::InvalidGalleryUrl`].
pub fn extract_gallery_id(url: &str) -> Result<String> {
    #[allow(clippy::expect_used)]
    let canonical = Regex::new(r"/g/(\d+)").expect("gallery id regex is valid");
    if let Some(captures) = canonical.captures(url) {
        return Ok(captures[1].to_string());
    }

    for part in url.trim_end_matches('/').rsplit('/') {
        if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
            return Ok(part.to_string());
        }
    }

    Err(Error::InvalidGalleryUrl(url.to_string()))
}

/// True if `url` points at a gallery page on the configured site.
pub fn is_gallery_url(url: &str, page_base_url: &str) -> bool {
    let host = page_base_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    if host.is_empty() {
        return false;
    }
    let normalized = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    normalized.contains(&format!("{host}/g/"))
}

/// Canonical gallery page URL for an id.
pub fn gallery_page_url(page_base_url: &str, gallery_id: &str) -> String {
    format!("{}/g/{}/", page_base_url.trim_end_matches('/'), gallery_id)
}

/// Scrape pattern seeds out of gallery page markup.
///
/// Thumbnails reference the mirrors directly, e.g.
/// `http://i4.nhentaimg.com/016/y3v5c6xhgf/cover.jpg`; the
/// `<numeric-directory>/<id>` fragment between host and filename is the
/// seed. The mirror host is matched from `host_pattern` with `{n}` standing
/// for any single digit. Seeds are returned in document order, duplicates
/// included — template derivation takes the first match anyway.
pub fn extract_seeds(markup: &str, host_pattern: &str) -> Vec<String> {
    let host = regex::escape(host_pattern).replace(r"\{n\}", r"\d");
    let Ok(seed) = Regex::new(&format!(r"{host}/(\d+/[A-Za-z0-9]+)/")) else {
        return Vec::new();
    };
    seed.captures_iter(markup)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Scrape the gallery title out of page markup.
///
/// Tries `<h1>` first, then `<h2 class="title">`, then the document
/// `<title>`. Nested markup inside the heading is stripped. Returns `None`
/// when no candidate yields non-empty text.
pub fn extract_title(markup: &str) -> Option<String> {
    let patterns = [
        r"(?s)<h1[^>]*>(.*?)</h1>",
        r#"(?s)<h2[^>]*class="[^"]*title[^"]*"[^>]*>(.*?)</h2>"#,
        r"(?s)<title[^>]*>(.*?)</title>",
    ];
    for pattern in patterns {
        let Ok(heading) = Regex::new(pattern) else {
            continue;
        };
        if let Some(captures) = heading.captures(markup) {
            #[allow(clippy::expect_used)]
            let tags = Regex::new(r"<[^>]+>").expect("tag-strip regex is valid");
            let text = tags.replace_all(&captures[1], "").trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Make a title safe for use in a filename.
///
/// Strips the characters that are invalid on common filesystems, trims
/// whitespace, and caps the length. Empty input stays empty.
pub fn sanitize_title(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}
