use super::types::{FetchResult, Preview};
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use scraper::{Html, Selector};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

/// Bytes searched for a `<meta charset>` declaration.
const META_PRESCAN_BYTES: usize = 1024;

/// Matches both `<meta charset=x>` and the `http-equiv` form whose
/// `content` carries `charset=x`.
static META_CHARSET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta\b[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#).ok()
});

/// Turns a safe document into a [`Preview`]. Never fails; a document with no
/// usable metadata still yields a preview carrying `canonical_url`.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, result: &FetchResult) -> Preview;
}

/// OpenGraph / Twitter-card / plain HTML extractor built on `scraper`'s
/// html5ever parser, which recovers from malformed markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlMetadataExtractor;

impl MetadataExtractor for HtmlMetadataExtractor {
    fn extract(&self, result: &FetchResult) -> Preview {
        let html = decode_body(result);
        extract_from_html(&result.final_url, &html)
    }
}

/// Header charset, then a `<meta>` declaration near the top, then UTF-8.
/// A byte-order mark beats all three.
fn decode_body(result: &FetchResult) -> Cow<'_, str> {
    let encoding = result
        .charset
        .as_deref()
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .or_else(|| sniff_meta_charset(&result.body))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(&result.body);
    text
}

fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_PRESCAN_BYTES)];
    let label = META_CHARSET.as_ref()?.captures(head)?.get(1)?;
    // A UTF-16 label inside an ASCII-compatible document means UTF-8.
    Encoding::for_label(label.as_bytes()).map(Encoding::output_encoding)
}

fn extract_from_html(base: &Url, html: &str) -> Preview {
    let document = Html::parse_document(html);
    let meta = collect_meta(&document);
    let get = |key: &str| meta.get(key).cloned();

    let title = get("og:title")
        .or_else(|| get("twitter:title"))
        .or_else(|| document_title(&document));

    let description = get("og:description")
        .or_else(|| get("twitter:description"))
        .or_else(|| get("description"));

    let image_url = get("og:image")
        .or_else(|| get("twitter:image"))
        .and_then(|raw| resolve_http(base, &raw));

    let site_name = get("og:site_name").or_else(|| base.host_str().map(str::to_string));

    let canonical_url = canonical_link(&document)
        .and_then(|href| resolve_http(base, &href))
        .unwrap_or_else(|| base.to_string());

    Preview {
        title,
        description,
        image_url,
        site_name,
        canonical_url,
        page_type: get("og:type"),
    }
}

/// First non-empty `content` per lowercased `property`/`name` key.
fn collect_meta(document: &Html) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    let Ok(selector) = Selector::parse("meta[content]") else {
        return meta;
    };

    for element in document.select(&selector) {
        let el = element.value();
        let Some(key) = el.attr("property").or_else(|| el.attr("name")) else {
            continue;
        };
        let Some(content) = el.attr("content").and_then(normalize) else {
            continue;
        };
        meta.entry(key.trim().to_ascii_lowercase()).or_insert(content);
    }
    meta
}

fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let element = document.select(&selector).next()?;
    normalize(&element.text().collect::<String>())
}

fn canonical_link(document: &Html) -> Option<String> {
    let selector = Selector::parse("link[rel][href]").ok()?;
    document
        .select(&selector)
        .find(|el| {
            el.value().attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("canonical"))
            })
        })
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
}

/// Resolve `raw` against `base`, keeping only http(s) results. Relative
/// references land on the fetched origin; absolute ones are taken as-is.
fn resolve_http(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let resolved = base.join(raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

fn normalize(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
