//! HTML scanning shared by the publisher, aggregator and AMP extractors.
//!
//! All functions here are synchronous and return owned strings: `scraper::Html`
//! is not `Send`, so a parsed document must never live across an `.await`.

use crate::http::absolutize;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

static SOCIAL_META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static IMAGE_SRC_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="image_src"]"#).unwrap());
static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static INLINE_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static AMP_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"link[rel="amphtml"]"#).unwrap());
static AMP_IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse("amp-img, img").unwrap());

/// Social-preview keys in the order they are trusted.
const SOCIAL_KEYS: [&str; 4] = [
    "og:image:secure_url",
    "og:image",
    "twitter:image",
    "twitter:image:src",
];

/// Every image reference on a page, most trustworthy first:
/// social-preview metadata, `link[rel=image_src]`, JSON-LD `image`, inline `<img>`.
pub fn page_image_urls(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut found = Vec::new();

    found.extend(social_images(&document));
    found.extend(
        document
            .select(&IMAGE_SRC_LINK)
            .filter_map(|el| el.value().attr("href"))
            .map(str::to_string),
    );
    found.extend(json_ld_images(&document));
    found.extend(document.select(&INLINE_IMG).filter_map(inline_src));

    found
        .iter()
        .filter_map(|raw| absolutize(base, raw))
        .unique()
        .collect()
}

fn social_images(document: &Html) -> Vec<String> {
    let metas = document
        .select(&SOCIAL_META)
        .filter_map(|el| {
            let v = el.value();
            let key = v.attr("property").or_else(|| v.attr("name"))?;
            let content = v.attr("content")?.trim();
            (!content.is_empty()).then(|| (key.to_ascii_lowercase(), content.to_string()))
        })
        .collect::<Vec<_>>();

    SOCIAL_KEYS
        .iter()
        .flat_map(|key| {
            metas
                .iter()
                .filter(move |(k, _)| k == key)
                .map(|(_, content)| content.clone())
        })
        .collect()
}

fn json_ld_images(document: &Html) -> Vec<String> {
    let mut out = Vec::new();
    for script in document.select(&JSON_LD) {
        let text = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
            collect_ld_images(&value, &mut out);
        }
    }
    out
}

fn collect_ld_images(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_ld_images(v, out)),
        Value::Object(map) => {
            if let Some(image) = map.get("image") {
                push_ld_image(image, out);
            }
            if let Some(graph) = map.get("@graph") {
                collect_ld_images(graph, out);
            }
        }
        _ => {}
    }
}

fn push_ld_image(image: &Value, out: &mut Vec<String>) {
    match image {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| push_ld_image(v, out)),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("url").or_else(|| map.get("contentUrl")) {
                out.push(s.clone());
            }
        }
        _ => {}
    }
}

fn inline_src(el: ElementRef<'_>) -> Option<String> {
    let v = el.value();
    v.attr("src")
        .filter(|s| !s.trim().is_empty() && !s.trim_start().starts_with("data:"))
        .or_else(|| v.attr("data-src"))
        .map(str::to_string)
}

/// The page's AMP variant, if it declares one.
pub fn amp_link(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&AMP_LINK)
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| absolutize(base, href))
}

/// An image element together with the pixel area its markup declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredImage {
    pub url: String,
    /// `None` when neither `width`/`height` nor a `w` srcset descriptor is present.
    pub declared_area: Option<u64>,
}

/// All `amp-img`/`img` elements of an AMP document with their declared sizes.
pub fn declared_images(html: &str, base: &Url) -> Vec<DeclaredImage> {
    let document = Html::parse_document(html);
    document
        .select(&AMP_IMAGES)
        .filter_map(|el| {
            let v = el.value();
            let srcset_best = v.attr("srcset").and_then(largest_srcset_entry);
            let dims = dimension(v.attr("width")).zip(dimension(v.attr("height")));

            let (raw, area) = if let Some((w, h)) = dims {
                let src = inline_src(el).or_else(|| srcset_best.map(|(url, _)| url))?;
                (src, Some(w * h))
            } else if let Some((url, w)) = srcset_best {
                // Square assumption; only used to rank against other srcset widths.
                (url, Some(w * w))
            } else {
                (inline_src(el)?, None)
            };
            absolutize(base, &raw).map(|url| DeclaredImage {
                url,
                declared_area: area,
            })
        })
        .collect()
}

/// The pick among `images`: largest declared area, first in document order on ties,
/// undeclared images only when nothing declares a size.
pub fn largest_declared(images: &[DeclaredImage]) -> Option<&DeclaredImage> {
    let mut best: Option<&DeclaredImage> = None;
    for img in images {
        best = match best {
            None => Some(img),
            Some(cur) if img.declared_area > cur.declared_area => Some(img),
            keep => keep,
        };
    }
    best
}

fn dimension(raw: Option<&str>) -> Option<u64> {
    let digits = raw?.trim().trim_end_matches("px");
    digits.parse::<u64>().ok().filter(|v| *v > 0)
}

fn largest_srcset_entry(srcset: &str) -> Option<(String, u64)> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let width = parts.next()?.strip_suffix('w')?.parse::<u64>().ok()?;
            Some((url.to_string(), width))
        })
        .max_by_key(|(_, w)| *w)
}
