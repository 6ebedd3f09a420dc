use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use scraper::Html;

use crate::gmail::{Header, MessagePart};

const MIME_PLAIN: &str = "text/plain";
const MIME_HTML: &str = "text/html";

// Gmail emits base64url with or without trailing padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// Text under these elements never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["head", "title", "script", "style", "noscript", "template"];

/// Plain-text body of a message payload, preferring `text/plain` over HTML.
pub fn extract_body(payload: &MessagePart) -> Option<String> {
    if payload.parts.is_empty() {
        let text = decode(payload)?;
        return Some(if payload.mime_type.eq_ignore_ascii_case(MIME_HTML) {
            html_to_text(&text)
        } else {
            text
        });
    }

    let mut html_fallback = None;
    if let Some(text) = scan_parts(&payload.parts, &mut html_fallback) {
        return Some(text);
    }

    html_fallback.map(|html| html_to_text(&html))
}

fn scan_parts(parts: &[MessagePart], html_fallback: &mut Option<String>) -> Option<String> {
    for part in parts {
        let mime = part.mime_type.to_ascii_lowercase();
        if !part.parts.is_empty() {
            if let Some(text) = scan_parts(&part.parts, html_fallback) {
                return Some(text);
            }
            continue;
        }

        if mime == MIME_PLAIN {
            if let Some(text) = decode(part) {
                return Some(text);
            }
        } else if mime == MIME_HTML && html_fallback.is_none() {
            *html_fallback = decode(part);
        }
    }
    None
}

fn decode(part: &MessagePart) -> Option<String> {
    let data = part.body.data.as_deref()?.trim();
    if data.is_empty() {
        return None;
    }
    let bytes = URL_SAFE_LENIENT.decode(data).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Value of the `Subject` header, empty when the message has none.
pub fn subject_of(headers: &[Header]) -> String {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case("subject"))
        .map(|header| header.value.clone())
        .unwrap_or_default()
}

/// Visible text nodes of an HTML document, one per line with whitespace collapsed.
///
/// Entities are decoded by the parser. Inline markup splits lines, so callers
/// that match phrases should normalize whitespace first.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let lines: Vec<String> = document
        .tree
        .root()
        .descendants()
        .filter(|node| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
            })
        })
        .filter_map(|node| node.value().as_text().map(|text| &**text))
        .map(|chunk| chunk.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}
