// src/suggest/normalize.rs
//! Sanitizes the free-text fields of an inbound content payload before it is
//! forwarded to the suggestion providers.
//!
//! Each field runs through its own ordered pipeline of text transformers.
//! Structural body elements (pull quotes, tables, promo boxes, inline pictures)
//! are removed together with their content before generic tag stripping, and
//! whitespace is collapsed last because removals leave gaps behind.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub type Transformer = fn(&str) -> String;

static RE_PULL_QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<pull-quote(\s[^>]*)?>.*?</pull-quote>").unwrap());
static RE_WEB_PULL_QUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<web-pull-quote(\s[^>]*)?>.*?</web-pull-quote>").unwrap());
static RE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table(\s[^>]*)?>.*?</table>").unwrap());
static RE_PROMO_BOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<promo-box(\s[^>]*)?>.*?</promo-box>").unwrap());
static RE_WEB_INLINE_PICTURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<web-inline-picture(\s[^>]*)?/>|<web-inline-picture(\s[^>]*)?>.*?</web-inline-picture>")
        .unwrap()
});
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn pull_tag_transformer(s: &str) -> String {
    RE_PULL_QUOTE.replace_all(s, " ").into_owned()
}

pub fn web_pull_tag_transformer(s: &str) -> String {
    RE_WEB_PULL_QUOTE.replace_all(s, " ").into_owned()
}

pub fn table_tag_transformer(s: &str) -> String {
    RE_TABLE.replace_all(s, " ").into_owned()
}

pub fn promo_box_tag_transformer(s: &str) -> String {
    RE_PROMO_BOX.replace_all(s, " ").into_owned()
}

pub fn web_inline_picture_tag_transformer(s: &str) -> String {
    RE_WEB_INLINE_PICTURE.replace_all(s, " ").into_owned()
}

pub fn html_entity_transformer(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

pub fn tags_remover(s: &str) -> String {
    RE_TAGS.replace_all(s, " ").into_owned()
}

pub fn outer_space_trimmer(s: &str) -> String {
    s.trim().to_string()
}

pub fn duplicate_white_space_remover(s: &str) -> String {
    RE_WS.replace_all(s, " ").into_owned()
}

pub const BYLINE_PIPELINE: &[Transformer] = &[
    html_entity_transformer,
    tags_remover,
    outer_space_trimmer,
    duplicate_white_space_remover,
];

pub const HEADLINE_PIPELINE: &[Transformer] = BYLINE_PIPELINE;

pub const BODY_PIPELINE: &[Transformer] = &[
    pull_tag_transformer,
    web_pull_tag_transformer,
    table_tag_transformer,
    promo_box_tag_transformer,
    web_inline_picture_tag_transformer,
    html_entity_transformer,
    tags_remover,
    outer_space_trimmer,
    duplicate_white_space_remover,
];

pub fn transform_text(input: &str, pipeline: &[Transformer]) -> String {
    pipeline
        .iter()
        .fold(input.to_string(), |text, transform| transform(&text))
}

/// Inbound shape; `null` and missing fields both read as empty.
#[derive(Debug, Default, Deserialize)]
struct RawContent {
    #[serde(default)]
    byline: Option<String>,
    #[serde(rename = "bodyXML", default)]
    body: Option<String>,
    #[serde(rename = "title", default)]
    headline: Option<String>,
}

/// Shape forwarded to providers.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct NormalizedContent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub byline: String,
    #[serde(rename = "bodyXML")]
    pub body: String,
    #[serde(rename = "title", skip_serializing_if = "String::is_empty")]
    pub headline: String,
}

impl From<RawContent> for NormalizedContent {
    fn from(raw: RawContent) -> Self {
        Self {
            byline: transform_text(&raw.byline.unwrap_or_default(), BYLINE_PIPELINE),
            body: transform_text(&raw.body.unwrap_or_default(), BODY_PIPELINE),
            headline: transform_text(&raw.headline.unwrap_or_default(), HEADLINE_PIPELINE),
        }
    }
}

/// Parse and normalize a JSON content payload. Fails if the bytes are not a JSON object.
pub fn normalize_content(payload: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("content payload is not a JSON object"));
    }
    let raw: RawContent = serde_json::from_value(value)?;
    serde_json::to_vec(&NormalizedContent::from(raw))
}

/// Like [`normalize_content`], but returns the original bytes when they cannot be parsed.
pub fn normalize_payload(payload: &[u8], tid: &str) -> Vec<u8> {
    match normalize_content(payload) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(tid, error = %e, "payload is not valid content JSON, forwarding unchanged");
            payload.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byline_unescapes_strips_and_collapses() {
        let s = "  By&nbsp;<b>Jane</b>\n\n  Doe ";
        assert_eq!(transform_text(s, BYLINE_PIPELINE), "By Jane Doe");
    }

    #[test]
    fn body_drops_structural_elements_with_content() {
        let s = "<body><p>Intro</p><pull-quote><pull-quote-text>Quoted</pull-quote-text></pull-quote>\
                 <table class=\"data\"><tr><td>1</td></tr></table><promo-box><promo-title>Ad</promo-title></promo-box>\
                 <web-inline-picture id=\"x\"/><p>Outro</p></body>";
        assert_eq!(transform_text(s, BODY_PIPELINE), "Intro Outro");
    }

    #[test]
    fn escaped_markup_is_decoded_then_stripped() {
        let s = "&lt;p&gt;Hello&lt;/p&gt; world";
        assert_eq!(transform_text(s, HEADLINE_PIPELINE), "Hello world");
    }

    #[test]
    fn table_prefix_does_not_match_other_tags() {
        let s = "<tablet>device</tablet>";
        assert_eq!(transform_text(s, BODY_PIPELINE), "device");
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(normalize_content(b"[1,2]").is_err());
        assert!(normalize_content(b"\"text\"").is_err());
    }

    #[test]
    fn missing_fields_serialize_body_only() {
        let out = normalize_content(br#"{"bodyXML":"<p>Hi</p>","other":1}"#).unwrap();
        assert_eq!(out, br#"{"bodyXML":"Hi"}"#.to_vec());
    }
}
