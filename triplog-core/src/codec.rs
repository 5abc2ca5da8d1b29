//! Snapshot codec shared by file export, clipboard text and share links.
//!
//! File and clipboard use the canonical JSON text from [`encode`]. Links wrap
//! the compact JSON in URL-safe base64 and carry it in the `share` query
//! parameter.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::AppData;

/// Query parameter that carries a shared snapshot.
pub const SHARE_PARAM: &str = "share";

/// Errors raised while decoding a snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Invalid data format: {0}")]
    Format(String),
}

/// Canonical text form of a snapshot (pretty-printed JSON).
pub fn encode(data: &AppData) -> String {
    // Serializing plain structs with string keys cannot fail.
    serde_json::to_string_pretty(data).unwrap_or_default()
}

/// Parses canonical text. Either the whole snapshot decodes or nothing does.
pub fn decode(text: &str) -> Result<AppData, CodecError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| CodecError::Format(format!("not valid JSON: {}", e)))?;

    match value.get("cities") {
        Some(cities) if cities.is_array() => {}
        Some(_) => {
            return Err(CodecError::Format(
                "`cities` must be an array".to_string(),
            ))
        }
        None => return Err(CodecError::Format("missing `cities` field".to_string())),
    }

    let data: AppData =
        serde_json::from_value(value).map_err(|e| CodecError::Format(e.to_string()))?;

    for city in &data.cities {
        for attraction in &city.attractions {
            if let Some(coords) = &attraction.coordinates {
                if !coords.is_valid() {
                    return Err(CodecError::Format(format!(
                        "coordinates out of range for {}",
                        attraction.id
                    )));
                }
            }
        }
    }

    Ok(data)
}

/// Compact, URL-safe token for the `share` query parameter.
pub fn encode_for_link(data: &AppData) -> String {
    let compact = serde_json::to_string(data).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(compact.as_bytes())
}

/// Decodes a token produced by [`encode_for_link`].
///
/// Also accepts tokens in the older `base64(percent-encoded JSON)` form with
/// the standard alphabet and padding.
pub fn decode_link_token(token: &str) -> Result<AppData, CodecError> {
    let normalized: String = token
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' | ' ' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| CodecError::Format(format!("share token is not base64: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| CodecError::Format("share token is not UTF-8".to_string()))?;

    if text.trim_start().starts_with('{') {
        return decode(&text);
    }

    let unescaped = urlencoding::decode(&text)
        .map_err(|e| CodecError::Format(format!("share token is not percent-encoded: {}", e)))?;
    decode(&unescaped)
}

/// Extracts and decodes the shared snapshot from a URL or query string.
///
/// Returns `Ok(None)` when no (non-empty) `share` parameter is present.
pub fn decode_from_link(url_or_query: &str) -> Result<Option<AppData>, CodecError> {
    match share_param(url_or_query) {
        Some(token) if !token.is_empty() => decode_link_token(&token).map(Some),
        _ => Ok(None),
    }
}

/// Builds a share link for `base_url`.
pub fn share_link(base_url: &str, data: &AppData) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}",
        base_url,
        separator,
        SHARE_PARAM,
        encode_for_link(data)
    )
}

/// Returns `url` with the `share` parameter removed.
pub fn strip_share_param(url: &str) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (url, None),
    };

    let mut result = match without_fragment.split_once('?') {
        Some((base, query)) => {
            let kept: Vec<&str> = query
                .split('&')
                .filter(|pair| !pair.is_empty() && param_name(pair) != SHARE_PARAM)
                .collect();
            if kept.is_empty() {
                base.to_string()
            } else {
                format!("{}?{}", base, kept.join("&"))
            }
        }
        None => without_fragment.to_string(),
    };

    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

/// File name used for exports: `trip-data-YYYY-MM-DD.json`.
pub fn export_filename(date: NaiveDate) -> String {
    format!("trip-data-{}.json", date.format("%Y-%m-%d"))
}

fn share_param(url_or_query: &str) -> Option<String> {
    let without_fragment = url_or_query.split('#').next().unwrap_or_default();
    let query = match without_fragment.split_once('?') {
        Some((_, query)) => query,
        None if without_fragment.contains('=') => without_fragment,
        None => return None,
    };

    query
        .split('&')
        .find(|pair| param_name(pair) == SHARE_PARAM)
        .map(|pair| {
            let raw = pair.split_once('=').map(|(_, v)| v).unwrap_or_default();
            urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
}

fn param_name(pair: &str) -> &str {
    pair.split_once('=').map(|(k, _)| k).unwrap_or(pair)
}
