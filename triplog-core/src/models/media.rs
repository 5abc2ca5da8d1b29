//! Photo and video payloads.
//!
//! Media is stored inline as `data:<mime>;base64,<payload>` strings so a
//! snapshot stays self-contained across export, links and sync.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

/// Kind of media attached to an attraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

/// Encodes raw bytes as a data URL.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Splits a data URL into its MIME type and decoded bytes.
///
/// Returns `None` for anything that is not a base64 data URL.
pub fn from_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}

/// Guesses the MIME type and media kind from a file extension.
pub fn guess_mime(path: &Path) -> Option<(&'static str, MediaKind)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let guess = match ext.as_str() {
        "jpg" | "jpeg" => ("image/jpeg", MediaKind::Photo),
        "png" => ("image/png", MediaKind::Photo),
        "gif" => ("image/gif", MediaKind::Photo),
        "webp" => ("image/webp", MediaKind::Photo),
        "heic" => ("image/heic", MediaKind::Photo),
        "mp4" => ("video/mp4", MediaKind::Video),
        "mov" => ("video/quicktime", MediaKind::Video),
        "webm" => ("video/webm", MediaKind::Video),
        _ => return None,
    };
    Some(guess)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_roundtrip() {
        let url = to_data_url("image/png", &[0x89, 0x50, 0x4e, 0x47]);
        assert!(url.starts_with("data:image/png;base64,"));

        let (mime, bytes) = from_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[test]
    fn test_from_data_url_rejects_plain_text() {
        assert!(from_data_url("https://example.com/a.png").is_none());
        assert!(from_data_url("data:text/plain,hello").is_none());
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(
            guess_mime(Path::new("trip/IMG_001.JPG")),
            Some(("image/jpeg", MediaKind::Photo))
        );
        assert_eq!(
            guess_mime(Path::new("clip.mov")),
            Some(("video/quicktime", MediaKind::Video))
        );
        assert_eq!(guess_mime(Path::new("notes.txt")), None);
        assert_eq!(guess_mime(Path::new("no_extension")), None);
    }
}
