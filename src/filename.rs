use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// ── Constants ────────────────────────────────────────────────────────────────

const DEFAULT_EXTENSION: &str = ".jpg";
const FALLBACK_STEM: &str = "image";

/// Characters dropped outright from uploaded filenames.
const SPECIAL_CHARS: &[char] = &[
    '?', '[', ']', '/', '\\', '=', '<', '>', ':', ';', ',', '\'', '"', '&', '$', '#', '*', '(',
    ')', '|', '~', '`', '!', '{', '}', '%', '+', '’', '«', '»', '”', '“',
];

static SEPARATOR_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s-]+").unwrap());

// ── Sanitizing ───────────────────────────────────────────────────────────────

/// Makes a filename safe to write: special characters removed, whitespace
/// runs turned into a single `-`, leading and trailing `.`, `-`, `_` trimmed.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && !SPECIAL_CHARS.contains(c))
        .collect();
    let collapsed = SEPARATOR_RUN_RE.replace_all(&cleaned, "-");
    collapsed
        .trim_matches(|c| matches!(c, '.' | '-' | '_'))
        .to_string()
}

/// Sanitized, percent-decoded last path segment of `url`.
pub fn filename_from_url(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .unwrap_or_default(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string(),
    };
    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);
    sanitize_file_name(&decoded)
}

pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/svg+xml" => Some(".svg"),
        _ => None,
    }
}

/// Filename to store a download from `url` under. Names without an extension
/// take one from `content_type`, then fall back to `.jpg`.
pub fn derive_filename(url: &str, content_type: Option<&str>) -> String {
    let mut name = filename_from_url(url);
    if name.is_empty() {
        name.push_str(FALLBACK_STEM);
    }
    if !name.contains('.') {
        if let Some(ext) = content_type.and_then(extension_for_content_type) {
            name.push_str(ext);
        }
    }
    if !name.contains('.') {
        name.push_str(DEFAULT_EXTENSION);
    }
    name
}

pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    }
}

// ── Collision handling ───────────────────────────────────────────────────────

/// First free name in `dir`: `name`, then `stem-1.ext`, `stem-2.ext`, ...
///
/// Check-then-use: a concurrent writer can still claim the returned name.
/// Lookup errors other than not-found are returned.
pub async fn unique_filename(dir: &Path, name: &str) -> std::io::Result<String> {
    let (stem, ext) = split_extension(name);
    let mut candidate = name.to_string();
    let mut suffix = 1u32;
    while tokio::fs::try_exists(dir.join(&candidate)).await? {
        candidate = match ext {
            Some(ext) => format!("{stem}-{suffix}.{ext}"),
            None => format!("{stem}-{suffix}"),
        };
        suffix += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_and_collapses() {
        assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("my  summer photo.jpg"), "my-summer-photo.jpg");
        assert_eq!(sanitize_file_name("a--b - c.png"), "a-b-c.png");
        assert_eq!(sanitize_file_name("wh@t?(1).gif"), "wh@t1.gif");
        assert_eq!(sanitize_file_name("..hidden.jpg."), "hidden.jpg");
        assert_eq!(sanitize_file_name("_-x-_"), "x");
        assert_eq!(sanitize_file_name("«»"), "");
    }

    #[test]
    fn filename_comes_from_last_path_segment() {
        assert_eq!(
            filename_from_url("https://cdn.example.com/a/b/photo.jpg?w=300#top"),
            "photo.jpg"
        );
        assert_eq!(
            filename_from_url("https://cdn.example.com/my%20cat.png"),
            "my-cat.png"
        );
        assert_eq!(filename_from_url("https://cdn.example.com/"), "");
        assert_eq!(filename_from_url("not a url/pic.gif?x=1"), "pic.gif");
    }

    #[test]
    fn content_type_extension_mapping() {
        assert_eq!(extension_for_content_type("image/jpeg"), Some(".jpg"));
        assert_eq!(extension_for_content_type("image/PNG; charset=binary"), Some(".png"));
        assert_eq!(extension_for_content_type("image/svg+xml"), Some(".svg"));
        assert_eq!(extension_for_content_type("image/bmp"), None);
    }

    #[test]
    fn derive_filename_fills_in_extensions() {
        assert_eq!(
            derive_filename("https://cdn.example.com/photo.png", Some("image/jpeg")),
            "photo.png"
        );
        assert_eq!(
            derive_filename("https://cdn.example.com/photo", Some("image/webp")),
            "photo.webp"
        );
        assert_eq!(
            derive_filename("https://cdn.example.com/photo", Some("image/bmp")),
            "photo.jpg"
        );
        assert_eq!(derive_filename("https://cdn.example.com/photo", None), "photo.jpg");
        assert_eq!(derive_filename("https://cdn.example.com/", None), "image.jpg");
    }

    #[tokio::test]
    async fn unique_filename_returns_name_when_free() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_filename(dir.path(), "a.jpg").await.unwrap(), "a.jpg");
    }

    #[tokio::test]
    async fn unique_filename_skips_every_taken_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        for i in 1..5 {
            std::fs::write(dir.path().join(format!("a-{i}.jpg")), b"x").unwrap();
        }
        assert_eq!(unique_filename(dir.path(), "a.jpg").await.unwrap(), "a-5.jpg");
    }

    #[tokio::test]
    async fn unique_filename_suffixes_from_the_original_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.b.png"), b"x").unwrap();
        assert_eq!(
            unique_filename(dir.path(), "a.b.png").await.unwrap(),
            "a.b-1.png"
        );
    }

    #[tokio::test]
    async fn unique_filename_reports_lookup_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        std::fs::write(&file, b"x").unwrap();

        assert!(unique_filename(&file, "a.jpg").await.is_err());
    }
}
