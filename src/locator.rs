use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// ── Constants ────────────────────────────────────────────────────────────────

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp"];

// ── Lazy static regexes ──────────────────────────────────────────────────────

static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["'][^>]*>"#).unwrap());

// ── Classification ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageClass {
    Local,
    Remote,
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Every `<img>` source attribute in `body`, in document order.
///
/// The slices are the literal attribute text, so they can be fed straight
/// back into a string replacement on the same body. Repeated URLs are kept.
pub fn extract(body: &str) -> Vec<&str> {
    if body.is_empty() {
        return Vec::new();
    }
    IMG_SRC_RE
        .captures_iter(body)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect()
}

/// Remote only when both URLs have a host, the hosts differ, and the path ends
/// in a known image extension. Everything else, including relative and
/// unparseable URLs, is Local.
///
/// Hosts are compared as written, so `MySite.test` and `mysite.test` differ.
pub fn classify(url: &str, site: &str) -> ImageClass {
    let Ok(parsed) = Url::parse(url) else {
        return ImageClass::Local;
    };
    let site_has_host = Url::parse(site).is_ok_and(|s| s.host_str().is_some());
    if parsed.host_str().is_none() || !site_has_host {
        return ImageClass::Local;
    }
    let (Some(host), Some(site_host)) = (raw_host(url), raw_host(site)) else {
        return ImageClass::Local;
    };
    if host == site_host {
        return ImageClass::Local;
    }
    match path_extension(parsed.path()) {
        Some(ext) if is_image_extension(ext) => ImageClass::Remote,
        _ => ImageClass::Local,
    }
}

/// Host text exactly as it appears in `url`, without userinfo or port.
pub fn raw_host(url: &str) -> Option<&str> {
    let (_, rest) = url.trim().split_once("://")?;
    let authority = rest.split(['/', '?', '#', '\\']).next()?;
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = if authority.starts_with('[') {
        &authority[..=authority.find(']')?]
    } else {
        authority.split(':').next()?
    };
    (!host.is_empty()).then_some(host)
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Extension of the last path segment, without the dot.
fn path_extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}
