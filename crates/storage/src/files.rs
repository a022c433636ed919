//! Filesystem helpers shared by [`FileStorage`](crate::FileStorage)
//! implementations.

use std::path::Path;

/// Pick a name in `dir` that no existing file uses.
///
/// `photo.jpg` becomes `photo-1.jpg`, `photo-2.jpg`, … until free.
pub fn unique_filename(dir: &Path, name: &str) -> String {
    let name = sanitize(name);
    if !dir.join(&name).exists() {
        return name;
    }
    let (stem, ext) = split_ext(&name);
    let mut n = 1u32;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", stem, n),
        };
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Split `name` into stem and extension. Leading dots do not start an
/// extension.
pub fn split_ext(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(i) if i > 0 && i + 1 < name.len() => (&name[..i], Some(&name[i + 1..])),
        _ => (name, None),
    }
}

/// MIME type for an upload, by extension.
pub fn mime_for(name: &str) -> Option<&'static str> {
    let (_, ext) = split_ext(name);
    let mime = match ext?.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        _ => return None,
    };
    Some(mime)
}

/// Last path segment of a URL or path.
pub fn basename(s: &str) -> &str {
    let trimmed = s.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '#' | '"' | '\''))
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
