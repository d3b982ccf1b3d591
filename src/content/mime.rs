use std::path::Path;

use crate::protocol::SKY_MIME;

/// MIME type for a stored file, by extension. Unknown types default to `text/sky`.
pub fn for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        _ => SKY_MIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(for_path(Path::new("a/notes.txt")), "text/plain");
        assert_eq!(for_path(Path::new("README.MD")), "text/markdown");
        assert_eq!(for_path(Path::new("data.json")), "application/json");
    }

    #[test]
    fn everything_else_is_sky() {
        assert_eq!(for_path(Path::new("index.sky")), SKY_MIME);
        assert_eq!(for_path(Path::new("archive.tar.gz")), SKY_MIME);
        assert_eq!(for_path(Path::new("noext")), SKY_MIME);
    }
}
