//! Reduce a client locator to a safe, relative resource path.
//!
//! This is the traversal boundary: the content resolver only ever sees paths
//! produced here.

use url::Url;

use crate::protocol::error::RequestError;

/// Resource served for an empty or root path.
pub const DEFAULT_DOCUMENT: &str = "index.sky";

/// Strip scheme and host from `locator` and normalize what remains.
///
/// Empty, `.` and `..` segments are dropped, so the result never climbs out
/// of the content root. An empty result maps to `default_document`.
pub fn resource_path(locator: &str, default_document: &str) -> Result<String, RequestError> {
    let raw_path = if locator.contains("://") {
        let url = Url::parse(locator).map_err(|_| RequestError::InvalidLocator)?;
        url.path().to_string()
    } else {
        locator.to_string()
    };

    let path = normalize(&raw_path);
    if path.is_empty() {
        Ok(default_document.to_string())
    } else {
        Ok(path)
    }
}

fn normalize(path: &str) -> String {
    path.split(|c: char| c == '/' || c == '\\')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}
