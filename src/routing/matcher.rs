//! Path translation and file-based template resolution.
//!
//! # Responsibilities
//! - Translate configured route paths (`/users/:id`, `/static/*`) into the
//!   router's capture syntax (`/users/{param2}`, `/static/{*rest}`)
//! - Map unrouted request paths to template identifiers
//!
//! # Design Decisions
//! - `/` serves the index template
//! - Request paths are percent-decoded before the extension is appended
//! - Identifier hygiene (`..`, absolute paths) is left to the registry
//! - Captures are named by segment position; templates never read them, so
//!   `/users/:id` and `/users/:name` are the same route

use percent_encoding::percent_decode_str;

/// Translate a configured route path into axum's path syntax.
///
/// `:name` segments become `{paramN}` captures, N being the segment index, and
/// a trailing `*` segment becomes a `{*rest}` wildcard. Literal `{` and `}`
/// are escaped. Other segments are kept verbatim.
pub fn to_router_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len().saturating_sub(1);

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if segment.starts_with(':') {
                format!("{{param{}}}", i)
            } else if *segment == "*" && i == last {
                "{*rest}".to_string()
            } else {
                segment.replace('{', "{{").replace('}', "}}")
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves request paths that no configured route claims.
#[derive(Debug, Clone)]
pub struct FileRouteMatcher {
    index: String,
    extension: String,
}

impl FileRouteMatcher {
    pub fn new(index: impl Into<String>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            index: index.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Template identifier for a request path.
    pub fn template_for(&self, path: &str) -> String {
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        let name = match decoded.as_ref() {
            "/" | "" => self.index.as_str(),
            other => other.strip_prefix('/').unwrap_or(other),
        };
        format!("{}.{}", name, self.extension)
    }
}

impl Default for FileRouteMatcher {
    fn default() -> Self {
        Self::new("index", "html")
    }
}
