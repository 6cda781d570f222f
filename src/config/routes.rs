//! XML route table loading.
//!
//! ```xml
//! <routes>
//!   <route path="/greet" file="greet.html">
//!     <methods>GET</methods>
//!     <methods>POST</methods>
//!   </route>
//! </routes>
//! ```
//!
//! # Design Decisions
//! - Method names are case-insensitive; unknown names are dropped with a warning
//! - A `<route>` without a `path` or `file` attribute is skipped with a
//!   warning; the rest of the table still loads
//! - A missing or malformed file degrades to an empty table (file-based routing
//!   still works), see [`load_routes_or_empty`]
//! - The table is immutable once loaded

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Error type for route table loading.
#[derive(Debug, Error)]
pub enum RouteConfigError {
    #[error("failed to read route config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse route config: {0}")]
    Parse(#[from] quick_xml::DeError),
}

/// A method a route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    /// Wildcard: every method.
    Any,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Patch => "PATCH",
            RouteMethod::Any => "ANY",
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a method name is not one of the supported ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported route method {0:?}")]
pub struct UnknownMethod(pub String);

impl FromStr for RouteMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(RouteMethod::Get),
            "POST" => Ok(RouteMethod::Post),
            "PUT" => Ok(RouteMethod::Put),
            "DELETE" => Ok(RouteMethod::Delete),
            "PATCH" => Ok(RouteMethod::Patch),
            "ANY" => Ok(RouteMethod::Any),
            _ => Err(UnknownMethod(s.trim().to_string())),
        }
    }
}

/// One path → template binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// URL path pattern (`:name` and trailing `*` are accepted).
    pub path: String,
    /// Template identifier served for this path.
    pub file: String,
    /// Allowed methods, in declaration order, without duplicates.
    pub methods: Vec<RouteMethod>,
}

impl RouteEntry {
    /// Build an entry from raw method names, dropping unknown ones.
    pub fn new<'a>(
        path: impl Into<String>,
        file: impl Into<String>,
        methods: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let path = path.into();
        let mut parsed = Vec::new();
        for raw in methods {
            match raw.parse::<RouteMethod>() {
                Ok(m) if !parsed.contains(&m) => parsed.push(m),
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path, error = %e, "Ignoring route method"),
            }
        }
        Self {
            path,
            file: file.into(),
            methods: parsed,
        }
    }
}

/// Ordered route table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// Build from a static table, as emitted into compiled programs.
    pub fn from_static(table: &[(&str, &str, &[&str])]) -> Self {
        table
            .iter()
            .map(|(path, file, methods)| RouteEntry::new(*path, *file, methods.iter().copied()))
            .collect()
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RouteEntry> for RouteTable {
    fn from_iter<I: IntoIterator<Item = RouteEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "routes")]
struct RoutesDocument {
    #[serde(rename = "route", default)]
    routes: Vec<RouteElement>,
}

#[derive(Debug, Deserialize)]
struct RouteElement {
    #[serde(rename = "@path", default)]
    path: Option<String>,
    #[serde(rename = "@file", default)]
    file: Option<String>,
    #[serde(rename = "methods", alias = "method", default)]
    methods: Vec<String>,
}

/// Parse a route table from XML text.
pub fn parse_routes(xml: &str) -> Result<RouteTable, RouteConfigError> {
    let document: RoutesDocument = quick_xml::de::from_str(xml)?;
    Ok(document
        .routes
        .into_iter()
        .enumerate()
        .filter_map(|(index, r)| match (r.path, r.file) {
            (Some(path), Some(file)) => {
                Some(RouteEntry::new(path, file, r.methods.iter().map(String::as_str)))
            }
            (path, file) => {
                tracing::warn!(
                    index,
                    path = ?path,
                    file = ?file,
                    "Skipping route without path or file attribute"
                );
                None
            }
        })
        .collect())
}

/// Load a route table from an XML file.
pub fn load_routes(path: &Path) -> Result<RouteTable, RouteConfigError> {
    let xml = fs::read_to_string(path)?;
    parse_routes(&xml)
}

/// Load a route table, falling back to an empty one on any error.
pub fn load_routes_or_empty(path: &Path) -> RouteTable {
    match load_routes(path) {
        Ok(table) => {
            tracing::info!(path = %path.display(), routes = table.len(), "Route config loaded");
            table
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not load route config, continuing with file-based routing only"
            );
            RouteTable::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_routes() {
        let xml = r#"
            <routes>
              <route path="/greet" file="greet.html">
                <methods>GET</methods>
              </route>
              <route path="/users/:id" file="user.html">
                <methods>get</methods>
                <methods>Post</methods>
                <methods>GET</methods>
              </route>
              <route path="/all" file="all.html">
                <methods>ANY</methods>
                <methods>OPTIONS</methods>
              </route>
            </routes>
        "#;
        let table = parse_routes(xml).unwrap();

        assert_eq!(
            table.entries(),
            &[
                RouteEntry {
                    path: "/greet".into(),
                    file: "greet.html".into(),
                    methods: vec![RouteMethod::Get],
                },
                RouteEntry {
                    path: "/users/:id".into(),
                    file: "user.html".into(),
                    methods: vec![RouteMethod::Get, RouteMethod::Post],
                },
                RouteEntry {
                    path: "/all".into(),
                    file: "all.html".into(),
                    methods: vec![RouteMethod::Any],
                },
            ]
        );
    }

    #[test]
    fn test_incomplete_route_is_skipped() {
        let xml = r#"
            <routes>
              <route path="/a" file="a.html"><methods>GET</methods></route>
              <route path="/no-file"><methods>GET</methods></route>
              <route file="orphan.html"><methods>POST</methods></route>
              <route path="/b" file="b.html"><methods>POST</methods></route>
            </routes>
        "#;
        let table = parse_routes(xml).unwrap();

        let paths: Vec<_> = table.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn test_empty_routes_element() {
        assert!(parse_routes("<routes></routes>").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let temp = TempDir::new().unwrap();
        let table = load_routes_or_empty(&temp.path().join("routes.xml"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_malformed_file_degrades_to_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("routes.xml");
        fs::write(&path, "<routes><route path=").unwrap();

        assert!(matches!(load_routes(&path), Err(RouteConfigError::Parse(_))));
        assert!(load_routes_or_empty(&path).is_empty());
    }

    #[test]
    fn test_from_static_matches_parsed() {
        let parsed = parse_routes(
            r#"<routes><route path="/greet" file="greet.html"><methods>GET</methods></route></routes>"#,
        )
        .unwrap();
        let embedded = RouteTable::from_static(&[("/greet", "greet.html", &["GET"])]);
        assert_eq!(parsed, embedded);
    }
}
