//! Template storage.
//!
//! # Responsibilities
//! - Map a template identifier to its raw content
//! - Normalize identifiers the same way for every backing store
//!
//! # Design Decisions
//! - Two stores behind one trait: [`FsRegistry`] re-reads the file on every
//!   fetch (no cache, so edits are visible immediately) and [`EmbeddedRegistry`]
//!   serves an immutable table built at startup or compile time
//! - Registries are read-only after construction and shared via `Arc`
//! - Template files are decoded as UTF-8; invalid sequences become U+FFFD
//!   with a warning instead of failing the request

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors returned by a [`TemplateRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No template exists under the identifier.
    #[error("template {0} not found")]
    NotFound(String),

    /// The identifier escapes the template root.
    #[error("invalid template identifier {0}")]
    InvalidIdentifier(String),

    /// The backing store failed while reading.
    #[error("failed to read template {id}: {source}")]
    Read {
        id: String,
        #[source]
        source: io::Error,
    },
}

impl RegistryError {
    /// True for errors that mean "there is no such template" rather than a
    /// storage failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::NotFound(_) | RegistryError::InvalidIdentifier(_)
        )
    }
}

/// Source of template content, keyed by identifier.
pub trait TemplateRegistry: Send + Sync + std::fmt::Debug {
    /// Fetch the raw content of a template.
    fn fetch(&self, id: &str) -> Result<Cow<'_, str>, RegistryError>;

    /// Short label for logs and metrics.
    fn kind(&self) -> &'static str;
}

/// Normalize an identifier to its slash-separated relative form.
///
/// Empty and `.` segments are dropped, so `./a//b.html` and `/a/b.html` both
/// become `a/b.html`. Any `..` segment is rejected.
pub fn normalize_identifier(id: &str) -> Result<String, RegistryError> {
    let mut segments = Vec::new();
    for segment in id.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(RegistryError::InvalidIdentifier(id.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Decode template bytes, replacing invalid UTF-8 with U+FFFD.
pub(crate) fn decode_template(id: &str, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(
                template = %id,
                error = %e.utf8_error(),
                "Template is not valid UTF-8, decoding lossily"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

/// Registry reading templates from a directory on every fetch.
#[derive(Debug, Clone)]
pub struct FsRegistry {
    root: PathBuf,
}

impl FsRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateRegistry for FsRegistry {
    fn fetch(&self, id: &str) -> Result<Cow<'_, str>, RegistryError> {
        let normalized = normalize_identifier(id)?;
        let path = self.root.join(&normalized);

        match fs::read(&path) {
            Ok(bytes) => Ok(Cow::Owned(decode_template(&normalized, bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RegistryError::NotFound(id.to_string()))
            }
            Err(e) => Err(RegistryError::Read {
                id: id.to_string(),
                source: e,
            }),
        }
    }

    fn kind(&self) -> &'static str {
        "filesystem"
    }
}

/// Registry backed by an immutable in-memory table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedRegistry {
    templates: BTreeMap<String, String>,
}

impl EmbeddedRegistry {
    /// Build from a static table, as emitted into compiled programs.
    pub fn from_static(table: &[(&str, &str)]) -> Self {
        table
            .iter()
            .map(|(id, content)| (id.to_string(), content.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        normalize_identifier(id)
            .map(|id| self.templates.contains_key(&id))
            .unwrap_or(false)
    }

    /// Entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.templates
            .iter()
            .map(|(id, content)| (id.as_str(), content.as_str()))
    }
}

impl FromIterator<(String, String)> for EmbeddedRegistry {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}

impl TemplateRegistry for EmbeddedRegistry {
    fn fetch(&self, id: &str) -> Result<Cow<'_, str>, RegistryError> {
        let normalized = normalize_identifier(id)?;
        self.templates
            .get(&normalized)
            .map(|content| Cow::Borrowed(content.as_str()))
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    fn kind(&self) -> &'static str {
        "embedded"
    }
}
