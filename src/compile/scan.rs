//! Template directory scanning.
//!
//! Walks the root recursively and loads every file with a matching extension
//! into an [`EmbeddedRegistry`], keyed by its root-relative, slash-separated
//! path.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::template::scanner::include_targets;
use crate::template::registry::decode_template;
use crate::template::EmbeddedRegistry;

/// Error type for directory scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.') == ext)
}

fn identifier(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(segments.join("/"))
}

/// Load every template under `root` whose extension is in `extensions`.
pub fn scan_templates(root: &Path, extensions: &[String]) -> Result<EmbeddedRegistry, ScanError> {
    let mut templates = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| ScanError::Walk {
            root: root.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let Some(id) = identifier(root, entry.path()) else {
            continue;
        };

        let bytes = fs::read(entry.path()).map_err(|source| ScanError::Read {
            path: entry.path().to_path_buf(),
            source,
        })?;
        let content = decode_template(&id, bytes);

        tracing::info!(template = %id, bytes = content.len(), "Added template");
        templates.push((id, content));
    }

    Ok(templates.into_iter().collect())
}

/// Include directives whose target is absent from `registry`, as
/// `(template, target)` pairs.
pub fn missing_includes(registry: &EmbeddedRegistry) -> Vec<(String, String)> {
    registry
        .iter()
        .flat_map(|(id, content)| {
            include_targets(content)
                .filter(move |target| !registry.contains(target))
                .map(move |target| (id.to_string(), target.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateRegistry;
    use tempfile::TempDir;

    fn html() -> Vec<String> {
        vec!["html".to_string()]
    }

    #[test]
    fn test_scan_collects_nested_templates() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("partials/deep")).unwrap();
        fs::write(temp.path().join("index.html"), "home").unwrap();
        fs::write(temp.path().join("partials/deep/nav.html"), "nav").unwrap();
        fs::write(temp.path().join("style.css"), "body{}").unwrap();
        fs::write(temp.path().join("README"), "docs").unwrap();

        let registry = scan_templates(temp.path(), &html()).unwrap();
        let ids: Vec<_> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["index.html", "partials/deep/nav.html"]);
    }

    #[test]
    fn test_scan_multiple_extensions() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.html"), "a").unwrap();
        fs::write(temp.path().join("b.htm"), "b").unwrap();

        let registry =
            scan_templates(temp.path(), &["html".to_string(), ".htm".to_string()]).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_scan_keeps_non_utf8_template() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("latin1.html"), b"caf\xe9 <%= 1+2 %>").unwrap();
        fs::write(temp.path().join("ok.html"), "fine").unwrap();

        let registry = scan_templates(temp.path(), &html()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.fetch("latin1.html").unwrap(), "caf\u{FFFD} <%= 1+2 %>");
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let err = scan_templates(&temp.path().join("absent"), &html()).unwrap_err();
        assert!(matches!(err, ScanError::Walk { .. }));
    }

    #[test]
    fn test_missing_includes_reported() {
        let registry = EmbeddedRegistry::from_static(&[
            ("index.html", r#"<%@include file="nav.html" %><%@include file="gone.html" %>"#),
            ("nav.html", "nav"),
        ]);
        assert_eq!(
            missing_includes(&registry),
            vec![("index.html".to_string(), "gone.html".to_string())]
        );
    }
}
