//! Configuration schema definitions.
//!
//! This module defines the settings structure for the server and compiler.
//! All types derive Serde traits for deserialization from a TOML file; every
//! section has defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::template::processor::DEFAULT_MAX_INCLUDE_DEPTH;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Template root and routing files.
    pub site: SiteConfig,

    /// Directive expansion settings.
    pub render: RenderConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Settings for the `compile` command.
    pub compile: CompileConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl ListenerConfig {
    /// Replace the port of the bind address, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.bind_address = format!("{}:{}", host, port);
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where templates and routes come from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root directory holding the templates.
    pub root: String,

    /// XML route table.
    pub routes_file: String,

    /// Log template changes under `root`.
    pub watch: bool,

    /// Template name served for `/`, without extension.
    pub index: String,

    /// Extension appended by file-based routing.
    pub extension: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: "./root_http".to_string(),
            routes_file: "routes.xml".to_string(),
            watch: false,
            index: "index".to_string(),
            extension: "html".to_string(),
        }
    }
}

/// Directive expansion settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum include nesting. `0` means unbounded.
    pub max_include_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum form body size read for `form.*` lookups.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Settings for compiling a site into a standalone binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Output binary path.
    pub output: String,

    /// File extensions collected from the root directory.
    pub extensions: Vec<String>,

    /// Build with `--release`.
    pub release: bool,

    /// Pass `--offline` to cargo.
    pub offline: bool,

    /// Kill the build after this many seconds. Unset waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_timeout_secs: Option<u64>,

    /// Path of the `template-server` crate the generated program depends on.
    /// Defaults to the source tree this binary was built from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_path: Option<String>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            output: "webframework-compiled".to_string(),
            extensions: vec!["html".to_string()],
            release: true,
            offline: false,
            build_timeout_secs: None,
            engine_path: None,
        }
    }
}
