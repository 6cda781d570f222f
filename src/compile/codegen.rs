//! Source generation for compiled sites.
//!
//! Turns a template snapshot, a route table and the server settings into a
//! standalone Cargo package whose `main` serves them from static tables.
//! Generation is pure: nothing here touches the filesystem or runs a process.

use std::fmt::Write;
use std::path::Path;

use crate::config::{CompileConfig, RouteTable, ServerConfig};
use crate::template::EmbeddedRegistry;

/// Package and binary name of the generated program.
pub const GENERATED_BIN: &str = "embedded-site";

/// The files making up a generated package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    /// Contents of `Cargo.toml`.
    pub manifest: String,
    /// Contents of `src/main.rs`.
    pub main_rs: String,
}

/// Render `s` as a Rust string literal.
fn rust_str(s: &str) -> String {
    format!("{:?}", s)
}

/// Settings carried into a compiled program, as TOML.
///
/// The `compile` section is reset and watching is disabled; everything else
/// (index, extension, include depth, limits, listener, observability) is kept.
pub fn embedded_settings(settings: &ServerConfig) -> Result<String, toml::ser::Error> {
    let mut embedded = settings.clone();
    embedded.compile = CompileConfig::default();
    embedded.site.watch = false;
    toml::to_string(&embedded)
}

/// Generate a program serving `templates` through `routes` with `settings`.
///
/// `engine_path` is the directory of the `template-server` crate the program
/// links against.
pub fn generate(
    templates: &EmbeddedRegistry,
    routes: &RouteTable,
    settings: &ServerConfig,
    engine_path: &Path,
) -> Result<GeneratedProgram, toml::ser::Error> {
    Ok(GeneratedProgram {
        manifest: manifest(engine_path),
        main_rs: main_rs(templates, routes, &embedded_settings(settings)?),
    })
}

fn manifest(engine_path: &Path) -> String {
    let path = toml::Value::String(engine_path.to_string_lossy().into_owned());
    format!(
        r#"[package]
name = "{bin}"
version = "0.1.0"
edition = "2021"
publish = false

[[bin]]
name = "{bin}"
path = "src/main.rs"

[dependencies]
template-server = {{ path = {path} }}

[workspace]
"#,
        bin = GENERATED_BIN,
        path = path,
    )
}

fn main_rs(templates: &EmbeddedRegistry, routes: &RouteTable, settings: &str) -> String {
    let mut out = String::new();
    out.push_str("// Generated by `template-server compile`. Do not edit.\n\n");

    let _ = writeln!(out, "static SETTINGS: &str = {};\n", rust_str(settings));

    out.push_str("static TEMPLATES: &[(&str, &str)] = &[\n");
    for (id, content) in templates.iter() {
        let _ = writeln!(out, "    ({}, {}),", rust_str(id), rust_str(content));
    }
    out.push_str("];\n\n");

    out.push_str("static ROUTES: &[(&str, &str, &[&str])] = &[\n");
    for entry in routes.entries() {
        let methods: Vec<String> = entry.methods.iter().map(|m| rust_str(m.as_str())).collect();
        let _ = writeln!(
            out,
            "    ({}, {}, &[{}]),",
            rust_str(&entry.path),
            rust_str(&entry.file),
            methods.join(", ")
        );
    }
    out.push_str("];\n\n");

    out.push_str(
        "fn main() -> std::process::ExitCode {\n    template_server::lifecycle::startup::run_embedded(TEMPLATES, ROUTES, SETTINGS)\n}\n",
    );
    out
}
