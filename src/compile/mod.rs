//! Static compilation of a site into a standalone executable.
//!
//! # Pipeline
//! 1. Scan the root into an [`EmbeddedRegistry`](crate::template::EmbeddedRegistry)
//! 2. Load the route table (empty on failure)
//! 3. Generate a Cargo package embedding both, plus the server settings, as
//!    literals
//! 4. Materialize it in a temporary workspace
//! 5. Build it with a [`Toolchain`]
//! 6. Install the artifact at the output path
//!
//! The workspace is removed on every exit path. The output path is only
//! written once the build has produced an artifact, and only through a rename.

pub mod codegen;
pub mod scan;
pub mod toolchain;
pub mod workspace;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::routes::load_routes_or_empty;
use crate::config::ServerConfig;

pub use scan::{missing_includes, scan_templates, ScanError};
pub use toolchain::{Cargo, Toolchain, ToolchainError};
pub use workspace::BuildWorkspace;

/// A step of the compile pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStep {
    Scan,
    Generate,
    Materialize,
    Build,
    Install,
}

impl fmt::Display for CompileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileStep::Scan => "scan",
            CompileStep::Generate => "generate",
            CompileStep::Materialize => "materialize",
            CompileStep::Build => "build",
            CompileStep::Install => "install",
        };
        f.write_str(name)
    }
}

/// Error type for compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("template-server crate not found at {}", .0.display())]
    EngineNotFound(PathBuf),

    #[error("failed to serialize settings: {0}")]
    Settings(#[from] toml::ser::Error),

    #[error("failed to write build workspace: {0}")]
    Materialize(#[source] io::Error),

    #[error("build failed: {0}")]
    Build(#[from] ToolchainError),

    #[error("failed to install artifact at {}: {source}", path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CompileError {
    /// The pipeline step that failed.
    pub fn step(&self) -> CompileStep {
        match self {
            CompileError::Scan(_) => CompileStep::Scan,
            CompileError::EngineNotFound(_) | CompileError::Settings(_) => CompileStep::Generate,
            CompileError::Materialize(_) => CompileStep::Materialize,
            CompileError::Build(_) => CompileStep::Build,
            CompileError::Install { .. } => CompileStep::Install,
        }
    }
}

/// Inputs of one compilation.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub root: PathBuf,
    pub routes_file: PathBuf,
    pub output: PathBuf,
    pub extensions: Vec<String>,
    /// Directory holding the `template-server` crate's `Cargo.toml`.
    pub engine_path: PathBuf,
    /// Settings the compiled program serves with.
    pub settings: ServerConfig,
}

impl CompileRequest {
    pub fn from_config(config: &ServerConfig) -> Self {
        let engine_path = config
            .compile
            .engine_path
            .clone()
            .unwrap_or_else(|| env!("CARGO_MANIFEST_DIR").to_string());

        Self {
            root: PathBuf::from(&config.site.root),
            routes_file: PathBuf::from(&config.site.routes_file),
            output: PathBuf::from(&config.compile.output),
            extensions: config.compile.extensions.clone(),
            engine_path: PathBuf::from(engine_path),
            settings: config.clone(),
        }
    }
}

/// Summary of a successful compilation.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub templates: usize,
    pub routes: usize,
    pub missing_includes: Vec<(String, String)>,
    pub artifact: PathBuf,
}

/// Run the whole pipeline.
pub fn compile(request: &CompileRequest, toolchain: &dyn Toolchain) -> Result<CompileReport, CompileError> {
    tracing::info!(root = %request.root.display(), "Scanning templates");
    let templates = scan_templates(&request.root, &request.extensions)?;

    let missing = missing_includes(&templates);
    for (template, target) in &missing {
        tracing::warn!(template = %template, include = %target, "Include target not in snapshot");
    }

    let routes = load_routes_or_empty(&request.routes_file);
    tracing::info!(templates = templates.len(), routes = routes.len(), "Snapshot complete");

    if !request.engine_path.join("Cargo.toml").is_file() {
        return Err(CompileError::EngineNotFound(request.engine_path.clone()));
    }
    let program = codegen::generate(&templates, &routes, &request.settings, &request.engine_path)?;

    let workspace = BuildWorkspace::materialize(&program).map_err(CompileError::Materialize)?;
    tracing::info!(workspace = %workspace.path().display(), "Generated program");

    let built = toolchain.build(&workspace)?;
    install(&built, &request.output)?;
    tracing::info!(artifact = %request.output.display(), "Compilation successful");

    Ok(CompileReport {
        templates: templates.len(),
        routes: routes.len(),
        missing_includes: missing,
        artifact: request.output.clone(),
    })
}

fn install(built: &Path, output: &Path) -> Result<(), CompileError> {
    let mut partial = output.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let result = fs::copy(built, &partial).and_then(|_| fs::rename(&partial, output));
    result.map_err(|source| {
        let _ = fs::remove_file(&partial);
        CompileError::Install {
            path: output.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records the workspace it was handed and writes a fake binary into it.
    struct FakeToolchain {
        fail: bool,
        seen: RefCell<Option<(PathBuf, String)>>,
    }

    impl FakeToolchain {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                seen: RefCell::new(None),
            }
        }
    }

    impl Toolchain for FakeToolchain {
        fn build(&self, workspace: &BuildWorkspace) -> Result<PathBuf, ToolchainError> {
            let main_rs = fs::read_to_string(workspace.path().join("src/main.rs")).unwrap();
            *self.seen.borrow_mut() = Some((workspace.path().to_path_buf(), main_rs));

            if self.fail {
                return Err(ToolchainError::MissingArtifact(workspace.target_dir()));
            }
            let artifact = workspace.target_dir().join("embedded-site");
            fs::create_dir_all(workspace.target_dir()).unwrap();
            fs::write(&artifact, "binary").unwrap();
            Ok(artifact)
        }
    }

    fn site(temp: &TempDir) -> CompileRequest {
        let root = temp.path().join("root_http");
        fs::create_dir_all(&root).unwrap();
        fs::write(
            root.join("greet.html"),
            r#"<% who = "World" %><h1>Hello <%= who %></h1>"#,
        )
        .unwrap();
        fs::write(
            temp.path().join("routes.xml"),
            r#"<routes><route path="/greet" file="greet.html"><methods>GET</methods></route></routes>"#,
        )
        .unwrap();

        CompileRequest {
            root,
            routes_file: temp.path().join("routes.xml"),
            output: temp.path().join("site-bin"),
            extensions: vec!["html".to_string()],
            engine_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
            settings: ServerConfig::default(),
        }
    }

    #[test]
    fn test_compile_installs_artifact() {
        let temp = TempDir::new().unwrap();
        let request = site(&temp);
        let toolchain = FakeToolchain::new(false);

        let report = compile(&request, &toolchain).unwrap();
        assert_eq!(report.templates, 1);
        assert_eq!(report.routes, 1);
        assert_eq!(fs::read_to_string(&request.output).unwrap(), "binary");

        let (workspace, main_rs) = toolchain.seen.borrow().clone().unwrap();
        assert!(main_rs.contains("\"greet.html\""));
        assert!(main_rs.contains(r#"("/greet", "greet.html", &["GET"])"#));
        assert!(!workspace.exists());
    }

    #[test]
    fn test_settings_reach_generated_program() {
        let temp = TempDir::new().unwrap();
        let mut request = site(&temp);
        request.settings.site.index = "home".to_string();
        let toolchain = FakeToolchain::new(false);

        compile(&request, &toolchain).unwrap();
        let (_, main_rs) = toolchain.seen.borrow().clone().unwrap();
        assert!(main_rs.contains("static SETTINGS: &str = "));
        assert!(main_rs.contains(r#"index = \"home\""#));
    }

    #[test]
    fn test_build_failure_leaves_no_artifact() {
        let temp = TempDir::new().unwrap();
        let request = site(&temp);
        let toolchain = FakeToolchain::new(true);

        let err = compile(&request, &toolchain).unwrap_err();
        assert_eq!(err.step(), CompileStep::Build);
        assert!(!request.output.exists());

        let (workspace, _) = toolchain.seen.borrow().clone().unwrap();
        assert!(!workspace.exists());
    }

    #[test]
    fn test_scan_failure_skips_build() {
        let temp = TempDir::new().unwrap();
        let mut request = site(&temp);
        request.root = temp.path().join("missing");
        let toolchain = FakeToolchain::new(false);

        let err = compile(&request, &toolchain).unwrap_err();
        assert_eq!(err.step(), CompileStep::Scan);
        assert!(toolchain.seen.borrow().is_none());
    }

    #[test]
    fn test_missing_routes_file_compiles_with_empty_table() {
        let temp = TempDir::new().unwrap();
        let mut request = site(&temp);
        request.routes_file = temp.path().join("absent.xml");

        let report = compile(&request, &FakeToolchain::new(false)).unwrap();
        assert_eq!(report.routes, 0);
    }

    #[test]
    fn test_unknown_engine_path() {
        let temp = TempDir::new().unwrap();
        let mut request = site(&temp);
        request.engine_path = temp.path().join("nowhere");

        let err = compile(&request, &FakeToolchain::new(false)).unwrap_err();
        assert_eq!(err.step(), CompileStep::Generate);
    }
}
