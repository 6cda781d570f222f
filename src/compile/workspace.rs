//! Temporary build directory for a generated program.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::codegen::GeneratedProgram;

/// A generated package on disk. The directory is removed on drop, whether the
/// build succeeded or not.
#[derive(Debug)]
pub struct BuildWorkspace {
    dir: TempDir,
}

impl BuildWorkspace {
    /// Write `program` into a fresh temporary directory.
    pub fn materialize(program: &GeneratedProgram) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("template-server-compile-")
            .tempdir()?;

        fs::create_dir_all(dir.path().join("src"))?;
        fs::write(dir.path().join("Cargo.toml"), &program.manifest)?;
        fs::write(dir.path().join("src").join("main.rs"), &program.main_rs)?;

        tracing::debug!(path = %dir.path().display(), "Build workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join("Cargo.toml")
    }

    pub fn target_dir(&self) -> PathBuf {
        self.path().join("target")
    }
}
