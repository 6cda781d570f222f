//! Invocation of the Rust toolchain on a build workspace.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::codegen::GENERATED_BIN;
use super::workspace::BuildWorkspace;
use crate::config::CompileConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Error type for toolchain runs.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("failed to start {program:?}: {source}")]
    Spawn {
        program: OsString,
        #[source]
        source: io::Error,
    },

    #[error("build failed with {status}")]
    Failed { status: ExitStatus },

    #[error("build did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("build succeeded but {0} was not produced")]
    MissingArtifact(PathBuf),

    #[error("failed to wait for build: {0}")]
    Wait(#[source] io::Error),
}

/// Builds a workspace into an executable.
pub trait Toolchain {
    /// Build `workspace` and return the path of the produced binary.
    fn build(&self, workspace: &BuildWorkspace) -> Result<PathBuf, ToolchainError>;
}

/// `cargo build` on the generated manifest.
#[derive(Debug, Clone)]
pub struct Cargo {
    program: OsString,
    release: bool,
    offline: bool,
    timeout: Option<Duration>,
}

impl Cargo {
    /// Uses `$CARGO` when set (as it is under `cargo run`), else `cargo`.
    pub fn from_config(config: &CompileConfig) -> Self {
        Self {
            program: env::var_os("CARGO").unwrap_or_else(|| OsString::from("cargo")),
            release: config.release,
            offline: config.offline,
            timeout: config.build_timeout_secs.map(Duration::from_secs),
        }
    }

    fn profile_dir(&self) -> &'static str {
        if self.release {
            "release"
        } else {
            "debug"
        }
    }

    fn command(&self, workspace: &BuildWorkspace) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("build")
            .arg("--manifest-path")
            .arg(workspace.manifest_path())
            .arg("--target-dir")
            .arg(workspace.target_dir());
        if self.release {
            cmd.arg("--release");
        }
        if self.offline {
            cmd.arg("--offline");
        }
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        cmd
    }

    fn wait(&self, mut child: std::process::Child) -> Result<ExitStatus, ToolchainError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(ToolchainError::Wait);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(ToolchainError::Wait)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                tracing::warn!(timeout = ?timeout, "Build timed out, killing cargo");
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolchainError::TimedOut(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Toolchain for Cargo {
    fn build(&self, workspace: &BuildWorkspace) -> Result<PathBuf, ToolchainError> {
        let mut cmd = self.command(workspace);
        tracing::info!(
            manifest = %workspace.manifest_path().display(),
            release = self.release,
            offline = self.offline,
            "Running cargo build"
        );

        let child = cmd.spawn().map_err(|source| ToolchainError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let status = self.wait(child)?;
        if !status.success() {
            return Err(ToolchainError::Failed { status });
        }

        let artifact = workspace
            .target_dir()
            .join(self.profile_dir())
            .join(format!("{}{}", GENERATED_BIN, env::consts::EXE_SUFFIX));
        if !artifact.is_file() {
            return Err(ToolchainError::MissingArtifact(artifact));
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::codegen::GeneratedProgram;

    fn workspace() -> BuildWorkspace {
        BuildWorkspace::materialize(&GeneratedProgram {
            manifest: String::new(),
            main_rs: String::new(),
        })
        .unwrap()
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_release_offline_command() {
        let config = CompileConfig {
            release: true,
            offline: true,
            ..CompileConfig::default()
        };
        let ws = workspace();
        let cmd = Cargo::from_config(&config).command(&ws);
        let args = args(&cmd);

        assert_eq!(args[0], "build");
        assert!(args.contains(&"--release".to_string()));
        assert!(args.contains(&"--offline".to_string()));
        assert!(args.contains(&ws.manifest_path().to_string_lossy().into_owned()));
    }

    #[test]
    fn test_debug_command() {
        let config = CompileConfig {
            release: false,
            ..CompileConfig::default()
        };
        let cargo = Cargo::from_config(&config);
        let args = args(&cargo.command(&workspace()));

        assert!(!args.contains(&"--release".to_string()));
        assert!(!args.contains(&"--offline".to_string()));
        assert_eq!(cargo.profile_dir(), "debug");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let cargo = Cargo {
            program: OsString::from("definitely-not-a-real-cargo-binary"),
            release: false,
            offline: false,
            timeout: None,
        };
        let err = cargo.build(&workspace()).unwrap_err();
        assert!(matches!(err, ToolchainError::Spawn { .. }));
    }
}
