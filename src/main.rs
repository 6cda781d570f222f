//! Template server.
//!
//! # Architecture Overview
//!
//! ```text
//!   serve:    request ──▶ http::server ──▶ routing ──▶ template registry
//!                                                          │
//!             response ◀── http::response ◀── directive processor
//!
//!   compile:  root dir ──▶ scan ──▶ codegen ──▶ workspace ──▶ cargo ──▶ artifact
//! ```
//!
//! Without a subcommand the binary serves `--root` through the routes in
//! `--config`. `compile` freezes the same site into a standalone binary.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use template_server::compile::{self, Cargo, CompileRequest};
use template_server::config::loader::load_config;
use template_server::config::validation::validate_config;
use template_server::config::ServerConfig;
use template_server::lifecycle::{self, Site};
use template_server::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "template-server")]
#[command(about = "Serves and compiles directive templates", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile the site into a standalone binary
    Compile {
        #[command(flatten)]
        site: SiteArgs,

        /// Output binary path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct SiteArgs {
    /// Template root directory
    #[arg(short, long)]
    root: Option<String>,

    /// Route configuration (XML)
    #[arg(short = 'c', long = "config")]
    routes: Option<String>,

    /// Server settings (TOML)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[command(flatten)]
    site: SiteArgs,

    /// Port to run the server on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log template root changes
    #[arg(short, long)]
    watch: bool,
}

impl SiteArgs {
    fn load(&self) -> Result<ServerConfig, String> {
        let mut config = match &self.settings {
            Some(path) => load_config(path).map_err(|e| format!("{}: {}", path.display(), e))?,
            None => ServerConfig::default(),
        };
        if let Some(root) = &self.root {
            config.site.root = root.clone();
        }
        if let Some(routes) = &self.routes {
            config.site.routes_file = routes.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        Ok(config)
    }
}

fn settings(site: &SiteArgs, apply: impl FnOnce(&mut ServerConfig)) -> Result<ServerConfig, String> {
    let mut config = site.load()?;
    apply(&mut config);
    validate_config(&config).map_err(|errors| {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    })?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (site_args, command) = match &cli.command {
        Some(Commands::Compile { site, .. }) => (site, cli.command.as_ref()),
        None => (&cli.serve.site, None),
    };

    let config = settings(site_args, |config| match command {
        Some(Commands::Compile { output, .. }) => {
            if let Some(output) = output {
                config.compile.output = output.display().to_string();
            }
        }
        None => {
            if let Some(port) = cli.serve.port {
                config.listener.set_port(port);
            }
            config.site.watch |= cli.serve.watch;
        }
    });

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "template-server starting");

    match command {
        Some(Commands::Compile { .. }) => run_compile(config).await,
        None => run_serve(config).await,
    }
}

async fn run_serve(config: ServerConfig) -> ExitCode {
    if !Path::new(&config.site.root).is_dir() {
        tracing::warn!(root = %config.site.root, "Template root does not exist");
    }

    let site = Site::from_filesystem(&config);
    match lifecycle::serve(config, site).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_compile(config: ServerConfig) -> ExitCode {
    let request = CompileRequest::from_config(&config);
    let toolchain = Cargo::from_config(&config.compile);

    let result =
        tokio::task::spawn_blocking(move || compile::compile(&request, &toolchain)).await;

    match result {
        Ok(Ok(report)) => {
            tracing::info!(
                artifact = %report.artifact.display(),
                templates = report.templates,
                routes = report.routes,
                missing_includes = report.missing_includes.len(),
                "Compiled"
            );
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            tracing::error!(step = %e.step(), error = %e, "Compilation failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Compilation task failed");
            ExitCode::FAILURE
        }
    }
}
