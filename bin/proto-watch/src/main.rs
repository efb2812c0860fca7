//! ---
//! pw_section: "03-cli-and-display"
//! pw_subsection: "binary"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Binary entrypoint for the proto-watch watcher."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
mod ui;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use proto_watch_common::config::DEFAULT_CONFIG_FILE;
use proto_watch_common::{init_tracing, AppConfig, LoadedAppConfig};
use proto_watch_core::{compiler_from_config, Generator, StatusBoard, WatchPipeline};
use tokio::signal;
use tracing::{error, info};

const SERVICE_NAME: &str = "proto-watch";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Regenerate protobuf schemas from Go structs as the sources change",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Log to the console instead of showing the status display")]
    headless: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Watch the configured folder and regenerate schemas (default)")]
    Watch,
    #[command(about = "Generate schemas for the given source files once")]
    Generate {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
        #[arg(long, help = "Run the configured compilers on every written schema")]
        compile: bool,
    },
    #[command(about = "Validate the configuration and print the resolved folders")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = load_config(cli.config.as_deref())?;
    let command = cli.command.unwrap_or(Commands::Watch);

    let console = !matches!(command, Commands::Watch) || cli.headless;
    init_tracing(SERVICE_NAME, &loaded.config.logging, console)?;
    info!(config = %loaded.source.display(), "configuration loaded");

    match command {
        Commands::Watch => run_watch(loaded.config, cli.headless).await,
        Commands::Generate { files, compile } => run_generate(&loaded.config, files, compile).await,
        Commands::CheckConfig => check_config(&loaded),
    }
}

/// `--config` wins over `PROTO_WATCH_CONFIG`, which wins over the default
/// file in the working directory.
fn load_config(explicit: Option<&Path>) -> Result<LoadedAppConfig> {
    if let Some(path) = explicit {
        let config = AppConfig::from_path(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?;
        return Ok(LoadedAppConfig {
            config,
            source: path.to_path_buf(),
        });
    }
    AppConfig::load_with_source(&[PathBuf::from(DEFAULT_CONFIG_FILE)])
        .context("failed to load configuration")
}

async fn run_watch(config: AppConfig, headless: bool) -> Result<()> {
    config
        .prepare_directories()
        .context("cannot start watching")?;

    let status = StatusBoard::new();
    let pipeline = WatchPipeline::from_config(&config, compiler_from_config(&config), status.clone());
    let handle = pipeline.start().await?;

    if headless {
        info!(folder = %handle.watch_dir().display(), "running headless; waiting for termination signal");
        wait_for_shutdown_signal().await?;
        info!("termination signal received; shutting down");
    } else {
        let folder = handle.watch_dir().to_path_buf();
        tokio::task::spawn_blocking(move || ui::run(&folder, &status))
            .await
            .context("status display task failed")??;
        info!("status display closed; shutting down");
    }

    handle.shutdown().await?;
    Ok(())
}

async fn run_generate(config: &AppConfig, files: Vec<PathBuf>, compile: bool) -> Result<()> {
    std::fs::create_dir_all(&config.out_folder).with_context(|| {
        format!("failed to create output folder {}", config.out_folder.display())
    })?;
    let generator = Generator::from_config(config);
    let compiler = compile.then(|| compiler_from_config(config));

    let total = files.len();
    let mut failures = 0usize;
    for file in files {
        let attempt = {
            let generator = generator.clone();
            let source = file.clone();
            tokio::task::spawn_blocking(move || generator.generate(&source)).await?
        };
        match attempt {
            Ok(Some(completion)) => {
                println!("{}", completion.schema_path().display());
                if let Some(compiler) = &compiler {
                    compiler.compile(completion).await;
                }
            }
            Ok(None) => println!("{}: no struct declarations", file.display()),
            Err(err) => {
                error!(source = %file.display(), error = %err, "generation failed");
                eprintln!("{}: {err}", file.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {total} files failed to generate");
    }
    Ok(())
}

fn check_config(loaded: &LoadedAppConfig) -> Result<()> {
    let config = &loaded.config;
    println!("Configuration: {}", loaded.source.display());
    println!("Watch folder: {}", config.watch_folder.display());
    println!("Output folder: {}", config.out_folder.display());
    println!("Generation folder: {}", config.gen_folder.display());
    println!("Go package option: {}", config.go_package());
    println!(
        "Sources: *{} (excluding *{})",
        config.source_suffix, config.generated_suffix
    );
    if config.compiler.enabled {
        let client = config.compiler.client_generator.as_deref().unwrap_or("none");
        println!("Compilers: {} / {}", config.compiler.protoc, client);
    } else {
        println!("Compilers: disabled");
    }
    if !config.watch_folder.is_dir() {
        bail!(
            "watch folder {} does not exist",
            config.watch_folder.display()
        );
    }
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    signal::ctrl_c().await?;
    Ok(())
}
