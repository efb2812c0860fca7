//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Shared primitives and utilities for the watcher runtime."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! Shared primitives for the proto-watch workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the pipeline and the command line binary.

pub mod config;
pub mod logging;

pub use config::{AppConfig, CompilerConfig, ConfigError, LoadedAppConfig, LoggingConfig};
pub use logging::{init_tracing, log_pipeline_event, EventContext, EventOutcome, LogFormat};
