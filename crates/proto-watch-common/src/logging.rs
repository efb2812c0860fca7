//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Shared primitives and utilities for the watcher runtime."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, Level};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "PROTO_WATCH_LOG";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static STDOUT_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// * `PROTO_WATCH_LOG` overrides the log filter (e.g. `info`, `debug,notify=warn`).
///   When unset the standard `RUST_LOG` variable is honoured, finally defaulting to
///   `info`.
/// * A rolling daily JSON log file is always written. The console layer is only
///   installed when `console` is set, since the terminal display owns stdout.
pub fn init_tracing(service_name: &str, config: &LoggingConfig, console: bool) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config
        .file_prefix
        .clone()
        .unwrap_or_else(|| service_name.to_owned());

    let file_appender = daily(&config.directory, format!("{prefix}.log"));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = FILE_GUARD.set(file_guard);

    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to info logging");
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let console_layer = if console {
        let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
        let _ = STDOUT_GUARD.set(stdout_guard);
        let layer = match config.format {
            LogFormat::StructuredJson => fmt::layer()
                .with_target(false)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .with_writer(stdout_writer)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_target(false)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(stdout_writer)
                .boxed(),
        };
        Some(layer)
    } else {
        None
    };

    let file_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(service = %service_name, log_dir = %config.directory.display(), format = ?config.format, console, "tracing initialised");
    Ok(())
}

/// Structured context attached to pipeline lifecycle events.
#[derive(Debug, Default, Clone)]
pub struct EventContext<'a> {
    /// Source file the event concerns.
    pub source: Option<&'a str>,
    /// Schema document the event concerns.
    pub schema: Option<&'a str>,
}

impl<'a> EventContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_schema(mut self, schema: &'a str) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Success,
    Skipped,
    Fault,
}

impl EventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Success => "success",
            EventOutcome::Skipped => "skipped",
            EventOutcome::Fault => "fault",
        }
    }

    fn level(&self) -> Level {
        match self {
            EventOutcome::Success | EventOutcome::Skipped => Level::INFO,
            EventOutcome::Fault => Level::ERROR,
        }
    }
}

/// Emit a standardized pipeline event such as `generation.completed`.
pub fn log_pipeline_event(
    context: Option<&EventContext>,
    event: &str,
    message: &str,
    outcome: EventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    let source = ctx.source.unwrap_or("");
    let schema = ctx.schema.unwrap_or("");
    // `tracing::event!` needs a constant level, hence the explicit branches.
    if outcome.level() == Level::ERROR {
        tracing::error!(
            event,
            outcome = outcome.as_str(),
            source,
            schema,
            message = %message
        );
    } else {
        tracing::info!(
            event,
            outcome = outcome.as_str(),
            source,
            schema,
            message = %message
        );
    }
}
