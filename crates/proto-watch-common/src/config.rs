//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Shared primitives and utilities for the watcher runtime."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::logging::LogFormat;

/// File name probed in the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "proto-watch.yaml";

fn default_package() -> String {
    "proto".to_owned()
}

fn default_source_suffix() -> String {
    ".go".to_owned()
}

fn default_generated_suffix() -> String {
    ".pb.go".to_owned()
}

fn default_compiler_enabled() -> bool {
    true
}

fn default_protoc() -> String {
    "protoc".to_owned()
}

fn default_client_generator() -> Option<String> {
    Some("pbjs".to_owned())
}

fn default_client_out_folder() -> PathBuf {
    PathBuf::from("ts-gen")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration from {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration at {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to parse configuration")]
    Syntax(#[from] serde_yaml::Error),
    #[error("configuration validation failed:\n{details}")]
    Validation { details: String },
    #[error("no configuration file found. inspected: {inspected}")]
    NotFound { inspected: String },
    #[error("watch folder {path:?} does not exist")]
    MissingWatchFolder { path: PathBuf },
}

/// Primary configuration object, read from `proto-watch.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    /// Directory whose Go sources are translated.
    pub watch_folder: PathBuf,
    /// Directory receiving the generated `.proto` documents.
    pub out_folder: PathBuf,
    /// Directory the schema compiler writes Go bindings into.
    pub gen_folder: PathBuf,
    #[serde(default = "default_package")]
    pub package: String,
    #[serde(default = "default_source_suffix")]
    pub source_suffix: String,
    #[serde(default = "default_generated_suffix")]
    pub generated_suffix: String,
    /// Coalescing window per path in milliseconds; `0` dispatches every event.
    #[serde(default)]
    pub debounce_ms: u64,
    /// Only emit an rpc when both the request and the response type exist.
    #[serde(default)]
    pub require_paired_rpc: bool,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "PROTO_WATCH_CONFIG";

    /// Build a configuration with defaults for everything but the folders.
    pub fn new(
        watch_folder: impl Into<PathBuf>,
        out_folder: impl Into<PathBuf>,
        gen_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            watch_folder: watch_folder.into(),
            out_folder: out_folder.into(),
            gen_folder: gen_folder.into(),
            package: default_package(),
            source_suffix: default_source_suffix(),
            generated_suffix: default_generated_suffix(),
            debounce_ms: 0,
            require_paired_rpc: false,
            compiler: CompilerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from disk, respecting the `PROTO_WATCH_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, ConfigError> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(
        candidates: &[P],
    ) -> Result<LoadedAppConfig, ConfigError> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(ConfigError::NotFound {
            inspected: candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants. Folder existence is checked separately
    /// by [`AppConfig::prepare_directories`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        for (key, path) in [
            ("watch-folder", &self.watch_folder),
            ("out-folder", &self.out_folder),
            ("gen-folder", &self.gen_folder),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(format!("{key} may not be empty"));
            }
        }

        if !is_package_name(&self.package) {
            errors.push(format!(
                "package '{}' is not a valid protobuf package name",
                self.package
            ));
        }
        if self.source_suffix.trim().is_empty() {
            errors.push("source-suffix may not be empty".to_owned());
        }
        if self.generated_suffix.trim().is_empty() {
            errors.push("generated-suffix may not be empty".to_owned());
        }
        if self.compiler.enabled && self.compiler.protoc.trim().is_empty() {
            errors.push("compiler.protoc may not be empty while the compiler is enabled".to_owned());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation {
                details: errors.join("\n"),
            })
        }
    }

    /// Ensure the watch folder exists and create the output folders on demand.
    ///
    /// A missing watch folder is fatal. Output folders that cannot be created
    /// are logged and left for the generation attempts to report.
    pub fn prepare_directories(&self) -> Result<(), ConfigError> {
        if !self.watch_folder.is_dir() {
            return Err(ConfigError::MissingWatchFolder {
                path: self.watch_folder.clone(),
            });
        }

        let mut required = vec![&self.out_folder, &self.gen_folder];
        if self.compiler.enabled && self.compiler.client_generator.is_some() {
            required.push(&self.compiler.client_out_folder);
        }
        for folder in required {
            if folder.exists() {
                continue;
            }
            info!(folder = %folder.display(), "folder does not exist; creating");
            if let Err(err) = fs::create_dir_all(folder) {
                warn!(folder = %folder.display(), error = %err, "failed to create folder");
            }
        }
        Ok(())
    }

    /// Value of the `go_package` option written into every schema document.
    pub fn go_package(&self) -> String {
        let folder = self.gen_folder.to_string_lossy().replace('\\', "/");
        let folder = folder.trim_start_matches("./");
        format!("./{folder};gen")
    }
}

impl std::str::FromStr for AppConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

fn is_package_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// External tool invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompilerConfig {
    #[serde(default = "default_compiler_enabled")]
    pub enabled: bool,
    #[serde(default = "default_protoc")]
    pub protoc: String,
    /// Client stub generator; `null` skips client generation.
    #[serde(default = "default_client_generator")]
    pub client_generator: Option<String>,
    #[serde(default = "default_client_out_folder")]
    pub client_out_folder: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            enabled: default_compiler_enabled(),
            protoc: default_protoc(),
            client_generator: default_client_generator(),
            client_out_folder: default_client_out_folder(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINIMAL: &str = "watch-folder: src/models\nout-folder: proto\ngen-folder: gen\n";

    #[test]
    fn minimal_document_uses_defaults() {
        let config: AppConfig = MINIMAL.parse().unwrap();
        assert_eq!(config.watch_folder, PathBuf::from("src/models"));
        assert_eq!(config.package, "proto");
        assert_eq!(config.source_suffix, ".go");
        assert_eq!(config.generated_suffix, ".pb.go");
        assert_eq!(config.debounce_ms, 0);
        assert!(!config.require_paired_rpc);
        assert!(config.compiler.enabled);
        assert_eq!(config.compiler.client_generator.as_deref(), Some("pbjs"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn missing_required_folder_is_rejected() {
        let err = "watch-folder: src\nout-folder: proto\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Syntax(_)));
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut config = AppConfig::new("src", "proto", "gen");
        config.package = "1bad".into();
        config.generated_suffix = String::new();
        let err = config.validate().unwrap_err();
        let ConfigError::Validation { details } = err else {
            panic!("expected validation error");
        };
        assert!(details.contains("package '1bad'"));
        assert!(details.contains("generated-suffix"));
    }

    #[test]
    fn dotted_package_names_are_accepted() {
        let mut config = AppConfig::new("src", "proto", "gen");
        config.package = "acme.users.v1".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn go_package_is_relative_to_gen_folder() {
        assert_eq!(AppConfig::new("a", "b", "gen").go_package(), "./gen;gen");
        assert_eq!(
            AppConfig::new("a", "b", "./pkg/gen").go_package(),
            "./pkg/gen;gen"
        );
    }

    #[test]
    fn load_with_source_uses_first_existing_candidate() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let present = dir.path().join("proto-watch.yaml");
        fs::write(&present, MINIMAL).unwrap();

        let loaded = AppConfig::load_with_source(&[&missing, &present]).unwrap();
        assert_eq!(loaded.source, present);
        assert_eq!(loaded.config.out_folder, PathBuf::from("proto"));
    }

    #[test]
    fn load_reports_inspected_candidates() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = AppConfig::load(&[&missing]).unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn prepare_directories_requires_watch_folder() {
        let dir = tempdir().unwrap();
        let config = AppConfig::new(dir.path().join("absent"), dir.path().join("out"), "gen");
        assert!(matches!(
            config.prepare_directories(),
            Err(ConfigError::MissingWatchFolder { .. })
        ));
    }

    #[test]
    fn prepare_directories_creates_output_folders() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::new(
            dir.path(),
            dir.path().join("proto"),
            dir.path().join("gen"),
        );
        config.compiler.client_out_folder = dir.path().join("ts-gen");
        config.prepare_directories().unwrap();
        assert!(dir.path().join("proto").is_dir());
        assert!(dir.path().join("gen").is_dir());
        assert!(dir.path().join("ts-gen").is_dir());
    }
}
