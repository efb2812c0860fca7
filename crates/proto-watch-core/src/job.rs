//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Primary watch pipeline and generation lifecycle."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use proto_watch_common::AppConfig;
use proto_watch_schema::SCHEMA_EXTENSION;

/// Decides which files in the watched folder are generation sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter {
    source_suffix: String,
    generated_suffix: String,
}

impl SourceFilter {
    pub fn new(source_suffix: impl Into<String>, generated_suffix: impl Into<String>) -> Self {
        Self {
            source_suffix: source_suffix.into(),
            generated_suffix: generated_suffix.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.source_suffix, &config.generated_suffix)
    }

    /// True for `*.go` style sources that are not themselves generated
    /// artifacts such as `*.pb.go`.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        name.ends_with(&self.source_suffix) && !name.ends_with(&self.generated_suffix)
    }

    /// File name with the source suffix removed: `models/users.go` gives
    /// `users`.
    pub fn base_name(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        let base = name.strip_suffix(&self.source_suffix)?;
        (!base.is_empty()).then(|| base.to_owned())
    }
}

/// Completion signal of one successful generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationComplete {
    pub base_name: String,
    pub output_dir: PathBuf,
}

impl GenerationComplete {
    pub fn new(base_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_name: base_name.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Location of the written schema document.
    pub fn schema_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{SCHEMA_EXTENSION}", self.base_name))
    }
}
