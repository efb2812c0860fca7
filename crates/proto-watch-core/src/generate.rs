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
use proto_watch_schema::{
    EmitOptions, PairingPolicy, SchemaEmitter, ServiceCandidates, StructExtractor,
};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::job::{GenerationComplete, SourceFilter};

/// Runs the extract, infer and emit chain for single source files.
#[derive(Debug, Clone)]
pub struct Generator {
    filter: SourceFilter,
    emitter: SchemaEmitter,
    output_dir: PathBuf,
}

impl Generator {
    pub fn new(filter: SourceFilter, emitter: SchemaEmitter, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            filter,
            emitter,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let options = EmitOptions::new(&config.package, config.go_package())
            .with_pairing(PairingPolicy::from_required(config.require_paired_rpc));
        Self::new(
            SourceFilter::from_config(config),
            SchemaEmitter::new(options),
            &config.out_folder,
        )
    }

    pub fn filter(&self) -> &SourceFilter {
        &self.filter
    }

    /// One generation attempt for `source`.
    ///
    /// Returns `Ok(None)` when the file declares no structs; nothing is
    /// written in that case. Blocking: run it off the async executor.
    pub fn generate(&self, source: &Path) -> Result<Option<GenerationComplete>> {
        let base_name = self
            .filter
            .base_name(source)
            .ok_or_else(|| PipelineError::NotSource {
                path: source.to_path_buf(),
            })?;

        let aggregates = StructExtractor::new()?.extract(source)?;
        if aggregates.is_empty() {
            debug!(source = %source.display(), "no struct declarations; nothing to emit");
            return Ok(None);
        }

        let services = ServiceCandidates::from_aggregates(&aggregates);
        let completion = GenerationComplete::new(base_name, &self.output_dir);
        self.emitter
            .emit(&completion.schema_path(), &aggregates, &services)?;
        Ok(Some(completion))
    }
}
