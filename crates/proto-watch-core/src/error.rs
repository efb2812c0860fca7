//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Primary watch pipeline and generation lifecycle."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use std::path::PathBuf;

use proto_watch_schema::SchemaError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("{path:?} is not a watched source file")]
    NotSource { path: PathBuf },
    #[error("failed to watch {path:?}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to list {path:?}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("background task failed")]
    Task(#[from] tokio::task::JoinError),
}
