//! ---
//! pw_section: "02-schema-generation"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Struct-to-schema translation primitives."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read source file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: syntax error at line {line}, column {column}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
    },
    #[error("parser produced no syntax tree for {path:?}")]
    NoTree { path: PathBuf },
    #[error("go grammar could not be loaded: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    #[error("failed to write schema document {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SchemaError {
    /// Whether the error stems from malformed source rather than I/O.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, SchemaError::Parse { .. } | SchemaError::NoTree { .. })
    }
}
