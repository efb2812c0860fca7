//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Primary watch pipeline and generation lifecycle."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
pub mod compiler;
pub mod debounce;
pub mod error;
pub mod generate;
pub mod job;
pub mod pipeline;
pub mod status;

pub use compiler::{compiler_from_config, NoopCompiler, ProtocCompiler, SchemaCompiler};
pub use error::{PipelineError, Result};
pub use generate::Generator;
pub use job::{GenerationComplete, SourceFilter};
pub use pipeline::{PipelineHandle, PipelineState, WatchPipeline};
pub use status::{StatusBoard, INITIAL_STATUS};
