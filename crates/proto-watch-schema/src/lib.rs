//! ---
//! pw_section: "02-schema-generation"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Struct-to-schema translation primitives."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! Translates Go struct declarations into proto3 schema documents.
//!
//! The translation runs in four steps, each in its own module:
//! [`extract`] parses a source file into [`AggregateType`]s, [`mapper`] maps
//! field types onto schema types, [`service`] infers rpc methods from
//! `<Name>Request`/`<Name>Response` pairs and [`emit`] renders and writes the
//! document.

pub mod emit;
pub mod error;
pub mod extract;
pub mod mapper;
pub mod service;
pub mod tag;
pub mod types;

pub use emit::{EmitOptions, SchemaDocument, SchemaEmitter, SCHEMA_EXTENSION};
pub use error::{Result, SchemaError};
pub use extract::{extract_structs, StructExtractor};
pub use mapper::{map_type, SchemaType, TIMESTAMP_TYPE};
pub use service::{infer, PairingPolicy, RpcMethod, ServiceCandidate, ServiceCandidates, ServiceSide};
pub use types::{AggregateType, Aggregates, Field, SourceType};
