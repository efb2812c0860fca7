//! ---
//! pw_section: "02-schema-generation"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Struct-to-schema translation primitives."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! Source type to schema type mapping.
//!
//! The mapping is total: anything without a dedicated rule becomes `string`.
use std::fmt;

use crate::types::SourceType;

/// Schema type used for `time.Time` fields.
pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";

const FALLBACK_SCALAR: &str = "string";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaType {
    Scalar(&'static str),
    /// Reference to another message declared in the same document.
    Message(String),
    WellKnown(&'static str),
    Repeated(Box<SchemaType>),
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::Scalar(name) | SchemaType::WellKnown(name) => f.write_str(name),
            SchemaType::Message(name) => f.write_str(name),
            SchemaType::Repeated(element) => write!(f, "repeated {element}"),
        }
    }
}

/// Scalar schema type for a builtin Go identifier.
pub fn scalar_for(ident: &str) -> Option<&'static str> {
    let scalar = match ident {
        "int" | "int32" => "int32",
        "int64" => "int64",
        "uint" | "uint32" => "uint32",
        "uint64" => "uint64",
        "float32" => "float",
        "float64" => "double",
        "string" => "string",
        "bool" => "bool",
        _ => return None,
    };
    Some(scalar)
}

/// Map a field type onto its schema type.
///
/// `is_known` reports whether a bare identifier names an aggregate declared
/// in the same file. Known names win over the scalar table.
pub fn map_type(source: &SourceType, is_known: &dyn Fn(&str) -> bool) -> SchemaType {
    match source {
        SourceType::Ident(name) if is_known(name) => SchemaType::Message(name.clone()),
        SourceType::Ident(name) => SchemaType::Scalar(scalar_for(name).unwrap_or(FALLBACK_SCALAR)),
        SourceType::Qualified { package, name } if package == "time" && name == "Time" => {
            SchemaType::WellKnown(TIMESTAMP_TYPE)
        }
        SourceType::Sequence(element) => SchemaType::Repeated(Box::new(map_type(element, is_known))),
        SourceType::Qualified { .. } | SourceType::Other(_) => SchemaType::Scalar(FALLBACK_SCALAR),
    }
}
