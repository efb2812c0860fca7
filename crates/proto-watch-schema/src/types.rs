//! ---
//! pw_section: "02-schema-generation"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Struct-to-schema translation primitives."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use std::fmt;

use indexmap::IndexMap;

/// Shape of a field type as written in the Go source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Bare identifier: a builtin scalar or a type declared in the same file.
    Ident(String),
    /// `package.Name` reference.
    Qualified { package: String, name: String },
    /// Slice or array of the element type.
    Sequence(Box<SourceType>),
    /// Pointers, maps, channels, functions, generics and anonymous types.
    /// Holds the source text for diagnostics.
    Other(String),
}

impl SourceType {
    pub fn ident(name: impl Into<String>) -> Self {
        SourceType::Ident(name.into())
    }

    pub fn qualified(package: impl Into<String>, name: impl Into<String>) -> Self {
        SourceType::Qualified {
            package: package.into(),
            name: name.into(),
        }
    }

    pub fn sequence_of(element: SourceType) -> Self {
        SourceType::Sequence(Box::new(element))
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Ident(name) => f.write_str(name),
            SourceType::Qualified { package, name } => write!(f, "{package}.{name}"),
            SourceType::Sequence(element) => write!(f, "[]{element}"),
            SourceType::Other(text) => f.write_str(text),
        }
    }
}

/// One named field of a struct declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Identifier as declared in the struct.
    pub name: String,
    pub source_type: SourceType,
    /// Name written into the schema: the `json` tag name, else `name`.
    pub serialized_name: String,
}

impl Field {
    /// Field whose serialized name equals its declared name.
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        let name = name.into();
        Self {
            serialized_name: name.clone(),
            name,
            source_type,
        }
    }

    pub fn with_serialized_name(mut self, serialized_name: impl Into<String>) -> Self {
        self.serialized_name = serialized_name.into();
        self
    }
}

/// A struct declaration with its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateType {
    pub name: String,
    pub fields: Vec<Field>,
}

impl AggregateType {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// Struct declarations of one file keyed by name.
///
/// Insertion keeps the slot of the first declaration; a redeclaration
/// replaces the fields in place, so iteration follows source order.
pub type Aggregates = IndexMap<String, AggregateType>;
