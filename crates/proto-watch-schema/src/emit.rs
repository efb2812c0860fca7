//! ---
//! pw_section: "02-schema-generation"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Struct-to-schema translation primitives."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! proto3 document rendering and writing.
//!
//! A document is rendered completely in memory, written to a temporary file
//! next to the target and renamed over it. Readers of the target therefore
//! see either the previous document or the new one, never a mix.
use std::fmt;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::mapper::map_type;
use crate::service::{PairingPolicy, ServiceCandidates};
use crate::types::Aggregates;

/// File extension of emitted documents.
pub const SCHEMA_EXTENSION: &str = "proto";

const SYNTAX: &str = "proto3";
const WELL_KNOWN_IMPORT: &str = "google/protobuf/timestamp.proto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Value of the `package` statement.
    pub package: String,
    /// Value of `option go_package`, e.g. `./gen;gen`.
    pub go_package: String,
    pub pairing: PairingPolicy,
}

impl EmitOptions {
    pub fn new(package: impl Into<String>, go_package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            go_package: go_package.into(),
            pairing: PairingPolicy::default(),
        }
    }

    pub fn with_pairing(mut self, pairing: PairingPolicy) -> Self {
        self.pairing = pairing;
        self
    }
}

/// Borrowed view of everything that goes into one document.
pub struct SchemaDocument<'a> {
    options: &'a EmitOptions,
    aggregates: &'a Aggregates,
    services: &'a ServiceCandidates,
}

impl<'a> SchemaDocument<'a> {
    pub fn new(
        options: &'a EmitOptions,
        aggregates: &'a Aggregates,
        services: &'a ServiceCandidates,
    ) -> Self {
        Self {
            options,
            aggregates,
            services,
        }
    }
}

impl fmt::Display for SchemaDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "syntax = \"{SYNTAX}\";\n")?;
        writeln!(f, "package {};\n", self.options.package)?;
        writeln!(f, "option go_package = \"{}\";\n", self.options.go_package)?;
        writeln!(f, "import \"{WELL_KNOWN_IMPORT}\";\n")?;

        let is_known = |name: &str| self.aggregates.contains_key(name);
        for aggregate in self.aggregates.values() {
            writeln!(f, "message {} {{", aggregate.name)?;
            for (index, field) in aggregate.fields.iter().enumerate() {
                let schema_type = map_type(&field.source_type, &is_known);
                writeln!(f, "  {} {} = {};", schema_type, field.serialized_name, index + 1)?;
            }
            writeln!(f, "}}\n")?;
        }

        let methods = self.services.methods(self.options.pairing);
        if let Some(first) = methods.first() {
            writeln!(f, "service {}Service {{", first.name)?;
            for method in &methods {
                writeln!(
                    f,
                    "  rpc {}({}) returns ({});",
                    method.name, method.request, method.response
                )?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

/// Renders documents with fixed options and writes them atomically.
#[derive(Debug, Clone)]
pub struct SchemaEmitter {
    options: EmitOptions,
}

impl SchemaEmitter {
    pub fn new(options: EmitOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, aggregates: &Aggregates, services: &ServiceCandidates) -> String {
        SchemaDocument::new(&self.options, aggregates, services).to_string()
    }

    /// Render and write one document to `output_path`, replacing any
    /// previous file.
    pub fn emit(
        &self,
        output_path: &Path,
        aggregates: &Aggregates,
        services: &ServiceCandidates,
    ) -> Result<()> {
        let document = self.render(aggregates, services);
        write_replacing(output_path, document.as_bytes()).map_err(|source| SchemaError::Write {
            path: output_path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %output_path.display(),
            messages = aggregates.len(),
            bytes = document.len(),
            "schema document written"
        );
        Ok(())
    }
}

fn write_replacing(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".proto-watch-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregateType, Field, SourceType};
    use tempfile::tempdir;

    fn options() -> EmitOptions {
        EmitOptions::new("proto", "./gen;gen")
    }

    fn aggregates(list: Vec<AggregateType>) -> Aggregates {
        list.into_iter().map(|a| (a.name.clone(), a)).collect()
    }

    #[test]
    fn renders_header_and_numbered_fields() {
        let input = aggregates(vec![AggregateType::new(
            "Foo",
            vec![
                Field::new("A", SourceType::ident("int")),
                Field::new("B", SourceType::ident("string")).with_serialized_name("b"),
            ],
        )]);
        let rendered = SchemaEmitter::new(options()).render(&input, &ServiceCandidates::new());

        assert_eq!(
            rendered,
            "syntax = \"proto3\";\n\n\
             package proto;\n\n\
             option go_package = \"./gen;gen\";\n\n\
             import \"google/protobuf/timestamp.proto\";\n\n\
             message Foo {\n  int32 A = 1;\n  string b = 2;\n}\n\n"
        );
    }

    #[test]
    fn renders_service_block_after_messages() {
        let input = aggregates(vec![
            AggregateType::new("FooRequest", vec![Field::new("Id", SourceType::ident("int64"))]),
            AggregateType::new("FooResponse", vec![]),
        ]);
        let services = ServiceCandidates::from_aggregates(&input);
        let rendered = SchemaEmitter::new(options()).render(&input, &services);

        assert!(rendered.ends_with(
            "message FooResponse {\n}\n\n\
             service FooService {\n  rpc Foo(FooRequest) returns (FooResponse);\n}\n"
        ));
        assert_eq!(rendered.matches("rpc ").count(), 1);
    }

    #[test]
    fn paired_policy_drops_half_methods() {
        let input = aggregates(vec![AggregateType::new("PingRequest", vec![])]);
        let services = ServiceCandidates::from_aggregates(&input);

        let permissive = SchemaEmitter::new(options()).render(&input, &services);
        assert!(permissive.contains("service PingService {"));

        let strict = SchemaEmitter::new(options().with_pairing(PairingPolicy::RequirePaired))
            .render(&input, &services);
        assert!(!strict.contains("service"));
    }

    #[test]
    fn nested_references_use_message_names() {
        let input = aggregates(vec![
            AggregateType::new(
                "User",
                vec![
                    Field::new("Home", SourceType::ident("Address")),
                    Field::new("Past", SourceType::sequence_of(SourceType::ident("Address"))),
                ],
            ),
            AggregateType::new("Address", vec![Field::new("Street", SourceType::ident("string"))]),
        ]);
        let rendered = SchemaEmitter::new(options()).render(&input, &ServiceCandidates::new());
        assert!(rendered.contains("  Address Home = 1;\n  repeated Address Past = 2;\n"));
    }

    #[test]
    fn emit_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("users.proto");
        std::fs::write(&target, "stale").unwrap();

        let input = aggregates(vec![AggregateType::new("User", vec![])]);
        let emitter = SchemaEmitter::new(options());
        emitter.emit(&target, &input, &ServiceCandidates::new()).unwrap();

        let written = std::fs::read_to_string(&target).unwrap();
        assert_eq!(written, emitter.render(&input, &ServiceCandidates::new()));
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn emit_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("missing").join("users.proto");
        let err = SchemaEmitter::new(options())
            .emit(&target, &Aggregates::new(), &ServiceCandidates::new())
            .unwrap_err();
        assert!(matches!(err, SchemaError::Write { .. }));
        assert!(!target.exists());
    }
}
