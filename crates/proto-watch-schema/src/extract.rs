//! ---
//! pw_section: "02-schema-generation"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Struct-to-schema translation primitives."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! Struct declaration extraction from Go source files.
//!
//! Only top-level `type Name struct { ... }` declarations are recorded,
//! whether written alone or inside a grouped `type ( ... )` block. Aliases,
//! interfaces and named non-struct types are ignored.
use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;
use tree_sitter::{Language, Node, Parser};

use crate::error::{Result, SchemaError};
use crate::tag;
use crate::types::{AggregateType, Aggregates, Field, SourceType};

static GO_LANGUAGE: OnceLock<Language> = OnceLock::new();

fn go_language() -> Language {
    GO_LANGUAGE.get_or_init(|| tree_sitter_go::LANGUAGE.into()).clone()
}

/// Reusable Go parser producing [`Aggregates`].
pub struct StructExtractor {
    parser: Parser,
}

impl StructExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&go_language())?;
        Ok(Self { parser })
    }

    /// Read and parse `path`.
    pub fn extract(&mut self, path: &Path) -> Result<Aggregates> {
        let source = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.extract_source(path, &source)
    }

    /// Parse already loaded source text. `path` is only used for diagnostics.
    pub fn extract_source(&mut self, path: &Path, source: &str) -> Result<Aggregates> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| SchemaError::NoTree {
                path: path.to_path_buf(),
            })?;
        let root = tree.root_node();

        if let Some(error) = first_error(root) {
            let position = error.start_position();
            return Err(SchemaError::Parse {
                path: path.to_path_buf(),
                line: position.row + 1,
                column: position.column + 1,
            });
        }

        let mut aggregates = Aggregates::new();
        let mut cursor = root.walk();
        for declaration in root
            .named_children(&mut cursor)
            .filter(|node| node.kind() == "type_declaration")
        {
            let mut spec_cursor = declaration.walk();
            for spec in declaration
                .named_children(&mut spec_cursor)
                .filter(|node| node.kind() == "type_spec")
            {
                if let Some(aggregate) = struct_from_spec(&spec, source) {
                    aggregates.insert(aggregate.name.clone(), aggregate);
                }
            }
        }

        debug!(path = %path.display(), structs = aggregates.len(), "extracted struct declarations");
        Ok(aggregates)
    }
}

/// Parse `path` with a fresh extractor.
pub fn extract_structs(path: &Path) -> Result<Aggregates> {
    StructExtractor::new()?.extract(path)
}

fn struct_from_spec(spec: &Node, source: &str) -> Option<AggregateType> {
    let name = spec.child_by_field_name("name")?;
    let body = spec.child_by_field_name("type")?;
    if body.kind() != "struct_type" {
        return None;
    }

    let mut fields = Vec::new();
    if let Some(list) = find_child_by_kind(&body, "field_declaration_list") {
        let mut cursor = list.walk();
        for declaration in list
            .named_children(&mut cursor)
            .filter(|node| node.kind() == "field_declaration")
        {
            collect_fields(&declaration, source, &mut fields);
        }
    }

    Some(AggregateType::new(node_text(&name, source), fields))
}

/// Push one [`Field`] per declared name. Embedded fields carry no name and
/// contribute nothing.
fn collect_fields(declaration: &Node, source: &str, fields: &mut Vec<Field>) {
    let Some(type_node) = declaration.child_by_field_name("type") else {
        return;
    };
    let source_type = source_type(&type_node, source);
    let tag = declaration
        .child_by_field_name("tag")
        .and_then(|literal| tag::literal_value(node_text(&literal, source)));

    let mut cursor = declaration.walk();
    let names: Vec<Node> = declaration
        .children_by_field_name("name", &mut cursor)
        .collect();
    for name in names {
        let name = node_text(&name, source);
        let serialized = tag::serialized_name(tag.as_deref(), name);
        fields.push(Field::new(name, source_type.clone()).with_serialized_name(serialized));
    }
}

fn source_type(node: &Node, source: &str) -> SourceType {
    let text = || SourceType::Other(node_text(node, source).to_owned());
    match node.kind() {
        "type_identifier" => SourceType::ident(node_text(node, source)),
        "qualified_type" => {
            match (node.child_by_field_name("package"), node.child_by_field_name("name")) {
                (Some(package), Some(name)) => {
                    SourceType::qualified(node_text(&package, source), node_text(&name, source))
                }
                _ => text(),
            }
        }
        "slice_type" | "array_type" | "implicit_length_array_type" => {
            match node.child_by_field_name("element") {
                Some(element) => SourceType::sequence_of(source_type(&element, source)),
                None => text(),
            }
        }
        "parenthesized_type" => match node.named_child(0) {
            Some(inner) => source_type(&inner, source),
            None => text(),
        },
        _ => text(),
    }
}

fn first_error<'tree>(node: Node<'tree>) -> Option<Node<'tree>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    // `has_error` was set but no child owns it; report the node itself.
    Some(node)
}

fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn find_child_by_kind<'tree>(node: &Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == kind {
            return Some(child);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Aggregates {
        StructExtractor::new()
            .unwrap()
            .extract_source(Path::new("inline.go"), source)
            .unwrap()
    }

    #[test]
    fn records_struct_fields_with_tags() {
        let aggregates = parse(
            r#"package models

import "time"

type User struct {
	ID        int64     `json:"id"`
	Email     string    `json:"email,omitempty"`
	Tags      []string  `json:"tags"`
	CreatedAt time.Time `json:"created_at"`
	Internal  bool
}
"#,
        );

        let user = &aggregates["User"];
        let names: Vec<(&str, &str)> = user
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.serialized_name.as_str()))
            .collect();
        assert_eq!(
            names,
            [
                ("ID", "id"),
                ("Email", "email"),
                ("Tags", "tags"),
                ("CreatedAt", "created_at"),
                ("Internal", "Internal"),
            ]
        );
        assert_eq!(user.fields[2].source_type, SourceType::sequence_of(SourceType::ident("string")));
        assert_eq!(user.fields[3].source_type, SourceType::qualified("time", "Time"));
    }

    #[test]
    fn skips_non_struct_declarations_and_embedded_fields() {
        let aggregates = parse(
            r#"package models

type ID int64
type Alias = User
type Reader interface { Read() }

type (
	Base struct{ Version int }
	User struct {
		Base
		*Audit
		First, Last string
	}
)

type Audit struct{}

func helper() {
	type Local struct{ X int }
}
"#,
        );

        let names: Vec<&str> = aggregates.keys().map(String::as_str).collect();
        assert_eq!(names, ["Base", "User", "Audit"]);
        let fields: Vec<&str> = aggregates["User"].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, ["First", "Last"]);
        assert!(aggregates["Audit"].fields.is_empty());
    }

    #[test]
    fn pointer_and_map_fields_keep_their_text() {
        let aggregates = parse(
            "package models\n\ntype Box struct {\n\tOwner *User\n\tMeta map[string]int\n\tGrid [4]float64\n}\n",
        );
        let fields = &aggregates["Box"].fields;
        assert_eq!(fields[0].source_type, SourceType::Other("*User".into()));
        assert_eq!(fields[1].source_type, SourceType::Other("map[string]int".into()));
        assert_eq!(fields[2].source_type, SourceType::sequence_of(SourceType::ident("float64")));
    }

    #[test]
    fn nested_slices_keep_every_level() {
        let aggregates = parse(
            "package models\n\nimport \"time\"\n\ntype Grid struct {\n\tCells [][]int64\n\tStamps [][]time.Time\n\tRows []Row\n}\n\ntype Row struct{}\n",
        );
        let fields = &aggregates["Grid"].fields;
        assert_eq!(
            fields[0].source_type,
            SourceType::sequence_of(SourceType::sequence_of(SourceType::ident("int64")))
        );
        assert_eq!(
            fields[1].source_type,
            SourceType::sequence_of(SourceType::sequence_of(SourceType::qualified("time", "Time")))
        );
        assert_eq!(fields[2].source_type, SourceType::sequence_of(SourceType::ident("Row")));
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        let err = StructExtractor::new()
            .unwrap()
            .extract_source(Path::new("broken.go"), "package models\n\ntype User struct {\n\tID int\n")
            .unwrap_err();
        assert!(err.is_parse_error(), "unexpected error: {err}");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = extract_structs(Path::new("/definitely/not/here.go")).unwrap_err();
        assert!(matches!(err, SchemaError::Read { .. }));
    }
}
