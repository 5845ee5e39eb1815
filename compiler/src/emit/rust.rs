use std::path::PathBuf;

use protoforge_schema::{EnumType, Field, FieldType, Label, MessageType, Schema, Service, Type};

use super::{package_segments, simple_name, to_pascal_case, to_snake_case, Emitter, SourceFile};

const HEADER: &str = "// Code generated by protoforge, do not edit.";

/// Emits one Rust source file per type or service.
pub struct RustEmitter {
    /// When set, generated structs and enums derive serde's `Serialize` and
    /// `Deserialize` alongside the usual traits.
    pub serde_interop: bool,
}

impl RustEmitter {
    pub fn new(serde_interop: bool) -> RustEmitter {
        RustEmitter { serde_interop }
    }

    fn derives(&self, copyable: bool) -> String {
        let mut traits = vec!["Debug", "Clone"];
        if copyable {
            traits.push("Copy");
        }
        traits.push("PartialEq");
        if copyable {
            traits.push("Eq");
        }
        if self.serde_interop {
            traits.push("Serialize");
            traits.push("Deserialize");
        }
        format!("#[derive({})]", traits.join(", "))
    }

    fn preamble(&self, type_name: &str) -> Vec<String> {
        let mut lines = vec![
            HEADER.to_string(),
            format!("// Type: {}", type_name),
            String::new(),
        ];
        if self.serde_interop {
            lines.push("use serde::{Deserialize, Serialize};".to_string());
            lines.push(String::new());
        }
        lines
    }

    fn emit_message(&self, message: &MessageType) -> String {
        let struct_name = to_pascal_case(simple_name(&message.name));
        let mut lines = self.preamble(&message.name);

        // One enum per oneof group; the struct holds the group as an Option.
        for group in &message.oneofs {
            let enum_name = format!("{}{}", struct_name, to_pascal_case(group));
            lines.push(self.derives(false));
            lines.push(format!("pub enum {} {{", enum_name));
            for member in message.oneof_members(group) {
                lines.push(format!(
                    "    {}({}),",
                    to_pascal_case(&member.name),
                    map_type(&member.type_)
                ));
            }
            lines.push("}".to_string());
            lines.push(String::new());
        }

        lines.push(self.derives(false));
        lines.push(format!("pub struct {} {{", struct_name));
        for field in &message.fields {
            if field.oneof.is_some() {
                continue;
            }
            if field.deprecated {
                lines.push("    #[deprecated]".to_string());
            }
            lines.push(format!(
                "    pub {}: {},",
                escape_rust_keyword(&to_snake_case(&field.name)),
                field_type(field)
            ));
        }
        for group in &message.oneofs {
            lines.push(format!(
                "    pub {}: Option<{}{}>,",
                escape_rust_keyword(&to_snake_case(group)),
                struct_name,
                to_pascal_case(group)
            ));
        }
        lines.push("}".to_string());
        lines.push(String::new());
        lines.join("\n")
    }

    fn emit_enum(&self, enum_type: &EnumType) -> String {
        let enum_name = to_pascal_case(simple_name(&enum_type.name));
        let mut lines = self.preamble(&enum_type.name);

        lines.push(self.derives(true));
        lines.push(format!("pub enum {} {{", enum_name));
        for constant in &enum_type.constants {
            if constant.deprecated {
                lines.push("    #[deprecated]".to_string());
            }
            lines.push(format!(
                "    {} = {},",
                escape_rust_keyword(&to_pascal_case(&constant.name)),
                constant.number
            ));
        }
        lines.push("}".to_string());
        lines.push(String::new());

        lines.push(format!("impl {} {{", enum_name));
        lines.push(format!(
            "    pub fn from_number(number: u32) -> Option<{}> {{",
            enum_name
        ));
        lines.push("        match number {".to_string());
        for constant in &enum_type.constants {
            lines.push(format!(
                "            {} => Some({}::{}),",
                constant.number,
                enum_name,
                escape_rust_keyword(&to_pascal_case(&constant.name))
            ));
        }
        lines.push("            _ => None,".to_string());
        lines.push("        }".to_string());
        lines.push("    }".to_string());
        lines.push(String::new());
        lines.push("    pub fn number(self) -> u32 {".to_string());
        lines.push("        self as u32".to_string());
        lines.push("    }".to_string());
        lines.push("}".to_string());
        lines.push(String::new());
        lines.join("\n")
    }
}

impl Emitter for RustEmitter {
    fn emit_type(&self, _schema: &Schema, ty: &Type) -> SourceFile {
        let contents = match ty {
            Type::Message(message) => self.emit_message(message),
            Type::Enum(enum_type) => self.emit_enum(enum_type),
        };
        SourceFile {
            type_name: ty.name().to_owned(),
            path:      artifact_path(ty.name(), "rs"),
            contents,
        }
    }

    fn emit_service(&self, _schema: &Schema, service: &Service) -> SourceFile {
        let trait_name = to_pascal_case(simple_name(&service.name));
        let mut lines = self.preamble(&service.name);

        lines.push(format!("pub trait {} {{", trait_name));
        for rpc in &service.rpcs {
            lines.push(format!(
                "    fn {}(&self, request: {}) -> {};",
                escape_rust_keyword(&to_snake_case(&rpc.name)),
                to_pascal_case(simple_name(&rpc.request)),
                to_pascal_case(simple_name(&rpc.response))
            ));
        }
        lines.push("}".to_string());
        lines.push(String::new());

        SourceFile {
            type_name: service.name.clone(),
            path:      artifact_path(&service.name, "rs"),
            contents:  lines.join("\n"),
        }
    }
}

fn artifact_path(qualified: &str, extension: &str) -> PathBuf {
    let mut path: PathBuf = package_segments(qualified).iter().collect();
    path.push(format!(
        "{}.{}",
        to_snake_case(simple_name(qualified)),
        extension
    ));
    path
}

fn field_type(field: &Field) -> String {
    let base = map_type(&field.type_);
    match field.label {
        Label::Required => base,
        Label::Optional => format!("Option<{}>", base),
        Label::Repeated => format!("Vec<{}>", base),
    }
}

fn map_type(type_: &FieldType) -> String {
    match type_ {
        FieldType::Bool => "bool".to_string(),
        FieldType::Int32 => "i32".to_string(),
        FieldType::Int64 => "i64".to_string(),
        FieldType::UInt32 | FieldType::Fixed32 => "u32".to_string(),
        FieldType::UInt64 | FieldType::Fixed64 => "u64".to_string(),
        FieldType::Float => "f32".to_string(),
        FieldType::Double => "f64".to_string(),
        FieldType::String => "String".to_string(),
        FieldType::Bytes => "Vec<u8>".to_string(),
        FieldType::Named(name) => to_pascal_case(simple_name(name)),
    }
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "as", "break", "const", "continue", "crate", "else",
        "enum", "extern", "false", "fn", "for", "if", "impl",
        "in", "let", "loop", "match", "mod", "move", "mut",
        "pub", "ref", "return", "self", "Self", "static",
        "struct", "super", "trait", "true", "type", "unsafe",
        "use", "where", "while",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protoforge_schema::parser::parse_schema;
    use protoforge_schema::tokenizer::tokenize_schema;
    use protoforge_schema::verifier::verify_schema;

    fn schema(text: &str) -> Schema {
        let file = parse_schema(&tokenize_schema(text).unwrap()).unwrap();
        let mut schema = Schema::new(vec![file]);
        verify_schema(&mut schema).unwrap();
        schema
    }

    #[test]
    fn message_becomes_struct_at_package_path() {
        let schema = schema(
            r#"
            package demo.api;
            message SearchRequest {
              required string term = 1;
              optional uint32 limit = 2;
              repeated string tags = 3;
            }
            "#,
        );
        let emitter = RustEmitter::new(false);
        let ty = schema.get_type("demo.api.SearchRequest").unwrap();
        let file = emitter.emit_type(&schema, ty);

        assert_eq!(file.type_name, "demo.api.SearchRequest");
        assert_eq!(file.path, PathBuf::from("demo/api/search_request.rs"));
        assert!(file.contents.starts_with(HEADER));
        assert!(file.contents.contains("pub struct SearchRequest {"));
        assert!(file.contents.contains("    pub term: String,"));
        assert!(file.contents.contains("    pub limit: Option<u32>,"));
        assert!(file.contents.contains("    pub tags: Vec<String>,"));
    }

    #[test]
    fn oneof_becomes_an_enum_valued_option() {
        let schema = schema(
            r#"
            message Event {
              oneof payload {
                optional string text = 1;
                optional bytes blob = 2;
              }
            }
            "#,
        );
        let emitter = RustEmitter::new(false);
        let file = emitter.emit_type(&schema, schema.get_type("Event").unwrap());
        assert!(file.contents.contains("pub enum EventPayload {"));
        assert!(file.contents.contains("    Text(String),"));
        assert!(file.contents.contains("    Blob(Vec<u8>),"));
        assert!(file.contents.contains("    pub payload: Option<EventPayload>,"));
        // Oneof members are not plain struct fields.
        assert!(!file.contents.contains("pub text:"));
    }

    #[test]
    fn enum_keeps_declared_numbers() {
        let schema = schema("enum Color { RED = 1; BLUE = 4; }");
        let emitter = RustEmitter::new(false);
        let file = emitter.emit_type(&schema, schema.get_type("Color").unwrap());
        assert!(file.contents.contains("    Red = 1,"));
        assert!(file.contents.contains("    Blue = 4,"));
        assert!(file.contents.contains("4 => Some(Color::Blue),"));
    }

    #[test]
    fn serde_interop_adds_derives() {
        let schema = schema("message M { optional bool a = 1; }");
        let with = RustEmitter::new(true).emit_type(&schema, schema.get_type("M").unwrap());
        let without = RustEmitter::new(false).emit_type(&schema, schema.get_type("M").unwrap());
        assert!(with.contents.contains("Serialize, Deserialize"));
        assert!(with.contents.contains("use serde::{Deserialize, Serialize};"));
        assert!(!without.contents.contains("Serialize"));
    }

    #[test]
    fn service_becomes_a_trait() {
        let schema = schema(
            r#"
            package demo;
            message Req {}
            message Res {}
            service Search { rpc run (Req) returns (Res); }
            "#,
        );
        let emitter = RustEmitter::new(false);
        let service = schema.get_service("demo.Search").unwrap();
        let file = emitter.emit_service(&schema, service);
        assert_eq!(file.path, PathBuf::from("demo/search.rs"));
        assert!(file.contents.contains("pub trait Search {"));
        assert!(file.contents.contains("    fn run(&self, request: Req) -> Res;"));
    }
}
