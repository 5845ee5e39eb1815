use std::path::PathBuf;

use protoforge_schema::{EnumType, Field, FieldType, Label, MessageType, Schema, Service, Type};

use super::{package_segments, simple_name, to_pascal_case, Emitter, SourceFile};

const HEADER: &str = "// Code generated by protoforge, do not edit.";

/// Emits one TypeScript source file per type or service.
#[derive(Default)]
pub struct TypeScriptEmitter;

impl TypeScriptEmitter {
    pub fn new() -> TypeScriptEmitter {
        TypeScriptEmitter
    }

    fn emit_message(&self, message: &MessageType) -> String {
        let name = to_pascal_case(simple_name(&message.name));
        let mut lines = preamble(&message.name);
        lines.push(format!("export interface {} {{", name));
        for field in &message.fields {
            if field.deprecated {
                lines.push("  /** @deprecated */".to_string());
            }
            // Optional and oneof members may be absent.
            let optional = field.label != Label::Required;
            lines.push(format!(
                "  {}{}: {};",
                field.name,
                if optional { "?" } else { "" },
                field_type(field)
            ));
        }
        lines.push("}".to_string());
        lines.push(String::new());
        lines.join("\n")
    }

    fn emit_enum(&self, enum_type: &EnumType) -> String {
        let name = to_pascal_case(simple_name(&enum_type.name));
        let mut lines = preamble(&enum_type.name);
        lines.push(format!("export enum {} {{", name));
        for constant in &enum_type.constants {
            if constant.deprecated {
                lines.push("  /** @deprecated */".to_string());
            }
            lines.push(format!("  {} = {},", constant.name, constant.number));
        }
        lines.push("}".to_string());
        lines.push(String::new());
        lines.join("\n")
    }
}

impl Emitter for TypeScriptEmitter {
    fn emit_type(&self, _schema: &Schema, ty: &Type) -> SourceFile {
        let contents = match ty {
            Type::Message(message) => self.emit_message(message),
            Type::Enum(enum_type) => self.emit_enum(enum_type),
        };
        SourceFile {
            type_name: ty.name().to_owned(),
            path:      artifact_path(ty.name()),
            contents,
        }
    }

    fn emit_service(&self, _schema: &Schema, service: &Service) -> SourceFile {
        let name = to_pascal_case(simple_name(&service.name));
        let mut lines = preamble(&service.name);
        lines.push(format!("export interface {} {{", name));
        for rpc in &service.rpcs {
            lines.push(format!(
                "  {}(request: {}): {};",
                rpc.name,
                to_pascal_case(simple_name(&rpc.request)),
                to_pascal_case(simple_name(&rpc.response))
            ));
        }
        lines.push("}".to_string());
        lines.push(String::new());

        SourceFile {
            type_name: service.name.clone(),
            path:      artifact_path(&service.name),
            contents:  lines.join("\n"),
        }
    }
}

fn preamble(type_name: &str) -> Vec<String> {
    vec![
        HEADER.to_string(),
        format!("// Type: {}", type_name),
        String::new(),
    ]
}

fn artifact_path(qualified: &str) -> PathBuf {
    let mut path: PathBuf = package_segments(qualified).iter().collect();
    path.push(format!("{}.ts", to_pascal_case(simple_name(qualified))));
    path
}

fn field_type(field: &Field) -> String {
    let base = match &field.type_ {
        FieldType::Bool => "boolean".to_string(),
        FieldType::Int32
        | FieldType::Int64
        | FieldType::UInt32
        | FieldType::UInt64
        | FieldType::Fixed32
        | FieldType::Fixed64
        | FieldType::Float
        | FieldType::Double => "number".to_string(),
        FieldType::String => "string".to_string(),
        FieldType::Bytes => "Uint8Array".to_string(),
        FieldType::Named(name) => to_pascal_case(simple_name(name)),
    };
    match field.label {
        Label::Repeated => format!("{}[]", base),
        _ => base,
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
    fn message_becomes_interface() {
        let schema = schema(
            r#"
            package demo;
            message Point { required int32 x = 1; optional int32 y = 2; repeated bytes blobs = 3; }
            "#,
        );
        let emitter = TypeScriptEmitter::new();
        let file = emitter.emit_type(&schema, schema.get_type("demo.Point").unwrap());
        assert_eq!(file.path, PathBuf::from("demo/Point.ts"));
        assert!(file.contents.contains("export interface Point {"));
        assert!(file.contents.contains("  x: number;"));
        assert!(file.contents.contains("  y?: number;"));
        assert!(file.contents.contains("  blobs?: Uint8Array[];"));
    }

    #[test]
    fn enum_and_service() {
        let schema = schema(
            r#"
            enum Color { RED = 1; }
            message Req {}
            message Res {}
            service Api { rpc get (Req) returns (Res); }
            "#,
        );
        let emitter = TypeScriptEmitter::new();
        let color = emitter.emit_type(&schema, schema.get_type("Color").unwrap());
        assert!(color.contents.contains("export enum Color {"));
        assert!(color.contents.contains("  RED = 1,"));

        let api = emitter.emit_service(&schema, schema.get_service("Api").unwrap());
        assert!(api.contents.contains("export interface Api {"));
        assert!(api.contents.contains("  get(request: Req): Res;"));
    }
}
