use serde::Serialize;

use crate::ident::IdentifierSet;
use crate::pruner::{self, PruneResult};

/// A fully-resolved, immutable graph of schema files.
///
/// Types reference each other by fully-qualified dotted name, never by
/// direct ownership, so cyclic references (message A containing an optional
/// message B which contains an optional message A) are representable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub files: Vec<ProtoFile>,
}

impl Schema {
    pub fn new(files: Vec<ProtoFile>) -> Schema {
        Schema { files }
    }

    /// Looks up a type by fully-qualified name.
    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.files
            .iter()
            .flat_map(|file| file.types.iter())
            .find(|ty| ty.name() == name)
    }

    /// Looks up a message type by fully-qualified name.
    pub fn get_message(&self, name: &str) -> Option<&MessageType> {
        match self.get_type(name) {
            Some(Type::Message(message)) => Some(message),
            _ => None,
        }
    }

    /// Looks up an enum type by fully-qualified name.
    pub fn get_enum(&self, name: &str) -> Option<&EnumType> {
        match self.get_type(name) {
            Some(Type::Enum(enum_type)) => Some(enum_type),
            _ => None,
        }
    }

    /// Looks up a service by fully-qualified name.
    pub fn get_service(&self, name: &str) -> Option<&Service> {
        self.files
            .iter()
            .flat_map(|file| file.services.iter())
            .find(|service| service.name == name)
    }

    /// Iterates over every type in every file.
    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.files.iter().flat_map(|file| file.types.iter())
    }

    /// Iterates over every service in every file.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.files.iter().flat_map(|file| file.services.iter())
    }

    /// Returns a new schema containing only the types and services reachable
    /// from the identifier set's include roots, minus anything excluded,
    /// together with unused-rule diagnostics. An empty identifier set returns
    /// the schema unchanged.
    pub fn prune(&self, set: &IdentifierSet) -> PruneResult {
        pruner::prune(self, set)
    }
}

/// One schema source file with its declared types and services.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtoFile {
    pub path:     String,
    pub package:  Option<String>,
    pub types:    Vec<Type>,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type {
    Message(MessageType),
    Enum(EnumType),
}

impl Type {
    pub fn name(&self) -> &str {
        match self {
            Type::Message(message) => &message.name,
            Type::Enum(enum_type) => &enum_type.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageType {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    /// Declared fields, sorted by ascending tag. Oneof members carry the
    /// name of their group in `Field::oneof`.
    pub fields: Vec<Field>,
    /// Oneof group names in declaration order.
    pub oneofs: Vec<String>,
}

impl MessageType {
    pub fn field_by_tag(&self, tag: u32) -> Option<&Field> {
        self.fields.iter().find(|field| field.tag == tag)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn oneof_members(&self, group: &str) -> impl Iterator<Item = &Field> {
        let group = group.to_owned();
        self.fields
            .iter()
            .filter(move |field| field.oneof.as_deref() == Some(group.as_str()))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|field| field.label == Label::Required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:       String,
    pub line:       usize,
    pub column:     usize,
    pub tag:        u32,
    pub label:      Label,
    pub type_:      FieldType,
    pub sensitive:  bool,
    pub deprecated: bool,
    pub oneof:      Option<String>,
}

/// A field's declared type. `Named` holds a fully-qualified reference to a
/// message or enum once the verifier has resolved it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldType {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Fixed32,
    Fixed64,
    Float,
    Double,
    String,
    Bytes,
    Named(String),
}

impl FieldType {
    /// Parses a scalar type name, or `None` if the name refers to a
    /// user-declared type.
    pub fn scalar(name: &str) -> Option<FieldType> {
        match name {
            "bool" => Some(FieldType::Bool),
            "int32" => Some(FieldType::Int32),
            "int64" => Some(FieldType::Int64),
            "uint32" => Some(FieldType::UInt32),
            "uint64" => Some(FieldType::UInt64),
            "fixed32" => Some(FieldType::Fixed32),
            "fixed64" => Some(FieldType::Fixed64),
            "float" => Some(FieldType::Float),
            "double" => Some(FieldType::Double),
            "string" => Some(FieldType::String),
            "bytes" => Some(FieldType::Bytes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumType {
    pub name:      String,
    pub line:      usize,
    pub column:    usize,
    pub constants: Vec<EnumConstant>,
}

impl EnumType {
    pub fn constant(&self, number: u32) -> Option<&EnumConstant> {
        self.constants.iter().find(|c| c.number == number)
    }

    pub fn constant_by_name(&self, name: &str) -> Option<&EnumConstant> {
        self.constants.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumConstant {
    pub name:       String,
    pub number:     u32,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub rpcs:   Vec<Rpc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rpc {
    pub name:     String,
    pub request:  String,
    pub response: String,
}
