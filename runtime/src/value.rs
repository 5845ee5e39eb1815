use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use protoforge_schema::{Field, FieldType, Label, MessageType, Schema, Type};

use crate::error::CodecError;
use crate::wire::{key_len, varint_len, ProtoReader, ProtoWriter, WireKind};

/// Maximum message nesting depth accepted by decode. Schemas may be
/// self-referential, so without a bound a hostile input could recurse once
/// per nesting level until the stack runs out.
const MAX_DECODE_DEPTH: usize = 100;

/// A single decoded field payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Fixed32(u32),
    Fixed64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// An enum constant by number. Numbers with no declared constant are
    /// kept as-is so re-encoding is lossless.
    Enum(u32),
    Message(MessageValue),
    Repeated(Vec<FieldValue>),
}

/// A decoded message: its set fields keyed by tag, plus any wire bytes whose
/// tags the schema does not declare, kept verbatim in arrival order.
///
/// The content hash is computed once at construction, so hashing a value is
/// a single `u64` write no matter how deeply nested the message is.
#[derive(Debug, Clone)]
pub struct MessageValue {
    type_name:      String,
    fields:         BTreeMap<u32, FieldValue>,
    unknown_fields: Vec<u8>,
    hash:           u64,
}

impl MessageValue {
    pub(crate) fn from_parts(
        type_name: String,
        fields: BTreeMap<u32, FieldValue>,
        unknown_fields: Vec<u8>,
    ) -> MessageValue {
        let mut hasher = DefaultHasher::new();
        type_name.hash(&mut hasher);
        for (tag, value) in &fields {
            hasher.write_u32(*tag);
            hash_field_value(value, &mut hasher);
        }
        unknown_fields.hash(&mut hasher);
        MessageValue {
            type_name,
            fields,
            unknown_fields,
            hash: hasher.finish(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Looks up a set field by tag.
    pub fn get(&self, tag: u32) -> Option<&FieldValue> {
        self.fields.get(&tag)
    }

    /// Iterates over set fields in ascending tag order.
    pub fn fields(&self) -> impl Iterator<Item = (u32, &FieldValue)> {
        self.fields.iter().map(|(tag, value)| (*tag, value))
    }

    /// Unrecognized wire bytes carried through decode, still framed with
    /// their original keys.
    pub fn unknown_fields(&self) -> &[u8] {
        &self.unknown_fields
    }
}

impl PartialEq for MessageValue {
    fn eq(&self, other: &MessageValue) -> bool {
        self.type_name == other.type_name
            && self.fields == other.fields
            && self.unknown_fields == other.unknown_fields
    }
}

impl Hash for MessageValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

fn hash_field_value(value: &FieldValue, hasher: &mut DefaultHasher) {
    match value {
        FieldValue::Bool(v) => {
            hasher.write_u8(0);
            v.hash(hasher);
        }
        FieldValue::Int32(v) => {
            hasher.write_u8(1);
            v.hash(hasher);
        }
        FieldValue::Int64(v) => {
            hasher.write_u8(2);
            v.hash(hasher);
        }
        FieldValue::UInt32(v) => {
            hasher.write_u8(3);
            v.hash(hasher);
        }
        FieldValue::UInt64(v) => {
            hasher.write_u8(4);
            v.hash(hasher);
        }
        FieldValue::Fixed32(v) => {
            hasher.write_u8(5);
            v.hash(hasher);
        }
        FieldValue::Fixed64(v) => {
            hasher.write_u8(6);
            v.hash(hasher);
        }
        FieldValue::Float(v) => {
            hasher.write_u8(7);
            v.to_bits().hash(hasher);
        }
        FieldValue::Double(v) => {
            hasher.write_u8(8);
            v.to_bits().hash(hasher);
        }
        FieldValue::String(v) => {
            hasher.write_u8(9);
            v.hash(hasher);
        }
        FieldValue::Bytes(v) => {
            hasher.write_u8(10);
            v.hash(hasher);
        }
        FieldValue::Enum(v) => {
            hasher.write_u8(11);
            v.hash(hasher);
        }
        FieldValue::Message(v) => {
            hasher.write_u8(12);
            hasher.write_u64(v.hash);
        }
        FieldValue::Repeated(values) => {
            hasher.write_u8(13);
            hasher.write_usize(values.len());
            for value in values {
                hash_field_value(value, hasher);
            }
        }
    }
}

/// Builds a [`MessageValue`] field by field, validating each assignment
/// against the schema. At most one member of each oneof group may be set;
/// that is checked once, in [`MessageBuilder::build`].
pub struct MessageBuilder<'a> {
    schema:         &'a Schema,
    message:        &'a MessageType,
    fields:         BTreeMap<u32, FieldValue>,
    unknown_fields: Vec<u8>,
}

impl<'a> MessageBuilder<'a> {
    /// Sets a field by declared name, replacing any earlier assignment.
    pub fn set(mut self, name: &str, value: FieldValue) -> Result<MessageBuilder<'a>, CodecError> {
        let field = self
            .message
            .field(name)
            .ok_or_else(|| CodecError::UnknownField {
                type_name: self.message.name.clone(),
                field:     name.to_owned(),
            })?;
        check_assignable(self.schema, self.message, field, &value)?;
        self.fields.insert(field.tag, value);
        Ok(self)
    }

    /// Carries pre-framed unknown wire bytes into the built value, as decode
    /// does for tags the schema does not declare.
    pub fn unknown_fields(mut self, bytes: Vec<u8>) -> MessageBuilder<'a> {
        self.unknown_fields = bytes;
        self
    }

    /// Validates oneof exclusivity and produces the value.
    pub fn build(self) -> Result<MessageValue, CodecError> {
        for group in &self.message.oneofs {
            let set: Vec<String> = self
                .message
                .oneof_members(group)
                .filter(|member| self.fields.contains_key(&member.tag))
                .map(|member| member.name.clone())
                .collect();
            if set.len() > 1 {
                return Err(CodecError::InvalidOneOf {
                    type_name: self.message.name.clone(),
                    group:     group.clone(),
                    fields:    set,
                });
            }
        }
        Ok(MessageValue::from_parts(
            self.message.name.clone(),
            self.fields,
            self.unknown_fields,
        ))
    }
}

fn check_assignable(
    schema: &Schema,
    message: &MessageType,
    field: &Field,
    value: &FieldValue,
) -> Result<(), CodecError> {
    let mismatch = |found: &str| CodecError::TypeMismatch {
        type_name: message.name.clone(),
        field:     field.name.clone(),
        found:     found.to_owned(),
    };

    if field.label == Label::Repeated {
        let FieldValue::Repeated(values) = value else {
            return Err(mismatch("a non-repeated value"));
        };
        for value in values {
            check_element(schema, &mismatch, &field.type_, value)?;
        }
        return Ok(());
    }
    if matches!(value, FieldValue::Repeated(_)) {
        return Err(mismatch("a repeated value"));
    }
    check_element(schema, &mismatch, &field.type_, value)
}

fn check_element(
    schema: &Schema,
    mismatch: &impl Fn(&str) -> CodecError,
    type_: &FieldType,
    value: &FieldValue,
) -> Result<(), CodecError> {
    let ok = match type_ {
        FieldType::Bool => matches!(value, FieldValue::Bool(_)),
        FieldType::Int32 => matches!(value, FieldValue::Int32(_)),
        FieldType::Int64 => matches!(value, FieldValue::Int64(_)),
        FieldType::UInt32 => matches!(value, FieldValue::UInt32(_)),
        FieldType::UInt64 => matches!(value, FieldValue::UInt64(_)),
        FieldType::Fixed32 => matches!(value, FieldValue::Fixed32(_)),
        FieldType::Fixed64 => matches!(value, FieldValue::Fixed64(_)),
        FieldType::Float => matches!(value, FieldValue::Float(_)),
        FieldType::Double => matches!(value, FieldValue::Double(_)),
        FieldType::String => matches!(value, FieldValue::String(_)),
        FieldType::Bytes => matches!(value, FieldValue::Bytes(_)),
        FieldType::Named(name) => match schema.get_type(name) {
            Some(Type::Enum(_)) => matches!(value, FieldValue::Enum(_)),
            Some(Type::Message(_)) => match value {
                FieldValue::Message(nested) => {
                    if nested.type_name != *name {
                        return Err(mismatch(&format!("a {} message", nested.type_name)));
                    }
                    true
                }
                _ => false,
            },
            None => return Err(mismatch(&format!("a value for unresolved type {}", name))),
        },
    };
    if ok {
        Ok(())
    } else {
        Err(mismatch(describe(value)))
    }
}

fn describe(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Bool(_) => "a bool",
        FieldValue::Int32(_) => "an int32",
        FieldValue::Int64(_) => "an int64",
        FieldValue::UInt32(_) => "a uint32",
        FieldValue::UInt64(_) => "a uint64",
        FieldValue::Fixed32(_) => "a fixed32",
        FieldValue::Fixed64(_) => "a fixed64",
        FieldValue::Float(_) => "a float",
        FieldValue::Double(_) => "a double",
        FieldValue::String(_) => "a string",
        FieldValue::Bytes(_) => "bytes",
        FieldValue::Enum(_) => "an enum constant",
        FieldValue::Message(_) => "a message",
        FieldValue::Repeated(_) => "a repeated value",
    }
}

/// Encodes and decodes values of one message type against its schema.
///
/// Example usage:
///
/// ```
/// use protoforge_runtime::{FieldValue, MessageAdapter};
/// # use protoforge_schema::{parser::parse_schema, tokenizer::tokenize_schema};
/// # use protoforge_schema::{verifier::verify_schema, Schema};
/// # let file = parse_schema(&tokenize_schema(
/// #     "message Point { required int32 x = 1; required int32 y = 2; }",
/// # ).unwrap()).unwrap();
/// # let mut schema = Schema::new(vec![file]);
/// # verify_schema(&mut schema).unwrap();
/// let adapter = MessageAdapter::new(&schema, "Point").unwrap();
/// let point = adapter
///     .builder()
///     .set("x", FieldValue::Int32(3)).unwrap()
///     .set("y", FieldValue::Int32(-4)).unwrap()
///     .build().unwrap();
/// let encoded = adapter.encode_to_vec(&point);
/// assert_eq!(adapter.decode(&encoded).unwrap(), point);
/// ```
#[derive(Clone, Copy)]
pub struct MessageAdapter<'a> {
    schema:  &'a Schema,
    message: &'a MessageType,
}

impl<'a> MessageAdapter<'a> {
    pub fn new(schema: &'a Schema, type_name: &str) -> Result<MessageAdapter<'a>, CodecError> {
        let message = schema
            .get_message(type_name)
            .ok_or_else(|| CodecError::UnknownType(type_name.to_owned()))?;
        Ok(MessageAdapter { schema, message })
    }

    pub fn message(&self) -> &'a MessageType {
        self.message
    }

    pub fn builder(&self) -> MessageBuilder<'a> {
        MessageBuilder {
            schema:         self.schema,
            message:        self.message,
            fields:         BTreeMap::new(),
            unknown_fields: Vec::new(),
        }
    }

    /// Exact number of bytes [`MessageAdapter::encode`] will produce.
    pub fn encoded_size(&self, value: &MessageValue) -> usize {
        let mut size = 0;
        for (tag, field_value) in &value.fields {
            let Some(field) = self.message.field_by_tag(*tag) else {
                continue;
            };
            match field_value {
                FieldValue::Repeated(values) => {
                    for element in values {
                        size += self.element_size(field, element);
                    }
                }
                element => size += self.element_size(field, element),
            }
        }
        size + value.unknown_fields.len()
    }

    fn element_size(&self, field: &Field, value: &FieldValue) -> usize {
        let payload = match (&field.type_, value) {
            (FieldType::Bool, FieldValue::Bool(_)) => 1,
            (FieldType::Int32, FieldValue::Int32(v)) => varint_len(*v as i64 as u64),
            (FieldType::Int64, FieldValue::Int64(v)) => varint_len(*v as u64),
            (FieldType::UInt32, FieldValue::UInt32(v)) => varint_len(*v as u64),
            (FieldType::UInt64, FieldValue::UInt64(v)) => varint_len(*v),
            (FieldType::Fixed32, FieldValue::Fixed32(_)) => 4,
            (FieldType::Fixed64, FieldValue::Fixed64(_)) => 8,
            (FieldType::Float, FieldValue::Float(_)) => 4,
            (FieldType::Double, FieldValue::Double(_)) => 8,
            (FieldType::String, FieldValue::String(v)) => {
                varint_len(v.len() as u64) + v.len()
            }
            (FieldType::Bytes, FieldValue::Bytes(v)) => varint_len(v.len() as u64) + v.len(),
            (FieldType::Named(name), FieldValue::Enum(v)) => {
                if self.schema.get_enum(name).is_none() {
                    return 0;
                }
                varint_len(*v as u64)
            }
            (FieldType::Named(name), FieldValue::Message(nested)) => {
                let Ok(adapter) = MessageAdapter::new(self.schema, name) else {
                    return 0;
                };
                let nested_size = adapter.encoded_size(nested);
                varint_len(nested_size as u64) + nested_size
            }
            _ => return 0,
        };
        key_len(field.tag) + payload
    }

    /// Writes the value's set fields in ascending tag order, then any unknown
    /// fields verbatim.
    pub fn encode(&self, value: &MessageValue, writer: &mut ProtoWriter) {
        for (tag, field_value) in &value.fields {
            let Some(field) = self.message.field_by_tag(*tag) else {
                continue;
            };
            match field_value {
                FieldValue::Repeated(values) => {
                    for element in values {
                        self.encode_element(field, element, writer);
                    }
                }
                element => self.encode_element(field, element, writer),
            }
        }
        writer.write_bytes(&value.unknown_fields);
    }

    fn encode_element(&self, field: &Field, value: &FieldValue, writer: &mut ProtoWriter) {
        match (&field.type_, value) {
            (FieldType::Bool, FieldValue::Bool(v)) => {
                writer.write_key(field.tag, WireKind::Varint);
                writer.write_varint(*v as u64);
            }
            (FieldType::Int32, FieldValue::Int32(v)) => {
                writer.write_key(field.tag, WireKind::Varint);
                writer.write_varint(*v as i64 as u64);
            }
            (FieldType::Int64, FieldValue::Int64(v)) => {
                writer.write_key(field.tag, WireKind::Varint);
                writer.write_varint(*v as u64);
            }
            (FieldType::UInt32, FieldValue::UInt32(v)) => {
                writer.write_key(field.tag, WireKind::Varint);
                writer.write_varint(*v as u64);
            }
            (FieldType::UInt64, FieldValue::UInt64(v)) => {
                writer.write_key(field.tag, WireKind::Varint);
                writer.write_varint(*v);
            }
            (FieldType::Fixed32, FieldValue::Fixed32(v)) => {
                writer.write_key(field.tag, WireKind::Fixed32);
                writer.write_fixed32(*v);
            }
            (FieldType::Fixed64, FieldValue::Fixed64(v)) => {
                writer.write_key(field.tag, WireKind::Fixed64);
                writer.write_fixed64(*v);
            }
            (FieldType::Float, FieldValue::Float(v)) => {
                writer.write_key(field.tag, WireKind::Fixed32);
                writer.write_fixed32(v.to_bits());
            }
            (FieldType::Double, FieldValue::Double(v)) => {
                writer.write_key(field.tag, WireKind::Fixed64);
                writer.write_fixed64(v.to_bits());
            }
            (FieldType::String, FieldValue::String(v)) => {
                writer.write_key(field.tag, WireKind::LengthDelimited);
                writer.write_len_delimited(v.as_bytes());
            }
            (FieldType::Bytes, FieldValue::Bytes(v)) => {
                writer.write_key(field.tag, WireKind::LengthDelimited);
                writer.write_len_delimited(v);
            }
            (FieldType::Named(name), FieldValue::Enum(v)) => {
                if self.schema.get_enum(name).is_some() {
                    writer.write_key(field.tag, WireKind::Varint);
                    writer.write_varint(*v as u64);
                }
            }
            (FieldType::Named(name), FieldValue::Message(nested)) => {
                if let Ok(adapter) = MessageAdapter::new(self.schema, name) {
                    writer.write_key(field.tag, WireKind::LengthDelimited);
                    writer.write_varint(adapter.encoded_size(nested) as u64);
                    adapter.encode(nested, writer);
                }
            }
            _ => {}
        }
    }

    pub fn encode_to_vec(&self, value: &MessageValue) -> Vec<u8> {
        let size = self.encoded_size(value);
        let mut writer = ProtoWriter::with_capacity(size);
        self.encode(value, &mut writer);
        debug_assert_eq!(writer.len(), size);
        writer.data()
    }

    /// Decodes one message.
    ///
    /// Tags the schema does not declare are kept verbatim, key included, in
    /// the value's unknown fields. A declared tag arriving with the wrong
    /// wire kind is malformed, as is nesting deeper than 100 levels. When a
    /// singular field or another member of the same oneof group repeats on
    /// the wire, the last occurrence wins.
    pub fn decode(&self, data: &[u8]) -> Result<MessageValue, CodecError> {
        self.decode_at(data, 0)
    }

    fn decode_at(&self, data: &[u8], depth: usize) -> Result<MessageValue, CodecError> {
        if depth > MAX_DECODE_DEPTH {
            return Err(CodecError::Malformed(format!(
                "message nesting deeper than {} levels",
                MAX_DECODE_DEPTH
            )));
        }
        let mut reader = ProtoReader::new(data);
        let mut fields: BTreeMap<u32, FieldValue> = BTreeMap::new();
        let mut unknown_fields = Vec::new();

        loop {
            let key_start = reader.index();
            let Some((tag, kind)) = reader.read_key()? else {
                break;
            };
            let Some(field) = self.message.field_by_tag(tag) else {
                reader.skip(kind)?;
                unknown_fields.extend_from_slice(&reader.data()[key_start..reader.index()]);
                continue;
            };

            let expected = expected_kind(self.schema, &field.type_)?;
            if kind != expected {
                return Err(CodecError::Malformed(format!(
                    "field {} of {} expects wire kind {}, found {}",
                    field.name,
                    self.message.name,
                    expected.bits(),
                    kind.bits()
                )));
            }

            let value = self.decode_element(field, &mut reader, depth)?;
            if field.label == Label::Repeated {
                match fields.get_mut(&tag) {
                    Some(FieldValue::Repeated(values)) => values.push(value),
                    _ => {
                        fields.insert(tag, FieldValue::Repeated(vec![value]));
                    }
                }
            } else {
                if let Some(group) = &field.oneof {
                    for member in self.message.oneof_members(group) {
                        fields.remove(&member.tag);
                    }
                }
                fields.insert(tag, value);
            }
        }

        let missing: Vec<String> = self
            .message
            .required_fields()
            .filter(|field| !fields.contains_key(&field.tag))
            .map(|field| field.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(CodecError::MissingRequiredFields {
                type_name: self.message.name.clone(),
                fields:    missing,
            });
        }

        Ok(MessageValue::from_parts(
            self.message.name.clone(),
            fields,
            unknown_fields,
        ))
    }

    fn decode_element(
        &self,
        field: &Field,
        reader: &mut ProtoReader,
        depth: usize,
    ) -> Result<FieldValue, CodecError> {
        let value = match &field.type_ {
            FieldType::Bool => FieldValue::Bool(reader.read_varint()? != 0),
            FieldType::Int32 => FieldValue::Int32(reader.read_varint()? as i32),
            FieldType::Int64 => FieldValue::Int64(reader.read_varint()? as i64),
            FieldType::UInt32 => FieldValue::UInt32(reader.read_varint()? as u32),
            FieldType::UInt64 => FieldValue::UInt64(reader.read_varint()?),
            FieldType::Fixed32 => FieldValue::Fixed32(reader.read_fixed32()?),
            FieldType::Fixed64 => FieldValue::Fixed64(reader.read_fixed64()?),
            FieldType::Float => FieldValue::Float(f32::from_bits(reader.read_fixed32()?)),
            FieldType::Double => FieldValue::Double(f64::from_bits(reader.read_fixed64()?)),
            FieldType::String => {
                let bytes = reader.read_len_delimited()?;
                let text = std::str::from_utf8(bytes).map_err(|_| {
                    CodecError::Malformed(format!("field {} is not valid UTF-8", field.name))
                })?;
                FieldValue::String(text.to_owned())
            }
            FieldType::Bytes => FieldValue::Bytes(reader.read_len_delimited()?.to_vec()),
            FieldType::Named(name) => match self.schema.get_type(name) {
                Some(Type::Enum(_)) => FieldValue::Enum(reader.read_varint()? as u32),
                Some(Type::Message(_)) => {
                    let adapter = MessageAdapter::new(self.schema, name)?;
                    let bytes = reader.read_len_delimited()?;
                    FieldValue::Message(adapter.decode_at(bytes, depth + 1)?)
                }
                None => return Err(CodecError::UnknownType(name.clone())),
            },
        };
        Ok(value)
    }

    /// Returns a copy with every `[sensitive]` field removed, recursively.
    /// Unknown fields are dropped too, since their contents cannot be
    /// inspected against the schema.
    pub fn redact(&self, value: &MessageValue) -> MessageValue {
        let mut fields = BTreeMap::new();
        for (tag, field_value) in &value.fields {
            let Some(field) = self.message.field_by_tag(*tag) else {
                continue;
            };
            if field.sensitive {
                continue;
            }
            fields.insert(*tag, self.redact_element(field_value));
        }
        MessageValue::from_parts(self.message.name.clone(), fields, Vec::new())
    }

    fn redact_element(&self, value: &FieldValue) -> FieldValue {
        match value {
            FieldValue::Message(nested) => match MessageAdapter::new(self.schema, &nested.type_name)
            {
                Ok(adapter) => FieldValue::Message(adapter.redact(nested)),
                Err(_) => value.clone(),
            },
            FieldValue::Repeated(values) => FieldValue::Repeated(
                values
                    .iter()
                    .map(|element| self.redact_element(element))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }
}

fn expected_kind(schema: &Schema, type_: &FieldType) -> Result<WireKind, CodecError> {
    let kind = match type_ {
        FieldType::Bool
        | FieldType::Int32
        | FieldType::Int64
        | FieldType::UInt32
        | FieldType::UInt64 => WireKind::Varint,
        FieldType::Fixed32 | FieldType::Float => WireKind::Fixed32,
        FieldType::Fixed64 | FieldType::Double => WireKind::Fixed64,
        FieldType::String | FieldType::Bytes => WireKind::LengthDelimited,
        FieldType::Named(name) => match schema.get_type(name) {
            Some(Type::Enum(_)) => WireKind::Varint,
            Some(Type::Message(_)) => WireKind::LengthDelimited,
            None => return Err(CodecError::UnknownType(name.clone())),
        },
    };
    Ok(kind)
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

    fn hash_of(value: &MessageValue) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    const SCALARS: &str = r#"
        message Scalars {
          required int32 a = 1;
          optional int64 b = 2;
          optional uint64 c = 3;
          optional bool d = 4;
          optional fixed32 e = 5;
          optional double f = 6;
          optional string g = 7;
          optional bytes h = 8;
          repeated uint32 r = 9;
        }
    "#;

    #[test]
    fn scalar_round_trip() {
        let schema = schema(SCALARS);
        let adapter = MessageAdapter::new(&schema, "Scalars").unwrap();
        let value = adapter
            .builder()
            .set("a", FieldValue::Int32(-1))
            .unwrap()
            .set("b", FieldValue::Int64(i64::MIN))
            .unwrap()
            .set("c", FieldValue::UInt64(u64::MAX))
            .unwrap()
            .set("d", FieldValue::Bool(true))
            .unwrap()
            .set("e", FieldValue::Fixed32(7))
            .unwrap()
            .set("f", FieldValue::Double(2.5))
            .unwrap()
            .set("g", FieldValue::String("héllo".to_owned()))
            .unwrap()
            .set("h", FieldValue::Bytes(vec![0, 255]))
            .unwrap()
            .set(
                "r",
                FieldValue::Repeated(vec![FieldValue::UInt32(1), FieldValue::UInt32(2)]),
            )
            .unwrap()
            .build()
            .unwrap();

        let encoded = adapter.encode_to_vec(&value);
        assert_eq!(encoded.len(), adapter.encoded_size(&value));
        let decoded = adapter.decode(&encoded).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(hash_of(&decoded), hash_of(&value));
    }

    #[test]
    fn negative_int32_uses_ten_bytes() {
        let schema = schema("message M { required int32 a = 1; }");
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let value = adapter
            .builder()
            .set("a", FieldValue::Int32(-1))
            .unwrap()
            .build()
            .unwrap();
        // One key byte plus a sign-extended varint.
        assert_eq!(adapter.encoded_size(&value), 11);
        assert_eq!(adapter.decode(&adapter.encode_to_vec(&value)).unwrap(), value);
    }

    #[test]
    fn fields_encode_in_ascending_tag_order() {
        let schema = schema("message M { optional uint32 hi = 9; optional uint32 lo = 2; }");
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let value = adapter
            .builder()
            .set("hi", FieldValue::UInt32(1))
            .unwrap()
            .set("lo", FieldValue::UInt32(1))
            .unwrap()
            .build()
            .unwrap();
        let encoded = adapter.encode_to_vec(&value);
        assert_eq!(encoded, [0x10, 0x01, 0x48, 0x01]);
    }

    #[test]
    fn builder_rejects_unknown_field_and_wrong_type() {
        let schema = schema("message M { optional uint32 a = 1; }");
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        assert!(matches!(
            adapter.builder().set("ghost", FieldValue::UInt32(1)),
            Err(CodecError::UnknownField { .. })
        ));
        assert!(matches!(
            adapter.builder().set("a", FieldValue::String("no".to_owned())),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn nested_messages_and_enums() {
        let schema = schema(
            r#"
            enum Color { RED = 1; BLUE = 2; }
            message Inner { required uint32 n = 1; }
            message Outer {
              optional Inner inner = 1;
              optional Color color = 2;
              repeated Inner many = 3;
            }
            "#,
        );
        let outer = MessageAdapter::new(&schema, "Outer").unwrap();
        let inner = MessageAdapter::new(&schema, "Inner").unwrap();
        let make_inner = |n: u32| {
            inner
                .builder()
                .set("n", FieldValue::UInt32(n))
                .unwrap()
                .build()
                .unwrap()
        };
        let value = outer
            .builder()
            .set("inner", FieldValue::Message(make_inner(5)))
            .unwrap()
            .set("color", FieldValue::Enum(2))
            .unwrap()
            .set(
                "many",
                FieldValue::Repeated(vec![
                    FieldValue::Message(make_inner(1)),
                    FieldValue::Message(make_inner(2)),
                ]),
            )
            .unwrap()
            .build()
            .unwrap();

        let encoded = outer.encode_to_vec(&value);
        assert_eq!(encoded.len(), outer.encoded_size(&value));
        assert_eq!(outer.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn unknown_fields_survive_decode_and_reencode() {
        let schema = schema("message M { optional uint32 a = 1; }");
        let adapter = MessageAdapter::new(&schema, "M").unwrap();

        let mut writer = ProtoWriter::new();
        writer.write_key(1, WireKind::Varint);
        writer.write_varint(7);
        // Tag 99 is not declared.
        writer.write_key(99, WireKind::LengthDelimited);
        writer.write_len_delimited(b"opaque");
        writer.write_key(100, WireKind::Fixed32);
        writer.write_fixed32(42);
        let data = writer.data();

        let decoded = adapter.decode(&data).unwrap();
        assert_eq!(decoded.get(1), Some(&FieldValue::UInt32(7)));
        assert!(!decoded.unknown_fields().is_empty());

        // Two further cycles keep the unknown bytes verbatim.
        let once = adapter.encode_to_vec(&decoded);
        let twice = adapter.encode_to_vec(&adapter.decode(&once).unwrap());
        assert_eq!(once, twice);
        assert_eq!(adapter.decode(&twice).unwrap(), decoded);
    }

    #[test]
    fn declared_tag_with_wrong_wire_kind_is_malformed() {
        let schema = schema("message M { optional uint32 a = 1; }");
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let mut writer = ProtoWriter::new();
        writer.write_key(1, WireKind::Fixed32);
        writer.write_fixed32(7);
        assert!(matches!(
            adapter.decode(&writer.data()),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn singular_field_last_occurrence_wins() {
        let schema = schema("message M { optional uint32 a = 1; }");
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let mut writer = ProtoWriter::new();
        writer.write_key(1, WireKind::Varint);
        writer.write_varint(1);
        writer.write_key(1, WireKind::Varint);
        writer.write_varint(2);
        let decoded = adapter.decode(&writer.data()).unwrap();
        assert_eq!(decoded.get(1), Some(&FieldValue::UInt32(2)));
    }

    const ONEOF: &str = r#"
        message M {
          oneof choice {
            optional uint32 a = 1;
            optional string b = 2;
          }
        }
    "#;

    #[test]
    fn builder_rejects_two_oneof_members() {
        let schema = schema(ONEOF);
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let err = adapter
            .builder()
            .set("a", FieldValue::UInt32(1))
            .unwrap()
            .set("b", FieldValue::String("x".to_owned()))
            .unwrap()
            .build()
            .unwrap_err();
        match err {
            CodecError::InvalidOneOf { group, fields, .. } => {
                assert_eq!(group, "choice");
                assert_eq!(fields, ["a", "b"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn decode_keeps_last_oneof_member() {
        let schema = schema(ONEOF);
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let mut writer = ProtoWriter::new();
        writer.write_key(1, WireKind::Varint);
        writer.write_varint(7);
        writer.write_key(2, WireKind::LengthDelimited);
        writer.write_len_delimited(b"late");
        let decoded = adapter.decode(&writer.data()).unwrap();
        assert_eq!(decoded.get(1), None);
        assert_eq!(decoded.get(2), Some(&FieldValue::String("late".to_owned())));
    }

    #[test]
    fn missing_required_fields_are_all_named() {
        let schema = schema(
            r#"
            message M {
              required uint32 a = 1;
              required string b = 2;
              optional bool c = 3;
            }
            "#,
        );
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let err = adapter.decode(&[]).unwrap_err();
        match err {
            CodecError::MissingRequiredFields { type_name, fields } => {
                assert_eq!(type_name, "M");
                assert_eq!(fields, ["a", "b"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn redact_removes_sensitive_fields_recursively() {
        let schema = schema(
            r#"
            message Secret { optional string token = 1 [sensitive]; optional uint32 id = 2; }
            message Holder {
              optional Secret secret = 1;
              optional string password = 2 [sensitive];
              repeated Secret all = 3;
            }
            "#,
        );
        let holder = MessageAdapter::new(&schema, "Holder").unwrap();
        let secret = MessageAdapter::new(&schema, "Secret").unwrap();
        let make_secret = || {
            secret
                .builder()
                .set("token", FieldValue::String("hunter2".to_owned()))
                .unwrap()
                .set("id", FieldValue::UInt32(9))
                .unwrap()
                .build()
                .unwrap()
        };
        let value = holder
            .builder()
            .set("secret", FieldValue::Message(make_secret()))
            .unwrap()
            .set("password", FieldValue::String("swordfish".to_owned()))
            .unwrap()
            .set(
                "all",
                FieldValue::Repeated(vec![FieldValue::Message(make_secret())]),
            )
            .unwrap()
            .build()
            .unwrap();

        let redacted = holder.redact(&value);
        assert_eq!(redacted.get(2), None);
        let FieldValue::Message(nested) = redacted.get(1).unwrap() else {
            panic!("expected nested message");
        };
        assert_eq!(nested.get(1), None);
        assert_eq!(nested.get(2), Some(&FieldValue::UInt32(9)));
        let FieldValue::Repeated(all) = redacted.get(3).unwrap() else {
            panic!("expected repeated");
        };
        let FieldValue::Message(element) = &all[0] else {
            panic!("expected message element");
        };
        assert_eq!(element.get(1), None);

        // Redaction is idempotent.
        assert_eq!(holder.redact(&redacted), redacted);
    }

    #[test]
    fn redact_drops_unknown_fields() {
        let schema = schema("message M { optional uint32 a = 1; }");
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let mut writer = ProtoWriter::new();
        writer.write_key(8, WireKind::Varint);
        writer.write_varint(1);
        let decoded = adapter.decode(&writer.data()).unwrap();
        assert!(!decoded.unknown_fields().is_empty());
        assert!(adapter.redact(&decoded).unknown_fields().is_empty());
    }

    fn nest(levels: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for _ in 0..levels {
            let mut writer = ProtoWriter::new();
            writer.write_key(1, WireKind::LengthDelimited);
            writer.write_len_delimited(&bytes);
            bytes = writer.data();
        }
        bytes
    }

    #[test]
    fn deeply_nested_input_is_malformed_not_fatal() {
        let schema = schema("message A { optional A child = 1; }");
        let adapter = MessageAdapter::new(&schema, "A").unwrap();

        // Well within the limit.
        assert!(adapter.decode(&nest(5)).is_ok());
        // A self-referential schema lets wire input nest arbitrarily deep;
        // past the limit it is rejected instead of exhausting the stack.
        assert!(matches!(
            adapter.decode(&nest(200)),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn equal_values_share_a_hash() {
        let schema = schema("message M { optional double d = 1; optional string s = 2; }");
        let adapter = MessageAdapter::new(&schema, "M").unwrap();
        let build = || {
            adapter
                .builder()
                .set("d", FieldValue::Double(1.5))
                .unwrap()
                .set("s", FieldValue::String("same".to_owned()))
                .unwrap()
                .build()
                .unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = adapter
            .builder()
            .set("d", FieldValue::Double(2.5))
            .unwrap()
            .build()
            .unwrap();
        assert_ne!(a, c);
    }
}
