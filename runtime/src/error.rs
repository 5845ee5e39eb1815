use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("truncated input while reading {0}")]
    Truncated(&'static str),

    #[error("malformed wire data: {0}")]
    Malformed(String),

    #[error("unknown field {field} on {type_name}")]
    UnknownField { type_name: String, field: String },

    #[error("unknown type {0}")]
    UnknownType(String),

    #[error("field {field} on {type_name} cannot hold {found}")]
    TypeMismatch {
        type_name: String,
        field:     String,
        found:     String,
    },

    #[error("at most one member of oneof {group} on {type_name} may be set, found: {}", .fields.join(", "))]
    InvalidOneOf {
        type_name: String,
        group:     String,
        fields:    Vec<String>,
    },

    #[error("message {type_name} is missing required fields: {}", .fields.join(", "))]
    MissingRequiredFields {
        type_name: String,
        fields:    Vec<String>,
    },
}
