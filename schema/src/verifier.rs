use std::collections::HashMap;

use crate::{
    error::SchemaError,
    model::{FieldType, Label, Schema, Type},
    utils::quote,
};

#[derive(Clone, Copy, PartialEq)]
enum DeclaredKind {
    Message,
    Enum,
    Service,
}

/// Qualifies declared names with their file's package, resolves every type
/// reference to a fully-qualified name, and validates the schema. Messages
/// come out with their fields sorted by ascending tag, which is the order
/// the codec encodes them in.
pub fn verify_schema(schema: &mut Schema) -> Result<(), SchemaError> {
    qualify_names(schema)?;

    let mut declared: HashMap<String, DeclaredKind> = HashMap::new();
    for ty in schema.types() {
        let kind = match ty {
            Type::Message(_) => DeclaredKind::Message,
            Type::Enum(_) => DeclaredKind::Enum,
        };
        if declared.insert(ty.name().to_owned(), kind).is_some() {
            return Err(SchemaError::VerifierError(format!(
                "The type {} is defined twice",
                quote(ty.name())
            )));
        }
    }
    for service in schema.services() {
        if declared
            .insert(service.name.clone(), DeclaredKind::Service)
            .is_some()
        {
            return Err(SchemaError::VerifierError(format!(
                "The name {} is defined twice",
                quote(&service.name)
            )));
        }
    }

    resolve_references(schema, &declared)?;
    check_messages(schema)?;
    check_enums(schema)?;

    // Codec order: ascending declared tag.
    for file in &mut schema.files {
        for ty in &mut file.types {
            if let Type::Message(message) = ty {
                message.fields.sort_by_key(|field| field.tag);
            }
        }
    }

    Ok(())
}

fn qualify_names(schema: &mut Schema) -> Result<(), SchemaError> {
    for file in &mut schema.files {
        let prefix = match &file.package {
            Some(package) => format!("{}.", package),
            None => String::new(),
        };
        for ty in &mut file.types {
            let bare = ty.name().to_owned();
            if FieldType::scalar(&bare).is_some() {
                return Err(SchemaError::VerifierError(format!(
                    "The type name {} is reserved",
                    quote(&bare)
                )));
            }
            match ty {
                Type::Message(message) => message.name = format!("{}{}", prefix, bare),
                Type::Enum(enum_type) => enum_type.name = format!("{}{}", prefix, bare),
            }
        }
        for service in &mut file.services {
            service.name = format!("{}{}", prefix, service.name);
        }
    }
    Ok(())
}

fn resolve_references(
    schema: &mut Schema,
    declared: &HashMap<String, DeclaredKind>,
) -> Result<(), SchemaError> {
    for file in &mut schema.files {
        let prefix = match &file.package {
            Some(package) => format!("{}.", package),
            None => String::new(),
        };

        let resolve = |reference: &str, context: &str| -> Result<String, SchemaError> {
            let in_package = format!("{}{}", prefix, reference);
            if declared.contains_key(&in_package) {
                Ok(in_package)
            } else if declared.contains_key(reference) {
                Ok(reference.to_owned())
            } else {
                Err(SchemaError::VerifierError(format!(
                    "The type {} is not defined for {}",
                    quote(reference),
                    context
                )))
            }
        };

        for ty in &mut file.types {
            let Type::Message(message) = ty else { continue };
            for field in &mut message.fields {
                if let FieldType::Named(reference) = &field.type_ {
                    let context = format!("field {}", quote(&field.name));
                    let resolved = resolve(reference, &context)?;
                    if declared.get(&resolved) == Some(&DeclaredKind::Service) {
                        return Err(SchemaError::VerifierError(format!(
                            "Field {} cannot reference service {}",
                            quote(&field.name),
                            quote(&resolved)
                        )));
                    }
                    field.type_ = FieldType::Named(resolved);
                }
            }
        }

        for service in &mut file.services {
            for rpc in &mut service.rpcs {
                let context = format!("rpc {}", quote(&rpc.name));
                rpc.request = resolve(&rpc.request, &context)?;
                rpc.response = resolve(&rpc.response, &context)?;
                for reference in [&rpc.request, &rpc.response] {
                    if declared.get(reference) != Some(&DeclaredKind::Message) {
                        return Err(SchemaError::VerifierError(format!(
                            "The rpc {} must take and return message types, found {}",
                            quote(&rpc.name),
                            quote(reference)
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_messages(schema: &Schema) -> Result<(), SchemaError> {
    for ty in schema.types() {
        let Type::Message(message) = ty else { continue };

        let mut tags = Vec::new();
        for field in &message.fields {
            if tags.contains(&field.tag) {
                return Err(SchemaError::VerifierError(format!(
                    "The tag for field {} is used twice in {}",
                    quote(&field.name),
                    quote(&message.name)
                )));
            }
            if field.tag == 0 {
                return Err(SchemaError::VerifierError(format!(
                    "The tag for field {} must be positive",
                    quote(&field.name)
                )));
            }
            tags.push(field.tag);

            if field.oneof.is_some() && field.label != Label::Optional {
                return Err(SchemaError::VerifierError(format!(
                    "The oneof member {} must be optional",
                    quote(&field.name)
                )));
            }
        }

        let mut names = Vec::new();
        for field in &message.fields {
            if names.contains(&&field.name) {
                return Err(SchemaError::VerifierError(format!(
                    "The field {} is defined twice in {}",
                    quote(&field.name),
                    quote(&message.name)
                )));
            }
            names.push(&field.name);
        }
    }
    Ok(())
}

fn check_enums(schema: &Schema) -> Result<(), SchemaError> {
    for ty in schema.types() {
        let Type::Enum(enum_type) = ty else { continue };
        let mut numbers = Vec::new();
        let mut names = Vec::new();
        for constant in &enum_type.constants {
            if numbers.contains(&constant.number) {
                return Err(SchemaError::VerifierError(format!(
                    "The number for constant {} is used twice in {}",
                    quote(&constant.name),
                    quote(&enum_type.name)
                )));
            }
            if names.contains(&&constant.name) {
                return Err(SchemaError::VerifierError(format!(
                    "The constant {} is defined twice in {}",
                    quote(&constant.name),
                    quote(&enum_type.name)
                )));
            }
            numbers.push(constant.number);
            names.push(&constant.name);
        }
    }
    Ok(())
}
