use crate::{
    error::SchemaError,
    model::{EnumConstant, EnumType, Field, FieldType, Label, MessageType, ProtoFile, Rpc, Service, Type},
    tokenizer::Token,
    utils::{error, quote},
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:       Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref QUALIFIED:        Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref EQUALS:           Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:        Regex = Regex::new(r"^;$").unwrap();
    static ref INTEGER:          Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref LEFT_BRACE:       Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:      Regex = Regex::new(r"^\}$").unwrap();
    static ref LEFT_PAREN:       Regex = Regex::new(r"^\($").unwrap();
    static ref RIGHT_PAREN:      Regex = Regex::new(r"^\)$").unwrap();
    static ref ENUM_KEYWORD:     Regex = Regex::new(r"^enum$").unwrap();
    static ref MESSAGE_KEYWORD:  Regex = Regex::new(r"^message$").unwrap();
    static ref SERVICE_KEYWORD:  Regex = Regex::new(r"^service$").unwrap();
    static ref PACKAGE_KEYWORD:  Regex = Regex::new(r"^package$").unwrap();
    static ref ONEOF_KEYWORD:    Regex = Regex::new(r"^oneof$").unwrap();
    static ref RPC_KEYWORD:      Regex = Regex::new(r"^rpc$").unwrap();
    static ref RETURNS_KEYWORD:  Regex = Regex::new(r"^returns$").unwrap();
    static ref REQUIRED_KEYWORD: Regex = Regex::new(r"^required$").unwrap();
    static ref OPTIONAL_KEYWORD: Regex = Regex::new(r"^optional$").unwrap();
    static ref REPEATED_KEYWORD: Regex = Regex::new(r"^repeated$").unwrap();
    static ref SENSITIVE_TOKEN:  Regex = Regex::new(r"^\[sensitive\]$").unwrap();
    static ref DEPRECATED_TOKEN: Regex = Regex::new(r"^\[deprecated\]$").unwrap();
    static ref EOF:              Regex = Regex::new(r"^$").unwrap();
}

fn current_token<'a>(tokens: &'a [Token], index: usize) -> &'a Token {
    // The tokenizer always appends an EOF token, so the index stays in range
    // for any grammar rule that stops at EOF.
    &tokens[index.min(tokens.len() - 1)]
}

fn eat(tokens: &[Token], index: &mut usize, test: &Regex) -> bool {
    if test.is_match(&current_token(tokens, *index).text) {
        *index += 1;
        true
    } else {
        false
    }
}

fn expect(tokens: &[Token], index: &mut usize, test: &Regex, expected: &str) -> Result<(), SchemaError> {
    if !eat(tokens, index, test) {
        let tok = current_token(tokens, *index);
        return Err(error(
            &format!("Expected {} but found {}", expected, quote(&tok.text)),
            tok.line,
            tok.column,
        ));
    }
    Ok(())
}

fn unexpected_token(tokens: &[Token], index: usize) -> SchemaError {
    let tok = current_token(tokens, index);
    error(
        &format!("Unexpected token {}", quote(&tok.text)),
        tok.line,
        tok.column,
    )
}

fn parse_tag(tokens: &[Token], index: &mut usize) -> Result<u32, SchemaError> {
    let tok = current_token(tokens, *index);
    expect(tokens, index, &INTEGER, "integer")?;
    tok.text.parse::<u32>().map_err(|_| {
        error(
            &format!("Invalid tag {}, tags must be non-negative integers", quote(&tok.text)),
            tok.line,
            tok.column,
        )
    })
}

fn parse_field(tokens: &[Token], index: &mut usize, oneof: Option<&str>) -> Result<Field, SchemaError> {
    let label = if eat(tokens, index, &REQUIRED_KEYWORD) {
        Label::Required
    } else if eat(tokens, index, &OPTIONAL_KEYWORD) {
        Label::Optional
    } else if eat(tokens, index, &REPEATED_KEYWORD) {
        Label::Repeated
    } else {
        let tok = current_token(tokens, *index);
        return Err(error(
            &format!(
                "Expected \"required\", \"optional\" or \"repeated\" but found {}",
                quote(&tok.text)
            ),
            tok.line,
            tok.column,
        ));
    };

    let type_tok = current_token(tokens, *index);
    let type_text = type_tok.text.clone();
    expect(tokens, index, &QUALIFIED, "type name")?;
    let type_ = FieldType::scalar(&type_text).unwrap_or(FieldType::Named(type_text));

    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "field name")?;

    expect(tokens, index, &EQUALS, "\"=\"")?;
    let tag = parse_tag(tokens, index)?;

    let mut sensitive = false;
    let mut deprecated = false;
    loop {
        if eat(tokens, index, &SENSITIVE_TOKEN) {
            sensitive = true;
        } else if eat(tokens, index, &DEPRECATED_TOKEN) {
            deprecated = true;
        } else {
            break;
        }
    }

    expect(tokens, index, &SEMICOLON, "\";\"")?;

    Ok(Field {
        name,
        line,
        column,
        tag,
        label,
        type_,
        sensitive,
        deprecated,
        oneof: oneof.map(|group| group.to_owned()),
    })
}

fn parse_message(tokens: &[Token], index: &mut usize) -> Result<MessageType, SchemaError> {
    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "identifier")?;
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;

    let mut fields = Vec::new();
    let mut oneofs = Vec::new();
    while !eat(tokens, index, &RIGHT_BRACE) {
        if eat(tokens, index, &EOF) {
            return Err(unexpected_token(tokens, *index - 1));
        }
        if eat(tokens, index, &ONEOF_KEYWORD) {
            let group_tok = current_token(tokens, *index);
            let group = group_tok.text.clone();
            expect(tokens, index, &IDENTIFIER, "identifier")?;
            expect(tokens, index, &LEFT_BRACE, "\"{\"")?;
            while !eat(tokens, index, &RIGHT_BRACE) {
                if eat(tokens, index, &EOF) {
                    return Err(unexpected_token(tokens, *index - 1));
                }
                fields.push(parse_field(tokens, index, Some(&group))?);
            }
            oneofs.push(group);
        } else {
            fields.push(parse_field(tokens, index, None)?);
        }
    }

    Ok(MessageType {
        name,
        line,
        column,
        fields,
        oneofs,
    })
}

fn parse_enum(tokens: &[Token], index: &mut usize) -> Result<EnumType, SchemaError> {
    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "identifier")?;
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;

    let mut constants = Vec::new();
    while !eat(tokens, index, &RIGHT_BRACE) {
        if eat(tokens, index, &EOF) {
            return Err(unexpected_token(tokens, *index - 1));
        }
        let constant_tok = current_token(tokens, *index);
        let constant_name = constant_tok.text.clone();
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        expect(tokens, index, &EQUALS, "\"=\"")?;
        let number = parse_tag(tokens, index)?;
        let deprecated = eat(tokens, index, &DEPRECATED_TOKEN);
        expect(tokens, index, &SEMICOLON, "\";\"")?;
        constants.push(EnumConstant {
            name: constant_name,
            number,
            deprecated,
        });
    }

    Ok(EnumType {
        name,
        line,
        column,
        constants,
    })
}

fn parse_service(tokens: &[Token], index: &mut usize) -> Result<Service, SchemaError> {
    let name_tok = current_token(tokens, *index);
    let (name, line, column) = (name_tok.text.clone(), name_tok.line, name_tok.column);
    expect(tokens, index, &IDENTIFIER, "identifier")?;
    expect(tokens, index, &LEFT_BRACE, "\"{\"")?;

    let mut rpcs = Vec::new();
    while !eat(tokens, index, &RIGHT_BRACE) {
        if eat(tokens, index, &EOF) {
            return Err(unexpected_token(tokens, *index - 1));
        }
        expect(tokens, index, &RPC_KEYWORD, "\"rpc\"")?;
        let rpc_tok = current_token(tokens, *index);
        let rpc_name = rpc_tok.text.clone();
        expect(tokens, index, &IDENTIFIER, "identifier")?;
        expect(tokens, index, &LEFT_PAREN, "\"(\"")?;
        let request = current_token(tokens, *index).text.clone();
        expect(tokens, index, &QUALIFIED, "type name")?;
        expect(tokens, index, &RIGHT_PAREN, "\")\"")?;
        expect(tokens, index, &RETURNS_KEYWORD, "\"returns\"")?;
        expect(tokens, index, &LEFT_PAREN, "\"(\"")?;
        let response = current_token(tokens, *index).text.clone();
        expect(tokens, index, &QUALIFIED, "type name")?;
        expect(tokens, index, &RIGHT_PAREN, "\")\"")?;
        expect(tokens, index, &SEMICOLON, "\";\"")?;
        rpcs.push(Rpc {
            name: rpc_name,
            request,
            response,
        });
    }

    Ok(Service {
        name,
        line,
        column,
        rpcs,
    })
}

/// Parses one token stream into an unresolved schema file. Names are still
/// unqualified; the verifier qualifies them with the package and resolves
/// type references.
pub fn parse_schema(tokens: &[Token]) -> Result<ProtoFile, SchemaError> {
    let mut types = Vec::new();
    let mut services = Vec::new();
    let mut package = None;
    let mut index = 0;

    if eat(tokens, &mut index, &PACKAGE_KEYWORD) {
        let pkg_tok = current_token(tokens, index);
        let pkg = pkg_tok.text.clone();
        expect(tokens, &mut index, &QUALIFIED, "package name")?;
        package = Some(pkg);
        expect(tokens, &mut index, &SEMICOLON, "\";\"")?;
    }

    while index < tokens.len() && !eat(tokens, &mut index, &EOF) {
        if eat(tokens, &mut index, &ENUM_KEYWORD) {
            types.push(Type::Enum(parse_enum(tokens, &mut index)?));
        } else if eat(tokens, &mut index, &MESSAGE_KEYWORD) {
            types.push(Type::Message(parse_message(tokens, &mut index)?));
        } else if eat(tokens, &mut index, &SERVICE_KEYWORD) {
            services.push(parse_service(tokens, &mut index)?);
        } else {
            return Err(unexpected_token(tokens, index));
        }
    }

    Ok(ProtoFile {
        path: String::new(),
        package,
        types,
        services,
    })
}
