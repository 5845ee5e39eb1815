use std::path::PathBuf;

use protoforge_schema::{Schema, Service, Type};

pub mod rust;
pub mod typescript;

pub use rust::RustEmitter;
pub use typescript::TypeScriptEmitter;

/// One generated artifact: where it goes relative to the output directory,
/// and what it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub type_name: String,
    pub path:      PathBuf,
    pub contents:  String,
}

/// Turns one schema declaration into one source file. Emitters are shared
/// across worker threads and so must be `Sync`.
pub trait Emitter: Sync {
    fn emit_type(&self, schema: &Schema, ty: &Type) -> SourceFile;
    fn emit_service(&self, schema: &Schema, service: &Service) -> SourceFile;
}

/// Converts a string to PascalCase. Splits on underscores when present,
/// otherwise only adjusts the first letter, except that a fully-uppercase
/// input (e.g. "SIGNAL") is lowered after its first letter.
pub(crate) fn to_pascal_case(s: &str) -> String {
    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => {
                        first.to_uppercase().to_string() + &chars.as_str().to_lowercase()
                    }
                }
            })
            .collect::<String>()
    } else if s == s.to_uppercase() {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
        }
    } else {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }
}

/// Converts a string to snake_case without splitting acronyms, so that
/// "sessionID" becomes "session_id".
pub(crate) fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if !prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()) {
                    snake.push('_');
                }
            }
            for lower in c.to_lowercase() {
                snake.push(lower);
            }
        } else {
            snake.push(c);
        }
    }
    snake
}

/// The unqualified trailing segment of a dotted name.
pub(crate) fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// The package portion of a dotted name, as path segments.
pub(crate) fn package_segments(qualified: &str) -> Vec<&str> {
    match qualified.rfind('.') {
        Some(dot) => qualified[..dot].split('.').collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_case() {
        assert_eq!(to_pascal_case("search_request"), "SearchRequest");
        assert_eq!(to_pascal_case("SIGNAL"), "Signal");
        assert_eq!(to_pascal_case("alreadyCamel"), "AlreadyCamel");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn snake_case() {
        assert_eq!(to_snake_case("SearchRequest"), "search_request");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("plain"), "plain");
    }

    #[test]
    fn name_splitting() {
        assert_eq!(simple_name("demo.api.Thing"), "Thing");
        assert_eq!(simple_name("Thing"), "Thing");
        assert_eq!(package_segments("demo.api.Thing"), ["demo", "api"]);
        assert!(package_segments("Thing").is_empty());
    }
}
