use lazy_static::lazy_static;
use regex::Regex;

use crate::error::SchemaError;
use crate::utils::quote;

lazy_static! {
    static ref RULE_RX: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*(\.\*)?$").unwrap();
}

/// One include or exclude rule: either an exact fully-qualified name such as
/// `demo.api.Person` or a wildcard prefix such as `demo.api.*`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    text:   String,
    prefix: Option<String>,
}

impl Rule {
    fn parse(text: &str) -> Result<Rule, SchemaError> {
        if !RULE_RX.is_match(text) {
            return Err(SchemaError::InvalidRule(quote(text)));
        }
        let prefix = text
            .strip_suffix(".*")
            .map(|stem| format!("{}.", stem));
        Ok(Rule {
            text: text.to_owned(),
            prefix,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.prefix {
            Some(prefix) => name.starts_with(prefix.as_str()),
            None => name == self.text,
        }
    }
}

/// Include and exclude rules used to prune a schema graph down to the subset
/// reachable from the included roots. Excludes always win over includes when
/// both match the same identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifierSet {
    includes: Vec<Rule>,
    excludes: Vec<Rule>,
}

impl IdentifierSet {
    pub fn new(includes: &[String], excludes: &[String]) -> Result<IdentifierSet, SchemaError> {
        let includes = includes
            .iter()
            .map(|text| Rule::parse(text))
            .collect::<Result<Vec<_>, _>>()?;
        let excludes = excludes
            .iter()
            .map(|text| Rule::parse(text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IdentifierSet { includes, excludes })
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// With no include rules at all, every top-level declaration is a root.
    pub fn includes_everything(&self) -> bool {
        self.includes.is_empty()
    }

    pub fn includes(&self) -> &[Rule] {
        &self.includes
    }

    pub fn excludes(&self) -> &[Rule] {
        &self.excludes
    }

    /// Index of the first include rule matching `name`, if any.
    pub fn matching_include(&self, name: &str) -> Option<usize> {
        self.includes.iter().position(|rule| rule.matches(name))
    }

    /// Index of the first exclude rule matching `name`, if any.
    pub fn matching_exclude(&self, name: &str) -> Option<usize> {
        self.excludes.iter().position(|rule| rule.matches(name))
    }
}
