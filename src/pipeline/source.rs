//! Source fields read by EXTRACT_REGEX and CONDITIONAL_SET
//!
//! Grammar: `name`, `type`, `zone`, `status`, `id`, or `label<delimiter><key>`
//! (delimiter defaults to `:`, so `label:team` reads the `team` label).

use crate::error::EngineError;
use crate::models::{GceResource, LabelMapping, MatchOperator};
use regex::Regex;

pub const DEFAULT_DELIMITER: &str = ":";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceField {
    Id,
    Name,
    Type,
    Zone,
    Status,
    Label(String),
}

impl SourceField {
    pub fn parse(raw: &str, delimiter: Option<&str>, context: &str) -> Result<Self, EngineError> {
        let field = match raw {
            "id" => SourceField::Id,
            "name" => SourceField::Name,
            "type" => SourceField::Type,
            "zone" => SourceField::Zone,
            "status" => SourceField::Status,
            other => {
                let delimiter = delimiter
                    .filter(|d| !d.is_empty())
                    .unwrap_or(DEFAULT_DELIMITER);
                let key = other
                    .strip_prefix("label")
                    .and_then(|rest| rest.strip_prefix(delimiter))
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| {
                        EngineError::configuration(
                            context,
                            format!(
                                "unknown sourceField '{}' (expected name, type, zone, status, id or label{}<key>)",
                                other, delimiter
                            ),
                        )
                    })?;
                SourceField::Label(key.to_string())
            }
        };
        Ok(field)
    }

    /// Read the field. Labels come from the working mapping, not the original resource.
    pub fn resolve<'a>(&'a self, resource: &'a GceResource, labels: &'a LabelMapping) -> Option<&'a str> {
        match self {
            SourceField::Id => Some(&resource.id),
            SourceField::Name => Some(&resource.name),
            SourceField::Type => Some(resource.resource_type.as_str()),
            SourceField::Zone => Some(&resource.zone),
            SourceField::Status => Some(&resource.status),
            SourceField::Label(key) => labels.get(key).map(String::as_str),
        }
    }
}

/// A CONDITIONAL_SET comparison ready to run
#[derive(Debug)]
pub enum Matcher {
    Equals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Regex(Regex),
}

impl Matcher {
    pub fn build(operator: MatchOperator, expected: &str, context: &str) -> Result<Self, EngineError> {
        let matcher = match operator {
            MatchOperator::Equals => Matcher::Equals(expected.to_string()),
            MatchOperator::Contains => Matcher::Contains(expected.to_string()),
            MatchOperator::StartsWith => Matcher::StartsWith(expected.to_string()),
            MatchOperator::EndsWith => Matcher::EndsWith(expected.to_string()),
            MatchOperator::MatchesRegex => Matcher::Regex(compile_regex(expected, context)?),
        };
        Ok(matcher)
    }

    pub fn is_match(&self, input: &str) -> bool {
        match self {
            Matcher::Equals(expected) => input == expected,
            Matcher::Contains(expected) => input.contains(expected.as_str()),
            Matcher::StartsWith(expected) => input.starts_with(expected.as_str()),
            Matcher::EndsWith(expected) => input.ends_with(expected.as_str()),
            Matcher::Regex(re) => re.is_match(input),
        }
    }
}

pub fn compile_regex(pattern: &str, context: &str) -> Result<Regex, EngineError> {
    Regex::new(pattern)
        .map_err(|e| EngineError::configuration(context, format!("invalid regex '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;

    fn resource() -> GceResource {
        GceResource::new("42", "api-01", ResourceType::Instance, "europe-west1-b", "RUNNING")
    }

    #[test]
    fn test_parse_builtin_and_label_fields() {
        assert_eq!(SourceField::parse("zone", None, "t").unwrap(), SourceField::Zone);
        assert_eq!(
            SourceField::parse("label:team", None, "t").unwrap(),
            SourceField::Label("team".into())
        );
        assert_eq!(
            SourceField::parse("label/team", Some("/"), "t").unwrap(),
            SourceField::Label("team".into())
        );
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        assert!(SourceField::parse("owner", None, "t").is_err());
        assert!(SourceField::parse("label:", None, "t").is_err());
        assert!(SourceField::parse("label/team", None, "t").is_err());
    }

    #[test]
    fn test_resolve_reads_working_labels() {
        let resource = resource();
        let mut labels = LabelMapping::new();
        labels.insert("team".into(), "payments".into());

        let field = SourceField::Label("team".into());
        assert_eq!(field.resolve(&resource, &labels), Some("payments"));
        assert_eq!(SourceField::Type.resolve(&resource, &labels), Some("instance"));
        assert_eq!(
            SourceField::Label("missing".into()).resolve(&resource, &labels),
            None
        );
    }

    #[test]
    fn test_matchers() {
        let starts = Matcher::build(MatchOperator::StartsWith, "europe-", "t").unwrap();
        assert!(starts.is_match("europe-west1-b"));

        let re = Matcher::build(MatchOperator::MatchesRegex, r"^api-\d+$", "t").unwrap();
        assert!(re.is_match("api-01"));
        assert!(!re.is_match("web-01"));

        assert!(Matcher::build(MatchOperator::MatchesRegex, "(", "t").is_err());
    }
}
