use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error_handling::PluginError;

/// How Pocket tags containing spaces are rewritten into note tags.
///
/// Pocket allows `tag with spaces`, note tags do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiWordTagConversion {
    /// `tag with spaces` becomes `tag_with_spaces`
    #[default]
    SnakeCase,
    /// `tag with spaces` becomes `TagWithSpaces`
    CamelCase,
    /// `tag with spaces` is left unchanged
    DoNothing,
}

impl MultiWordTagConversion {
    pub const ALL: [MultiWordTagConversion; 3] = [
        MultiWordTagConversion::SnakeCase,
        MultiWordTagConversion::CamelCase,
        MultiWordTagConversion::DoNothing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MultiWordTagConversion::SnakeCase => "snake-case",
            MultiWordTagConversion::CamelCase => "camel-case",
            MultiWordTagConversion::DoNothing => "do-nothing",
        }
    }

    /// Label shown next to the option in the settings panel
    pub fn label(&self) -> &'static str {
        match self {
            MultiWordTagConversion::SnakeCase => {
                "Snake case ('#tag with spaces' becomes #tag_with_spaces)"
            }
            MultiWordTagConversion::CamelCase => {
                "Camel case ('#tag with spaces' becomes #TagWithSpaces)"
            }
            MultiWordTagConversion::DoNothing => {
                "Do nothing ('#tag with spaces' remains unchanged)"
            }
        }
    }

    /// Convert a single Pocket tag
    pub fn convert(&self, tag: &str) -> String {
        match self {
            MultiWordTagConversion::DoNothing => tag.to_string(),
            MultiWordTagConversion::SnakeCase => {
                tag.split_whitespace().collect::<Vec<_>>().join("_")
            }
            MultiWordTagConversion::CamelCase => tag
                .split_whitespace()
                .map(capitalize)
                .collect::<String>(),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for MultiWordTagConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MultiWordTagConversion {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|conversion| conversion.as_str() == s)
            .ok_or_else(|| {
                PluginError::invalid_input(&format!("unknown tag conversion '{}'", s))
            })
    }
}

/// Split comma-separated tag input, trimming entries and dropping empty ones
pub fn parse_tag_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of [`parse_tag_list`] for displaying a list in a text field
pub fn format_tag_list(tags: &[String]) -> String {
    tags.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_conversions() {
        let tag = "tag with spaces";
        assert_eq!(MultiWordTagConversion::SnakeCase.convert(tag), "tag_with_spaces");
        assert_eq!(MultiWordTagConversion::CamelCase.convert(tag), "TagWithSpaces");
        assert_eq!(MultiWordTagConversion::DoNothing.convert(tag), "tag with spaces");
    }

    #[test]
    fn test_conversion_collapses_whitespace() {
        assert_eq!(
            MultiWordTagConversion::SnakeCase.convert("  read   later "),
            "read_later"
        );
        assert_eq!(MultiWordTagConversion::CamelCase.convert("rust"), "Rust");
    }

    #[test]
    fn test_parse_from_str() {
        assert_eq!(
            "camel-case".parse::<MultiWordTagConversion>().unwrap(),
            MultiWordTagConversion::CamelCase
        );
        assert!("kebab-case".parse::<MultiWordTagConversion>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&MultiWordTagConversion::DoNothing).unwrap();
        assert_eq!(json, "\"do-nothing\"");
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(parse_tag_list("a, b ,, c "), vec!["a", "b", "c"]);
        assert!(parse_tag_list("").is_empty());
        assert!(parse_tag_list(" , ,").is_empty());
    }

    proptest! {
        #[test]
        fn prop_parsed_tags_are_trimmed_and_non_empty(input in ".*") {
            for tag in parse_tag_list(&input) {
                prop_assert!(!tag.is_empty());
                prop_assert_eq!(tag.trim(), tag.as_str());
                prop_assert!(!tag.contains(','));
            }
        }

        #[test]
        fn prop_formatted_list_parses_back(tags in proptest::collection::vec("[a-z][a-z0-9_]{0,8}", 0..6)) {
            prop_assert_eq!(parse_tag_list(&format_tag_list(&tags)), tags);
        }

        #[test]
        fn prop_snake_case_has_no_whitespace(tag in "[a-z ]{0,20}") {
            let converted = MultiWordTagConversion::SnakeCase.convert(&tag);
            prop_assert!(!converted.contains(' '));
        }
    }
}
