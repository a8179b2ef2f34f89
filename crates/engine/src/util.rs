//! Internal helpers for input normalization.
//!
//! These utilities are **not** part of the public API.

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

/// Trim a user-provided name, rejecting empty values.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let display: String = value.nfkc().collect::<String>().trim().to_string();
    if display.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(display)
}

/// Case- and width-insensitive key used for uniqueness checks.
pub(crate) fn normalize_name_key(display: &str) -> String {
    display
        .nfkc()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_keyed_case_insensitively() {
        let display = normalize_required_name("  Groceries  ", "category").unwrap();
        assert_eq!(display, "Groceries");
        assert_eq!(normalize_name_key("Eating   Out"), "eating out");
        assert_eq!(normalize_name_key("ＦＯＯＤ"), "food");
    }

    #[test]
    fn empty_names_are_rejected() {
        assert_eq!(
            normalize_required_name("   ", "category"),
            Err(EngineError::InvalidName(
                "category name must not be empty".to_string()
            ))
        );
        assert_eq!(normalize_optional_text(Some("  ")), None);
    }
}
