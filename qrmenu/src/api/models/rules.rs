//! Field rules shared by the request models.
//!
//! Each rule is a `validator` custom function so that every failing field is reported with its
//! own message in a single `VALIDATION_ERROR` response.

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_SLUG_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

pub static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug regex"));
pub static HEX_COLOR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));

fn fail(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn bounded(value: &str, max: usize, required: &'static str, too_long: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(fail("required", required));
    }
    if value.chars().count() > max {
        return Err(fail("length", too_long));
    }
    Ok(())
}

pub fn restaurant_name(value: &str) -> Result<(), ValidationError> {
    bounded(value, MAX_NAME_LENGTH, "Restaurant name is required", "Name too long")
}

pub fn category_name(value: &str) -> Result<(), ValidationError> {
    bounded(value, MAX_NAME_LENGTH, "Category name is required", "Name too long")
}

pub fn item_name(value: &str) -> Result<(), ValidationError> {
    bounded(value, MAX_NAME_LENGTH, "Item name is required", "Name too long")
}

pub fn slug(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(fail("required", "Slug is required"));
    }
    if value.chars().count() > MAX_SLUG_LENGTH {
        return Err(fail("length", "Slug too long"));
    }
    if !SLUG_REGEX.is_match(value) {
        return Err(fail("format", "Slug must contain only lowercase letters, numbers, and hyphens"));
    }
    Ok(())
}

pub fn hex_color(value: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(fail("format", "Invalid color format (use #RRGGBB)"))
    }
}

pub fn absolute_url(value: &str) -> Result<(), ValidationError> {
    url::Url::parse(value).map(|_| ()).map_err(|_| fail("url", "Invalid URL"))
}

/// Like [`absolute_url`], but an empty string clears the field
pub fn url_or_empty(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() { Ok(()) } else { absolute_url(value) }
}

pub fn non_negative_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(fail("range", "Price must be positive"))
    } else {
        Ok(())
    }
}

/// Trim and lowercase, the canonical form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<(), ValidationError>) -> String {
        result.unwrap_err().message.unwrap().to_string()
    }

    #[test]
    fn test_slug_rules() {
        assert!(slug("le-bistro-42").is_ok());
        assert_eq!(message(slug("")), "Slug is required");
        assert_eq!(message(slug(&"a".repeat(101))), "Slug too long");
        assert_eq!(
            message(slug("Le Bistro")),
            "Slug must contain only lowercase letters, numbers, and hyphens"
        );
    }

    #[test]
    fn test_name_rules() {
        assert!(restaurant_name("Chez Nous").is_ok());
        assert_eq!(message(restaurant_name("   ")), "Restaurant name is required");
        assert_eq!(message(category_name(&"x".repeat(101))), "Name too long");
        assert_eq!(message(item_name("")), "Item name is required");
    }

    #[test]
    fn test_colors_and_urls() {
        assert!(hex_color("#1a2B3c").is_ok());
        assert_eq!(message(hex_color("1a2b3c")), "Invalid color format (use #RRGGBB)");
        assert_eq!(message(hex_color("#12345")), "Invalid color format (use #RRGGBB)");

        assert!(absolute_url("https://cdn.example.com/logo.png").is_ok());
        assert_eq!(message(absolute_url("logo.png")), "Invalid URL");
        assert!(url_or_empty("").is_ok());
        assert_eq!(message(url_or_empty("nope")), "Invalid URL");
    }

    #[test]
    fn test_numeric_rules() {
        assert!(non_negative_price(&Decimal::ZERO).is_ok());
        assert!(non_negative_price(&Decimal::new(1299, 2)).is_ok());
        assert_eq!(message(non_negative_price(&Decimal::new(-1, 2))), "Price must be positive");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Owner@Example.COM "), "owner@example.com");
    }
}
