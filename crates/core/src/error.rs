//! Error taxonomy for catalog, cart and checkout operations.
//!
//! Nothing in the core retries; every failure is returned to the caller with
//! enough context to tell which field, precondition or invariant failed.

use thiserror::Error;

use crate::types::{PriceError, SlugError};

/// Errors returned by core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    /// A required field is missing or has an invalid value.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The operation is not allowed in the entity's current state.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// The id or slug that was looked up.
        key: String,
    },

    /// A uniqueness constraint would be violated.
    #[error("integrity violation: {0}")]
    Integrity(String),
}

impl ShopError {
    /// Build a [`ShopError::Validation`].
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Build a [`ShopError::Validation`] for a missing required field.
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::validation(field, "this field is required")
    }

    /// Build a [`ShopError::NotFound`].
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Build a [`ShopError::Precondition`].
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Build a [`ShopError::Integrity`].
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }

    /// Short machine-readable kind, used in API error bodies.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Precondition(_) => "precondition",
            Self::NotFound { .. } => "not_found",
            Self::Integrity(_) => "integrity",
        }
    }

    /// Attach a field name to a price error.
    #[must_use]
    pub fn price(field: &'static str, err: &PriceError) -> Self {
        Self::validation(field, err.to_string())
    }

    /// Attach a field name to a slug error.
    #[must_use]
    pub fn slug(field: &'static str, err: &SlugError) -> Self {
        Self::validation(field, err.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, ShopError>;

/// Reject empty (after trimming) or over-long text fields.
pub(crate) fn check_text(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ShopError::missing(field));
    }
    check_len(field, value, max)
}

/// Reject over-long optional text fields.
pub(crate) fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(ShopError::validation(
            field,
            format!("must be at most {max} characters (got {len})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ShopError::missing("title").to_string(),
            "invalid title: this field is required"
        );
        assert_eq!(
            ShopError::not_found("product", 7).to_string(),
            "product not found: 7"
        );
        assert_eq!(
            ShopError::precondition("cart 3 is already checked out").to_string(),
            "precondition failed: cart 3 is already checked out"
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(ShopError::missing("x").kind(), "validation");
        assert_eq!(ShopError::precondition("x").kind(), "precondition");
        assert_eq!(ShopError::not_found("cart", 1).kind(), "not_found");
        assert_eq!(ShopError::integrity("x").kind(), "integrity");
    }

    #[test]
    fn test_check_text() {
        assert!(check_text("name", "Phones", 255).is_ok());
        assert_eq!(check_text("name", "   ", 255), Err(ShopError::missing("name")));
        assert!(matches!(
            check_text("name", "abcdef", 5),
            Err(ShopError::Validation { field: "name", .. })
        ));
        // Limits count characters, not bytes
        assert!(check_len("name", "ёёёёё", 5).is_ok());
    }
}
