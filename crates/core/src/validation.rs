//! Admin form validation.
//!
//! Writes go straight to the hosted database, so these checks are the only
//! thing standing between a half-filled form and a broken document.

use crate::types::Product;

/// Errors that can occur when validating an admin form.
///
/// Messages are shown to the operator verbatim.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Informe o nome do produto")]
    MissingName,
    #[error("Informe o código (SKU) do produto")]
    MissingId,
    /// Document keys cannot contain a path separator.
    #[error("O código não pode conter \"/\": {0}")]
    InvalidId(String),
    #[error("Selecione ou envie ao menos uma imagem")]
    MissingImage,
    #[error("Informe o nome da categoria")]
    MissingCategoryName,
}

/// Check a product before it is written.
///
/// # Errors
///
/// Returns the first problem found: blank name, blank or slash-bearing id,
/// or no image at all.
pub fn validate_product(product: &Product) -> Result<(), ValidationError> {
    if product.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    let id = product.id.as_str();
    if id.trim().is_empty() {
        return Err(ValidationError::MissingId);
    }
    if id.contains('/') {
        return Err(ValidationError::InvalidId(id.to_string()));
    }
    if product.image_url.is_empty() && product.gallery.is_empty() {
        return Err(ValidationError::MissingImage);
    }
    Ok(())
}

/// Check a category display name before slugging it into an id.
///
/// # Errors
///
/// Returns [`ValidationError::MissingCategoryName`] for a blank name.
pub fn validate_category_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingCategoryName);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid() -> Product {
        let mut product = Product::new("CAN-001", "Caneta");
        product.image_url = "https://x/a.webp".to_string();
        product
    }

    #[test]
    fn test_valid_product_passes() {
        assert_eq!(validate_product(&valid()), Ok(()));
    }

    #[test]
    fn test_gallery_alone_is_enough() {
        let mut product = valid();
        product.image_url.clear();
        product.gallery = vec!["https://x/b.webp".to_string()];
        assert_eq!(validate_product(&product), Ok(()));
    }

    #[test]
    fn test_missing_image() {
        let mut product = valid();
        product.image_url.clear();
        let err = validate_product(&product).unwrap_err();
        assert_eq!(err, ValidationError::MissingImage);
        assert_eq!(err.to_string(), "Selecione ou envie ao menos uma imagem");
    }

    #[test]
    fn test_blank_fields() {
        let mut product = valid();
        product.name = "  ".to_string();
        assert_eq!(validate_product(&product), Err(ValidationError::MissingName));

        let mut product = valid();
        product.id = "".into();
        assert_eq!(validate_product(&product), Err(ValidationError::MissingId));

        let mut product = valid();
        product.id = "a/b".into();
        assert!(matches!(
            validate_product(&product),
            Err(ValidationError::InvalidId(_))
        ));
    }

    #[test]
    fn test_category_name() {
        assert!(validate_category_name("Canetas").is_ok());
        assert_eq!(
            validate_category_name(" "),
            Err(ValidationError::MissingCategoryName)
        );
    }
}
