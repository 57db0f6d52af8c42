//! Catalog product type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProductId;

/// A promotional product in the catalog.
///
/// Products carry no price: visitors collect them into a quote and the
/// store answers with pricing over WhatsApp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Document key, also shown to visitors as the product code.
    pub id: ProductId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Names of the categories this product is listed under.
    #[serde(rename = "categorias", default)]
    pub categories: Vec<String>,
    /// Primary image reference. Empty for legacy documents without one.
    #[serde(rename = "imagem_url", default)]
    pub image_url: String,
    /// Compressed thumbnail reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    /// Full gallery, primary image first.
    #[serde(rename = "imagens_urls", default)]
    pub gallery: Vec<String>,
    #[serde(rename = "variacoes", default)]
    pub variations: Vec<Variation>,
    #[serde(rename = "destaque", default)]
    pub featured: bool,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A named color option of a product with its own images.
///
/// Older documents store variations as bare color names; those decode with
/// no image references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VariationRepr")]
pub struct Variation {
    #[serde(rename = "cor")]
    pub color: String,
    #[serde(rename = "imagem_url", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VariationRepr {
    Name(String),
    Full {
        #[serde(rename = "cor")]
        color: String,
        #[serde(rename = "imagem_url", default)]
        image_url: Option<String>,
        #[serde(default)]
        thumb_url: Option<String>,
    },
}

impl From<VariationRepr> for Variation {
    fn from(repr: VariationRepr) -> Self {
        match repr {
            VariationRepr::Name(color) => Self::named(color),
            VariationRepr::Full {
                color,
                image_url,
                thumb_url,
            } => Self {
                color,
                image_url: image_url.filter(|u| !u.is_empty()),
                thumb_url: thumb_url.filter(|u| !u.is_empty()),
            },
        }
    }
}

impl Variation {
    /// A variation with a color name and no images of its own.
    #[must_use]
    pub fn named(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            image_url: None,
            thumb_url: None,
        }
    }
}

impl Product {
    /// Create a product with only the required fields set.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            categories: Vec::new(),
            image_url: String::new(),
            thumb_url: None,
            gallery: Vec::new(),
            variations: Vec::new(),
            featured: false,
            created_at: None,
        }
    }

    /// Whether this product is listed under the exact category name.
    #[must_use]
    pub fn in_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Whether the name or the id contains `term`, ignoring case.
    ///
    /// An empty term matches every product.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        if term.is_empty() {
            return true;
        }
        let needle = term.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.id.as_str().to_lowercase().contains(&needle)
    }

    /// Image shown on grid cards and cart lines.
    ///
    /// Prefers the thumbnail, then the primary image, then the first
    /// variation's thumbnail and image.
    #[must_use]
    pub fn card_image(&self) -> Option<&str> {
        let first = self.variations.first();
        self.thumb_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| Some(self.image_url.as_str()).filter(|u| !u.is_empty()))
            .or_else(|| first.and_then(|v| v.thumb_url.as_deref()))
            .or_else(|| first.and_then(|v| v.image_url.as_deref()))
    }

    /// Every full-size image reference, primary first, without duplicates.
    #[must_use]
    pub fn images(&self) -> Vec<&str> {
        let mut images: Vec<&str> = Vec::with_capacity(self.gallery.len() + 1);
        let candidates = std::iter::once(self.image_url.as_str())
            .chain(self.gallery.iter().map(String::as_str))
            .chain(self.variations.iter().filter_map(|v| v.image_url.as_deref()));
        for url in candidates {
            if !url.is_empty() && !images.contains(&url) {
                images.push(url);
            }
        }
        images
    }

    /// Human label for the number of color variations ("1 cor", "3 cores").
    #[must_use]
    pub fn colors_label(&self) -> Option<String> {
        match self.variations.len() {
            0 => None,
            1 => Some("1 cor".to_string()),
            n => Some(format!("{n} cores")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pen() -> Product {
        let mut product = Product::new("CAN-001", "Caneta Metálica");
        product.categories = vec!["Canetas".to_string(), "Escritório".to_string()];
        product.image_url = "https://img/caneta.png".to_string();
        product
    }

    #[test]
    fn test_in_category_is_exact() {
        let product = pen();
        assert!(product.in_category("Canetas"));
        assert!(!product.in_category("canetas"));
        assert!(!product.in_category("Canet"));
    }

    #[test]
    fn test_matches_search_name_and_id() {
        let product = pen();
        assert!(product.matches_search(""));
        assert!(product.matches_search("METÁL"));
        assert!(product.matches_search("can-0"));
        assert!(!product.matches_search("chaveiro"));
    }

    #[test]
    fn test_card_image_preference() {
        let mut product = pen();
        assert_eq!(product.card_image(), Some("https://img/caneta.png"));

        product.thumb_url = Some("https://img/thumb.webp".to_string());
        assert_eq!(product.card_image(), Some("https://img/thumb.webp"));

        let mut bare = Product::new("X", "Sem imagem");
        assert_eq!(bare.card_image(), None);
        bare.variations.push(Variation {
            color: "Azul".to_string(),
            image_url: Some("https://img/azul.png".to_string()),
            thumb_url: None,
        });
        assert_eq!(bare.card_image(), Some("https://img/azul.png"));
    }

    #[test]
    fn test_images_dedupes_primary() {
        let mut product = pen();
        product.gallery = vec![
            "https://img/caneta.png".to_string(),
            "https://img/caneta-2.png".to_string(),
        ];
        assert_eq!(
            product.images(),
            vec!["https://img/caneta.png", "https://img/caneta-2.png"]
        );
    }

    #[test]
    fn test_legacy_string_variations_decode() {
        let json = serde_json::json!({
            "id": "CAN-002",
            "nome": "Caneta",
            "variacoes": ["Azul", {"cor": "Preto", "imagem_url": "https://img/preto.png"}]
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.variations.len(), 2);
        assert_eq!(product.variations[0], Variation::named("Azul"));
        assert_eq!(
            product.variations[1].image_url.as_deref(),
            Some("https://img/preto.png")
        );
        assert_eq!(product.colors_label().as_deref(), Some("2 cores"));
    }
}
