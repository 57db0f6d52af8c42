//! Catalog category type.

use serde::{Deserialize, Serialize};

use super::CategoryId;

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Slug of the display name, also the document key.
    pub id: CategoryId,
    #[serde(rename = "nome")]
    pub name: String,
    /// Denormalized product count. Written as zero on creation and not
    /// maintained afterwards.
    #[serde(rename = "productCount", default)]
    pub product_count: u32,
    /// Shown in the homepage "popular categories" strip.
    #[serde(default)]
    pub popular: bool,
    #[serde(rename = "imagePath", default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl Category {
    /// Create a category whose id is derived from its display name.
    #[must_use]
    pub fn new(name: impl Into<String>, popular: bool, image_path: Option<String>) -> Self {
        let name = name.into();
        Self {
            id: CategoryId::new(slugify(&name)),
            name,
            product_count: 0,
            popular,
            image_path: image_path.filter(|p| !p.is_empty()),
        }
    }
}

/// Derive a category key from its display name.
///
/// Lowercases the name and collapses every run of whitespace into a single
/// `-`. Accents and punctuation are kept as they are.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
        } else {
            slug.extend(c.to_lowercase());
            in_space = false;
        }
    }
    slug
}
