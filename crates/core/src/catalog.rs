//! Catalog filtering.
//!
//! The storefront fetches the whole product list and narrows it here on
//! every request. There is no index and no pagination: the list is a few
//! hundred documents at most and a linear scan is all it needs.

use serde::{Deserialize, Serialize};

use crate::types::{Category, Product};

/// Sentinel selection meaning "every category".
pub const ALL_CATEGORIES: &str = "Todos";

/// Alternate spelling of [`ALL_CATEGORIES`] accepted from query strings.
const ALL_CATEGORIES_ALIAS: &str = "all";

/// The category a visitor has selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    /// An exact, case-sensitive category name.
    Named(String),
}

impl CategoryFilter {
    /// Interpret a raw selection.
    ///
    /// Absent, empty, `"Todos"` and `"all"` all select every category.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("" | ALL_CATEGORIES | ALL_CATEGORIES_ALIAS) => Self::All,
            Some(name) => Self::Named(name.to_string()),
        }
    }

    /// The value to put back into links and forms.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Named(name) => name,
        }
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether `product` passes this selection.
    #[must_use]
    pub fn accepts(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => product.in_category(name),
        }
    }
}

/// Narrow `products` to the selected category and search term.
///
/// A product is kept when its category list contains the selection (unless
/// every category is selected) and its name or id contains `search`,
/// ignoring case. Input order is preserved.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [Product],
    category: &CategoryFilter,
    search: &str,
) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| category.accepts(p) && p.matches_search(search))
        .collect()
}

/// Sort products newest first; products without a timestamp go last.
pub fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Categories flagged for the homepage "popular" strip, in input order.
#[must_use]
pub fn popular_categories(categories: &[Category]) -> Vec<&Category> {
    categories.iter().filter(|c| c.popular).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn product(id: &str, name: &str, categories: &[&str]) -> Product {
        let mut product = Product::new(id, name);
        product.categories = categories.iter().map(ToString::to_string).collect();
        product
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("CAN-001", "Caneta Metálica", &["Canetas"]),
            product("CHV-010", "Chaveiro Abridor", &["Chaveiros", "Metal"]),
            product("COP-7", "Copo Térmico", &["Copos"]),
            product("can-plastica", "Caneta Plástica", &["Canetas", "Plástico"]),
        ]
    }

    fn ids<'a>(products: &[&'a Product]) -> Vec<&'a str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_all_with_empty_search_returns_everything() {
        let products = catalog();
        for raw in [None, Some(""), Some("Todos"), Some("all")] {
            let filter = CategoryFilter::parse(raw);
            let result = filter_products(&products, &filter, "");
            assert_eq!(result.len(), products.len());
            assert_eq!(
                ids(&result),
                products.iter().map(|p| p.id.as_str()).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_category_is_exact_and_case_sensitive() {
        let products = catalog();

        let result = filter_products(&products, &CategoryFilter::parse(Some("Canetas")), "");
        assert_eq!(ids(&result), vec!["CAN-001", "can-plastica"]);

        let result = filter_products(&products, &CategoryFilter::parse(Some("canetas")), "");
        assert!(result.is_empty());

        let result = filter_products(&products, &CategoryFilter::parse(Some("Caneta")), "");
        assert!(result.is_empty());
    }

    #[test]
    fn test_search_matches_name_and_id_ignoring_case() {
        let products = catalog();
        let all = CategoryFilter::All;

        assert_eq!(
            ids(&filter_products(&products, &all, "CANETA")),
            vec!["CAN-001", "can-plastica"]
        );
        assert_eq!(ids(&filter_products(&products, &all, "chv")), vec!["CHV-010"]);
        assert_eq!(ids(&filter_products(&products, &all, "térm")), vec!["COP-7"]);
        assert!(filter_products(&products, &all, "mochila").is_empty());
    }

    #[test]
    fn test_category_and_search_combine() {
        let products = catalog();
        let filter = CategoryFilter::Named("Canetas".to_string());
        assert_eq!(
            ids(&filter_products(&products, &filter, "plást")),
            vec!["can-plastica"]
        );
    }

    #[test]
    fn test_search_term_is_not_trimmed() {
        let products = catalog();
        assert!(filter_products(&products, &CategoryFilter::All, " copo").is_empty());
    }

    #[test]
    fn test_sort_newest_first() {
        let mut products = catalog();
        products[0].created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        products[2].created_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        sort_newest_first(&mut products);
        assert_eq!(products[0].id.as_str(), "COP-7");
        assert_eq!(products[1].id.as_str(), "CAN-001");
    }

    #[test]
    fn test_filter_round_trips_through_as_str() {
        assert_eq!(CategoryFilter::All.as_str(), "Todos");
        let named = CategoryFilter::parse(Some("Copos"));
        assert_eq!(CategoryFilter::parse(Some(named.as_str())), named);
    }
}
