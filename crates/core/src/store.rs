//! Per-visitor catalog state.
//!
//! Everything a visitor changes while browsing lives here: the quote cart,
//! the selected category and search term, and whether the cart sidebar or
//! the product quick view is open. The storefront keeps one of these in the
//! visitor's session and re-renders from it after every action.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartItem};
use crate::catalog::{CategoryFilter, filter_products};
use crate::types::{Product, ProductId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStore {
    cart: Cart,
    #[serde(default)]
    category: CategoryFilter,
    #[serde(default)]
    search: String,
    #[serde(default)]
    cart_open: bool,
    /// Product shown in the quick-view modal.
    #[serde(default)]
    modal: Option<ProductId>,
}

impl CatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_cart(&mut self, product: Product) {
        self.cart.add(product);
    }

    pub fn remove_from_cart(&mut self, id: &ProductId) -> Option<CartItem> {
        self.cart.remove(id)
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// Total units in the cart, shown on the header badge.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.cart.count()
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Flip the cart sidebar open or closed, returning the new state.
    pub const fn toggle_cart(&mut self) -> bool {
        self.cart_open = !self.cart_open;
        self.cart_open
    }

    pub const fn set_cart_open(&mut self, open: bool) {
        self.cart_open = open;
    }

    #[must_use]
    pub const fn is_cart_open(&self) -> bool {
        self.cart_open
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
    }

    #[must_use]
    pub const fn category(&self) -> &CategoryFilter {
        &self.category
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn open_modal(&mut self, id: ProductId) {
        self.modal = Some(id);
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    #[must_use]
    pub const fn modal(&self) -> Option<&ProductId> {
        self.modal.as_ref()
    }

    /// Products visible under the current selection and search.
    #[must_use]
    pub fn visible<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        filter_products(products, &self.category, &self.search)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, category: &str) -> Product {
        let mut product = Product::new(id, format!("Produto {id}"));
        product.categories = vec![category.to_string()];
        product
    }

    #[test]
    fn test_cart_actions_update_count() {
        let mut store = CatalogStore::new();
        store.add_to_cart(product("A", "Canetas"));
        store.add_to_cart(product("A", "Canetas"));
        store.add_to_cart(product("B", "Copos"));
        assert_eq!(store.cart_count(), 3);

        store.remove_from_cart(&ProductId::new("A"));
        assert_eq!(store.cart_count(), 1);

        store.clear_cart();
        assert_eq!(store.cart_count(), 0);
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_toggle_cart() {
        let mut store = CatalogStore::new();
        assert!(!store.is_cart_open());
        assert!(store.toggle_cart());
        assert!(!store.toggle_cart());
        store.set_cart_open(true);
        assert!(store.is_cart_open());
    }

    #[test]
    fn test_visible_uses_selection_and_search() {
        let products = vec![product("CAN-1", "Canetas"), product("COP-1", "Copos")];
        let mut store = CatalogStore::new();
        assert_eq!(store.visible(&products).len(), 2);

        store.set_category(CategoryFilter::parse(Some("Copos")));
        assert_eq!(store.visible(&products)[0].id.as_str(), "COP-1");

        store.set_category(CategoryFilter::All);
        store.set_search("can");
        assert_eq!(store.visible(&products)[0].id.as_str(), "CAN-1");
        assert_eq!(store.visible(&products).len(), 1);
    }

    #[test]
    fn test_modal() {
        let mut store = CatalogStore::new();
        store.open_modal(ProductId::new("A"));
        assert_eq!(store.modal().map(ProductId::as_str), Some("A"));
        store.close_modal();
        assert!(store.modal().is_none());
    }

    #[test]
    fn test_survives_session_serialization() {
        let mut store = CatalogStore::new();
        store.add_to_cart(product("A", "Canetas"));
        store.set_search("x");
        let json = serde_json::to_value(&store).unwrap();
        let back: CatalogStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, store);
    }
}
