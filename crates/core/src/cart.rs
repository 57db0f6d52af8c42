//! Quote cart aggregation.
//!
//! The cart is the transient list of products a visitor wants priced. It is
//! never written to the backend; it lives only as long as the visitor's
//! session.

use serde::{Deserialize, Serialize};

use crate::types::{Product, ProductId};

/// A cart line: a product and how many units the visitor asked for.
///
/// Quantity is always at least 1. Lines are removed, never set to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

/// The visitor's quote cart, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add one unit of `product`.
    ///
    /// A product already in the cart has its quantity incremented; otherwise
    /// a new line with quantity 1 is appended.
    pub fn add(&mut self, product: Product) {
        if let Some(line) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.items.push(CartItem {
                product,
                quantity: 1,
            });
        }
    }

    /// Delete the line for `id` outright, returning it if present.
    pub fn remove(&mut self, id: &ProductId) -> Option<CartItem> {
        let index = self.items.iter().position(|i| &i.product.id == id)?;
        Some(self.items.remove(index))
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity of `id` in the cart, zero if absent.
    #[must_use]
    pub fn quantity_of(&self, id: &ProductId) -> u32 {
        self.items
            .iter()
            .find(|i| &i.product.id == id)
            .map_or(0, |i| i.quantity)
    }
}
