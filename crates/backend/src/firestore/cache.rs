//! Cache types for Firestore reads.

use std::sync::Arc;

use rocha_brindes_core::{Category, LayoutConfig, Product};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    Products { limit: Option<u32> },
    Categories,
    Layout,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
    Layout(Box<LayoutConfig>),
}
