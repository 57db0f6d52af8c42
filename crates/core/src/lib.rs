//! Rocha Brindes Core - Shared catalog types library.
//!
//! This crate provides the domain types and pure logic used by every
//! Rocha Brindes component:
//! - `storefront` - Public catalog and quote flow
//! - `admin` - Back-office for products, categories and homepage layout
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no backend access. Documents are fetched by
//! `rocha-brindes-backend` and handed here for filtering, cart aggregation
//! and quote formatting.
//!
//! # Modules
//!
//! - [`types`] - Products, categories, layout config and string-keyed IDs
//! - [`cart`] - Quote cart aggregation
//! - [`catalog`] - Category/search filtering of the product list
//! - [`quote`] - Checkout message and WhatsApp deep link
//! - [`image`] - Image CDN URL building
//! - [`storage`] - Object storage path conventions
//! - [`store`] - Per-visitor catalog state (cart, selection, UI flags)
//! - [`validation`] - Admin form checks

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod image;
pub mod quote;
pub mod storage;
pub mod store;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartItem};
pub use catalog::{CategoryFilter, filter_products};
pub use image::{ImageCdn, ImageOptions};
pub use quote::{QuoteContact, QuoteError};
pub use store::CatalogStore;
pub use types::*;
pub use validation::ValidationError;
