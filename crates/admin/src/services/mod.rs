//! Business logic services for admin.
//!
//! # Services
//!
//! - `images` - Downscaling and WebP encoding of uploads

pub mod images;

pub use images::{ImageError, ProcessedImage, ProductImage};
