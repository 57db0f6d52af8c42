//! Core types for Rocha Brindes.
//!
//! Field names on the wire follow the document database's existing schema,
//! which uses Portuguese names (`nome`, `categorias`, `imagem_url`, ...).

pub mod category;
pub mod id;
pub mod layout;
pub mod product;

pub use category::{Category, slugify};
pub use id::*;
pub use layout::{LayoutConfig, LayoutKind};
pub use product::{Product, Variation};
