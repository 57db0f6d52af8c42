//! Session-held models for admin.
//!
//! - [`CurrentAdmin`] - the signed-in operator and their Firebase tokens
//! - [`Flash`] - one-shot result message shown after a write

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind, set_flash, take_flash};
pub use session::{CurrentAdmin, keys as session_keys};
