//! Newtype IDs for type-safe document references.
//!
//! Documents in the hosted database are keyed by strings: a product's key is
//! its user-visible code (SKU) and a category's key is the slug of its name.
//! Use the `define_id!` macro to create wrappers that prevent mixing them up.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use rocha_brindes_core::define_id;
/// define_id!(SkuId);
/// define_id!(SlugId);
///
/// let sku = SkuId::new("CAN-001");
/// assert_eq!(sku.as_str(), "CAN-001");
///
/// // These are different types, so this won't compile:
/// // let _: SlugId = sku;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(CategoryId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversions() {
        let id = ProductId::new("CAN-001");
        assert_eq!(id.to_string(), "CAN-001");
        assert_eq!(id.as_str(), "CAN-001");
        assert_eq!(ProductId::from("CAN-001"), id);
        assert_eq!(id.into_inner(), "CAN-001".to_string());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = CategoryId::new("canetas");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"canetas\"");
        let back: CategoryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
