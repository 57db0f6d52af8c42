//! Conversions between Firestore documents and catalog types.

use rocha_brindes_core::{Category, LayoutConfig, Product};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use super::value::Document;
use crate::BackendError;

/// Fields stored as Firestore timestamps rather than strings.
const TIMESTAMP_FIELDS: &[&str] = &["createdAt"];

/// Decode a document into `T`, filling `id` from the document key when the
/// stored fields do not carry one.
fn decode_keyed<T: DeserializeOwned>(doc: &Document) -> Result<T, BackendError> {
    let mut json = doc.to_json()?;
    if let Json::Object(object) = &mut json {
        object.retain(|_, v| !v.is_null());
        object
            .entry("id")
            .or_insert_with(|| Json::String(doc.id().to_string()));
    }
    serde_json::from_value(json)
        .map_err(|e| BackendError::Decode(format!("{}: {e}", doc.name)))
}

fn encode<T: Serialize>(value: &T) -> Result<Document, BackendError> {
    let json = serde_json::to_value(value)?;
    Document::from_json(&json, TIMESTAMP_FIELDS)
}

/// Decode a `produtos` document.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] if required fields are missing or have
/// the wrong type.
pub fn product_from_document(doc: &Document) -> Result<Product, BackendError> {
    decode_keyed(doc)
}

/// Encode a product as a full document body.
///
/// # Errors
///
/// Returns an error if the product cannot be serialized.
pub fn product_to_document(product: &Product) -> Result<Document, BackendError> {
    encode(product)
}

/// Decode a `categorias` document.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] if required fields are missing or have
/// the wrong type.
pub fn category_from_document(doc: &Document) -> Result<Category, BackendError> {
    decode_keyed(doc)
}

/// Encode a category as a full document body.
///
/// # Errors
///
/// Returns an error if the category cannot be serialized.
pub fn category_to_document(category: &Category) -> Result<Document, BackendError> {
    encode(category)
}

/// Decode the `config/layout` document.
///
/// An empty logo reference reads as no logo.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] if a list field holds something other
/// than strings.
pub fn layout_from_document(doc: &Document) -> Result<LayoutConfig, BackendError> {
    let mut json = doc.to_json()?;
    if let Json::Object(object) = &mut json {
        object.retain(|_, v| !v.is_null());
    }
    let mut layout: LayoutConfig = serde_json::from_value(json)
        .map_err(|e| BackendError::Decode(format!("config/layout: {e}")))?;
    layout.logo = layout.logo.filter(|l| !l.is_empty());
    Ok(layout)
}

/// Encode the layout config as a full document body.
///
/// # Errors
///
/// Returns an error if the config cannot be serialized.
pub fn layout_to_document(layout: &LayoutConfig) -> Result<Document, BackendError> {
    encode(layout)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rocha_brindes_core::Variation;
    use serde_json::json;

    use super::*;

    fn document(name: &str, fields: Json) -> Document {
        serde_json::from_value(json!({ "name": name, "fields": fields })).unwrap()
    }

    #[test]
    fn test_product_from_document() {
        let doc = document(
            "projects/p/databases/(default)/documents/produtos/CAN-001",
            json!({
                "nome": {"stringValue": "Caneta Metálica"},
                "descricao": {"stringValue": "Caneta em metal"},
                "categorias": {"arrayValue": {"values": [{"stringValue": "Canetas"}]}},
                "imagem_url": {"stringValue": "https://img/a.webp"},
                "thumb_url": {"stringValue": "https://img/a_thumb.webp"},
                "destaque": {"booleanValue": true},
                "variacoes": {"arrayValue": {"values": [
                    {"mapValue": {"fields": {
                        "cor": {"stringValue": "Azul"},
                        "imagem_url": {"stringValue": "https://img/azul.webp"}
                    }}}
                ]}},
                "createdAt": {"timestampValue": "2024-05-01T12:00:00.123456Z"}
            }),
        );

        let product = product_from_document(&doc).unwrap();
        assert_eq!(product.id.as_str(), "CAN-001");
        assert_eq!(product.name, "Caneta Metálica");
        assert_eq!(product.description.as_deref(), Some("Caneta em metal"));
        assert_eq!(product.categories, vec!["Canetas"]);
        assert!(product.featured);
        assert_eq!(product.variations[0].color, "Azul");
        assert_eq!(
            product.variations[0].image_url.as_deref(),
            Some("https://img/azul.webp")
        );
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_legacy_product_decodes() {
        let doc = document(
            "projects/p/databases/(default)/documents/produtos/old-1",
            json!({
                "nome": {"stringValue": "Chaveiro"},
                "variacoes": {"arrayValue": {"values": [
                    {"stringValue": "Preto"},
                    {"stringValue": "Prata"}
                ]}},
                "thumb_url": {"nullValue": null}
            }),
        );

        let product = product_from_document(&doc).unwrap();
        assert_eq!(product.id.as_str(), "old-1");
        assert_eq!(product.image_url, "");
        assert!(product.categories.is_empty());
        assert!(product.thumb_url.is_none());
        assert_eq!(
            product.variations,
            vec![Variation::named("Preto"), Variation::named("Prata")]
        );
    }

    #[test]
    fn test_stored_id_wins_over_key() {
        let doc = document(
            "projects/p/databases/(default)/documents/produtos/key",
            json!({
                "id": {"stringValue": "CAN-001"},
                "nome": {"stringValue": "Caneta"}
            }),
        );
        assert_eq!(product_from_document(&doc).unwrap().id.as_str(), "CAN-001");
    }

    #[test]
    fn test_product_without_name_is_decode_error() {
        let doc = document("projects/p/databases/(default)/documents/produtos/x", json!({}));
        assert!(matches!(
            product_from_document(&doc),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn test_product_to_document_writes_timestamp() {
        let mut product = Product::new("CAN-001", "Caneta");
        product.image_url = "https://img/a.webp".to_string();
        product.created_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

        let doc = product_to_document(&product).unwrap();
        assert!(matches!(
            doc.fields.get("createdAt"),
            Some(super::super::value::Value::TimestampValue(_))
        ));
        assert!(!doc.fields.contains_key("thumb_url"));

        let back = product_from_document(&Document {
            name: "projects/p/databases/(default)/documents/produtos/CAN-001".to_string(),
            ..doc
        })
        .unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn test_category_from_document() {
        let doc = document(
            "projects/p/databases/(default)/documents/categorias/copos-termicos",
            json!({
                "nome": {"stringValue": "Copos Térmicos"},
                "productCount": {"integerValue": "0"},
                "popular": {"booleanValue": true},
                "imagePath": {"stringValue": "https://img/c.webp"}
            }),
        );
        let category = category_from_document(&doc).unwrap();
        assert_eq!(category.id.as_str(), "copos-termicos");
        assert_eq!(category.name, "Copos Térmicos");
        assert!(category.popular);
        assert_eq!(category.image_path.as_deref(), Some("https://img/c.webp"));
    }

    #[test]
    fn test_new_category_document_has_zero_count() {
        let doc = category_to_document(&Category::new("Copos Térmicos", false, None)).unwrap();
        let json = doc.to_json().unwrap();
        assert_eq!(
            json,
            json!({
                "id": "copos-térmicos",
                "nome": "Copos Térmicos",
                "productCount": 0,
                "popular": false
            })
        );
    }

    #[test]
    fn test_layout_from_partial_document() {
        let doc = document(
            "projects/p/databases/(default)/documents/config/layout",
            json!({
                "logo": {"stringValue": ""},
                "banners": {"arrayValue": {"values": [{"stringValue": "https://img/b1.webp"}]}}
            }),
        );
        let layout = layout_from_document(&doc).unwrap();
        assert_eq!(layout.logo, None);
        assert_eq!(layout.banners, vec!["https://img/b1.webp"]);
        assert!(layout.promotions.is_empty());
        assert!(layout.popups.is_empty());
    }

    #[test]
    fn test_layout_to_document_keeps_empty_lists() {
        let doc = layout_to_document(&LayoutConfig::default()).unwrap();
        let body = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            body,
            json!({"fields": {
                "banners": {"arrayValue": {}},
                "popups": {"arrayValue": {}},
                "promotions": {"arrayValue": {}}
            }})
        );
    }
}
