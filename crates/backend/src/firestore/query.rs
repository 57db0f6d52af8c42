//! Structured queries for `:runQuery`.

use chrono::{DateTime, SecondsFormat, Utc};
use rocha_brindes_core::ProductId;
use serde::{Deserialize, Serialize};
use serde_json::{Value as Json, json};

use super::value::Document;

/// Position after the last product of an admin list page.
///
/// Products are ordered by `createdAt` descending with the document key as
/// tie-breaker, so the pair identifies a unique position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCursor {
    pub created_at: DateTime<Utc>,
    pub id: ProductId,
}

impl ProductCursor {
    /// Query-string form: `<rfc3339>|<id>`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}|{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.id
        )
    }

    /// Parse the query-string form. Returns `None` for anything malformed.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (timestamp, id) = raw.split_once('|')?;
        if id.is_empty() {
            return None;
        }
        let created_at = DateTime::parse_from_rfc3339(timestamp)
            .ok()?
            .with_timezone(&Utc);
        Some(Self {
            created_at,
            id: ProductId::new(id),
        })
    }
}

/// One row of a `:runQuery` response. Rows without a document only carry
/// the read time.
#[derive(Debug, Deserialize)]
pub struct QueryRow {
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Serialize)]
pub struct RunQuery {
    #[serde(rename = "structuredQuery")]
    structured_query: Json,
}

/// Newest products first, optionally limited.
#[must_use]
pub fn newest_products(limit: Option<u32>) -> RunQuery {
    let mut query = json!({
        "from": [{"collectionId": "produtos"}],
        "orderBy": [{"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"}],
    });
    if let Some(limit) = limit {
        query["limit"] = json!(limit);
    }
    RunQuery {
        structured_query: query,
    }
}

/// One admin list page: newest first, starting after `cursor`.
///
/// `cursor_document` is the full resource name of the cursor's product.
#[must_use]
pub fn product_page(page_size: u32, cursor: Option<(&ProductCursor, String)>) -> RunQuery {
    let mut query = json!({
        "from": [{"collectionId": "produtos"}],
        "orderBy": [
            {"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"},
            {"field": {"fieldPath": "__name__"}, "direction": "DESCENDING"}
        ],
        "limit": page_size,
    });
    if let Some((cursor, document_name)) = cursor {
        query["startAt"] = json!({
            "values": [
                {"timestampValue": cursor.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)},
                {"referenceValue": document_name}
            ],
            "before": false
        });
    }
    RunQuery {
        structured_query: query,
    }
}

/// Every category, by display name.
#[must_use]
pub fn categories_by_name() -> RunQuery {
    RunQuery {
        structured_query: json!({
            "from": [{"collectionId": "categorias"}],
            "orderBy": [{"field": {"fieldPath": "nome"}, "direction": "ASCENDING"}],
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_cursor_round_trips_through_query_string() {
        let cursor = ProductCursor {
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            id: ProductId::new("CAN-001"),
        };
        let encoded = cursor.encode();
        assert_eq!(encoded, "2024-05-01T12:00:00Z|CAN-001");
        assert_eq!(ProductCursor::parse(&encoded), Some(cursor));
    }

    #[test]
    fn test_malformed_cursor() {
        assert!(ProductCursor::parse("").is_none());
        assert!(ProductCursor::parse("ontem|CAN-001").is_none());
        assert!(ProductCursor::parse("2024-05-01T12:00:00Z|").is_none());
    }

    #[test]
    fn test_newest_products_query() {
        let body = serde_json::to_value(newest_products(Some(50))).unwrap();
        assert_eq!(body["structuredQuery"]["limit"], 50);
        assert_eq!(
            body["structuredQuery"]["orderBy"][0]["direction"],
            "DESCENDING"
        );

        let body = serde_json::to_value(newest_products(None)).unwrap();
        assert!(body["structuredQuery"].get("limit").is_none());
    }

    #[test]
    fn test_product_page_starts_after_cursor() {
        let cursor = ProductCursor {
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            id: ProductId::new("CAN-001"),
        };
        let body = serde_json::to_value(product_page(
            50,
            Some((&cursor, "projects/p/databases/(default)/documents/produtos/CAN-001".to_string())),
        ))
        .unwrap();
        let start = &body["structuredQuery"]["startAt"];
        assert_eq!(start["before"], false);
        assert_eq!(start["values"][0]["timestampValue"], "2024-05-01T12:00:00Z");
        assert_eq!(
            start["values"][1]["referenceValue"],
            "projects/p/databases/(default)/documents/produtos/CAN-001"
        );
    }

    #[test]
    fn test_query_rows_without_documents() {
        let rows: Vec<QueryRow> =
            serde_json::from_str(r#"[{"readTime": "2024-05-01T12:00:00Z"}]"#).unwrap();
        assert!(rows[0].document.is_none());
    }
}
