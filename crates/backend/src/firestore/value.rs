//! Firestore REST value encoding.
//!
//! The REST API wraps every field in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "3"}`, ...). Documents are
//! converted to and from plain JSON here so the catalog types can keep
//! their ordinary serde derives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

use crate::BackendError;

/// A typed Firestore value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 travels as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339 timestamp.
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(Json),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

/// A Firestore document as returned by `GET` and `runQuery`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name, `projects/../documents/<collection>/<id>`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// The document key: last segment of the resource name.
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    /// Flatten the fields into a plain JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Decode`] if an integer field is not a valid
    /// int64.
    pub fn to_json(&self) -> Result<Json, BackendError> {
        fields_to_json(&self.fields)
    }

    /// Build a document body from a plain JSON object.
    ///
    /// String fields named in `timestamps` are written as timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Decode`] if `json` is not an object.
    pub fn from_json(json: &Json, timestamps: &[&str]) -> Result<Self, BackendError> {
        let Json::Object(object) = json else {
            return Err(BackendError::Decode(
                "document body must be a JSON object".to_string(),
            ));
        };

        let fields = object
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(key, v)| {
                let value = match v {
                    Json::String(s) if timestamps.contains(&key.as_str()) => {
                        Value::TimestampValue(s.clone())
                    }
                    other => Value::from(other),
                };
                (key.clone(), value)
            })
            .collect();

        Ok(Self {
            fields,
            ..Self::default()
        })
    }
}

fn fields_to_json(fields: &BTreeMap<String, Value>) -> Result<Json, BackendError> {
    let mut object = Map::new();
    for (key, value) in fields {
        object.insert(key.clone(), value.to_json()?);
    }
    Ok(Json::Object(object))
}

impl Value {
    /// Unwrap into plain JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Decode`] for a malformed integer.
    pub fn to_json(&self) -> Result<Json, BackendError> {
        Ok(match self {
            Self::NullValue(()) => Json::Null,
            Self::BooleanValue(b) => Json::Bool(*b),
            Self::IntegerValue(s) => {
                let n: i64 = s
                    .parse()
                    .map_err(|_| BackendError::Decode(format!("invalid integerValue: {s}")))?;
                Json::Number(n.into())
            }
            Self::DoubleValue(d) => Number::from_f64(*d).map_or(Json::Null, Json::Number),
            Self::TimestampValue(s)
            | Self::StringValue(s)
            | Self::BytesValue(s)
            | Self::ReferenceValue(s) => Json::String(s.clone()),
            Self::GeoPointValue(v) => v.clone(),
            Self::ArrayValue(array) => Json::Array(
                array
                    .values
                    .iter()
                    .map(Self::to_json)
                    .collect::<Result<_, _>>()?,
            ),
            Self::MapValue(map) => fields_to_json(&map.fields)?,
        })
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        match json {
            Json::Null => Self::NullValue(()),
            Json::Bool(b) => Self::BooleanValue(*b),
            Json::Number(n) => n.as_i64().map_or_else(
                || Self::DoubleValue(n.as_f64().unwrap_or_default()),
                |i| Self::IntegerValue(i.to_string()),
            ),
            Json::String(s) => Self::StringValue(s.clone()),
            Json::Array(items) => Self::ArrayValue(ArrayValue {
                values: items.iter().map(Self::from).collect(),
            }),
            Json::Object(object) => Self::MapValue(MapValue {
                fields: object
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_rest_document() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/categorias/canetas",
            "fields": {
                "nome": {"stringValue": "Canetas"},
                "productCount": {"integerValue": "0"},
                "popular": {"booleanValue": true},
                "vazio": {"arrayValue": {}},
                "nada": {"nullValue": null},
                "peso": {"doubleValue": 1.5}
            },
            "createTime": "2024-01-01T00:00:00Z",
            "updateTime": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(doc.id(), "canetas");
        assert_eq!(
            doc.to_json().unwrap(),
            json!({
                "nome": "Canetas",
                "productCount": 0,
                "popular": true,
                "vazio": [],
                "nada": null,
                "peso": 1.5
            })
        );
    }

    #[test]
    fn test_nested_map_and_array() {
        let value: Value = serde_json::from_value(json!({
            "arrayValue": {"values": [
                {"mapValue": {"fields": {"cor": {"stringValue": "Azul"}}}},
                {"stringValue": "Preto"}
            ]}
        }))
        .unwrap();
        assert_eq!(value.to_json().unwrap(), json!([{"cor": "Azul"}, "Preto"]));
    }

    #[test]
    fn test_invalid_integer_is_decode_error() {
        let value = Value::IntegerValue("abc".to_string());
        assert!(matches!(value.to_json(), Err(BackendError::Decode(_))));
    }

    #[test]
    fn test_encode_marks_timestamps_and_skips_nulls() {
        let doc = Document::from_json(
            &json!({
                "nome": "Caneta",
                "createdAt": "2024-05-01T12:00:00Z",
                "productCount": 0,
                "thumb_url": null,
                "categorias": ["Canetas"]
            }),
            &["createdAt"],
        )
        .unwrap();

        let body = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            body,
            json!({
                "fields": {
                    "categorias": {"arrayValue": {"values": [{"stringValue": "Canetas"}]}},
                    "createdAt": {"timestampValue": "2024-05-01T12:00:00Z"},
                    "nome": {"stringValue": "Caneta"},
                    "productCount": {"integerValue": "0"}
                }
            })
        );
    }

    #[test]
    fn test_encode_rejects_non_object() {
        assert!(Document::from_json(&json!([1, 2]), &[]).is_err());
    }
}
