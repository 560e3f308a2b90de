//! Conversion between client JSON and stored book documents.
//!
//! Books carry no schema. Inbound objects become ordered BSON documents and
//! stored documents are rendered back to plain JSON, with the `_id` field
//! (and any other `ObjectId`) written as its hex string.

use mongodb::bson::{Bson, Document};
use serde_json::{Map, Number, Value};
use service_core::error::AppError;

/// Name of the store-assigned identifier field.
pub const ID_FIELD: &str = "_id";

/// Build the stored form of a client payload.
///
/// `_id` is dropped: identifiers are assigned by the store and never taken
/// from a request body. Integers above `i64::MAX` have no exact BSON form
/// and are rejected rather than stored as a different number.
pub fn fields_from_json(fields: Map<String, Value>) -> Result<Document, AppError> {
    fields
        .into_iter()
        .filter(|(key, _)| key != ID_FIELD)
        .map(|(key, value)| json_to_bson(value).map(|value| (key, value)))
        .collect()
}

/// Render a stored document as JSON.
pub fn render_book(book: Document) -> Value {
    Value::Object(document_to_map(book))
}

fn document_to_map(doc: Document) -> Map<String, Value> {
    doc.into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect()
}

fn json_to_bson(value: Value) -> Result<Bson, AppError> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => number_to_bson(&n)?,
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(json_to_bson)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Object(map) => Bson::Document(
            map.into_iter()
                .map(|(key, value)| json_to_bson(value).map(|value| (key, value)))
                .collect::<Result<Document, AppError>>()?,
        ),
    })
}

fn number_to_bson(n: &Number) -> Result<Bson, AppError> {
    if let Some(i) = n.as_i64() {
        return Ok(match i32::try_from(i) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(i),
        });
    }

    if let Some(big) = n.as_u64() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Integer out of range: {}",
            big
        )));
    }

    Ok(Bson::Double(n.as_f64().unwrap_or(f64::NAN)))
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(document_to_map(doc)),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        other => other.into_relaxed_extjson(),
    }
}
