use mongodb::bson::{Bson, Document};
use tracing::debug;

use crate::dao::{
    durable::Query,
    entry::{Entry, FieldValue},
};

const ID_FIELD: &str = "_id";

fn to_bson(value: &FieldValue) -> Bson {
    match value {
        FieldValue::Int(v) => Bson::Int64(*v),
        FieldValue::Float(v) => Bson::Double(*v),
        FieldValue::Str(v) => Bson::String(v.clone()),
    }
}

fn from_bson(value: &Bson) -> Option<FieldValue> {
    match value {
        Bson::Int32(v) => Some(FieldValue::Int((*v).into())),
        Bson::Int64(v) => Some(FieldValue::Int(*v)),
        Bson::Double(v) => Some(FieldValue::Float(*v)),
        Bson::String(v) => Some(FieldValue::Str(v.clone())),
        _ => None,
    }
}

/// Document persisted for one entry; MongoDB assigns `_id` on insert.
pub fn entry_document(entry: &Entry) -> Document {
    entry
        .as_map()
        .iter()
        .map(|(name, value)| (name.clone(), to_bson(value)))
        .collect()
}

/// Rebuild an entry, ignoring `_id` and values that are not scalar.
pub fn document_entry(document: &Document) -> Entry {
    document
        .iter()
        .filter(|(name, _)| name.as_str() != ID_FIELD)
        .filter_map(|(name, value)| match from_bson(value) {
            Some(value) => Some((name.clone(), value)),
            None => {
                debug!(field = %name, "skipping non-scalar field in stored entry");
                None
            }
        })
        .collect()
}

/// Filter document selecting the records of `query`.
pub fn query_filter(query: &Query) -> Document {
    let mut filter = Document::new();
    if let Query::Where { field, value } = query {
        filter.insert(field.clone(), to_bson(value));
    }
    filter
}
