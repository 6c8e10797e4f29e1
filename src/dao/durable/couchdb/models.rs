use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::entry::Entry;

/// Separates the collection from the per-entry part of a document id.
pub const SEPARATOR: &str = "::";
/// Highest key suffix, closes a prefix range.
pub const END_SUFFIX: &str = "\u{ffff}";

/// Body of an `_all_docs` response.
#[derive(Debug, Deserialize)]
pub struct AllDocsResponse<T> {
    /// Matching rows, ordered by id.
    pub rows: Vec<AllDocsRow<T>>,
}

/// One `_all_docs` row.
#[derive(Debug, Deserialize)]
pub struct AllDocsRow<T> {
    /// Document body, present with `include_docs=true`.
    pub doc: Option<T>,
}

/// One persisted entry. Ids are `{collection}::{uuid v7}` so `_all_docs`
/// returns a collection's entries contiguously and in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchEntryDocument {
    /// Document id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Revision, absent before the first write.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Leaderboard collection the entry belongs to.
    pub collection: String,
    /// Stored entry.
    pub fields: Entry,
}

impl CouchEntryDocument {
    /// New document with a fresh time-ordered id.
    pub fn new(collection: &str, fields: Entry) -> Self {
        Self {
            id: entry_doc_id(collection, Uuid::now_v7()),
            rev: None,
            collection: collection.to_owned(),
            fields,
        }
    }
}

/// Tombstone sent through `_bulk_docs` to delete a document.
#[derive(Debug, Serialize)]
pub struct DeletedDocument {
    /// Id of the document to delete.
    #[serde(rename = "_id")]
    pub id: String,
    /// Current revision.
    #[serde(rename = "_rev")]
    pub rev: String,
    /// Always `true`.
    #[serde(rename = "_deleted")]
    pub deleted: bool,
}

/// Body of a `_bulk_docs` request.
#[derive(Debug, Serialize)]
pub struct BulkDocsRequest<T> {
    /// Documents to write.
    pub docs: Vec<T>,
}

/// Per-document outcome of `_bulk_docs`.
#[derive(Debug, Deserialize)]
pub struct BulkDocsResult {
    /// Document id.
    pub id: String,
    /// Error kind when the write was rejected.
    #[serde(default)]
    pub error: Option<String>,
}

/// Document id of an entry of `collection`.
pub fn entry_doc_id(collection: &str, id: Uuid) -> String {
    format!("{collection}{SEPARATOR}{id}")
}

/// `(startkey, endkey)` covering every document of `collection`, JSON encoded.
pub fn collection_range(collection: &str) -> (String, String) {
    let prefix = format!("{collection}{SEPARATOR}");
    let end = format!("{prefix}{END_SUFFIX}");
    (json_key(&prefix), json_key(&end))
}

fn json_key(key: &str) -> String {
    serde_json::Value::String(key.to_owned()).to_string()
}
