//! Store adapter and concurrency guard
//!
//! The authorization state never owns documents. It reads user, role and
//! schema-version documents through [`AuthzStore`] and brackets every read
//! with a [`RolesLocks`] snapshot guard.

pub mod locks;
pub mod memory;

pub use locks::{RolesLocks, RolesReadGuard, RolesWriteGuard};
pub use memory::InMemoryAuthzStore;

use crate::error::Result;
use crate::types::{Document, Namespace};
use serde_json::Value;

/// Document store consumed by the authorization state
pub trait AuthzStore: Send + Sync {
    /// First document in `ns` matching `filter`, if any
    fn find_one(&self, ns: &Namespace, filter: &Document) -> Result<Option<Document>>;

    /// Invoke `each` for every document in `ns` matching `filter`
    ///
    /// An error returned by `each` stops the scan and is propagated.
    fn query(
        &self,
        ns: &Namespace,
        filter: &Document,
        projection: Option<&Document>,
        each: &mut dyn FnMut(&Document) -> Result<()>,
    ) -> Result<()>;

    /// Whether any document in `ns` matches `filter`
    fn has_one(&self, ns: &Namespace, filter: &Document) -> Result<bool> {
        Ok(self.find_one(ns, filter)?.is_some())
    }
}

/// Top-level equality match; an empty filter matches everything
pub fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| doc.get(key) == Some(expected))
}

/// Inclusion projection; `_id` is kept unless excluded explicitly
pub fn apply_projection(doc: &Document, projection: &Document) -> Document {
    if projection.is_empty() {
        return doc.clone();
    }

    let include_id = projection.get("_id").map_or(true, is_truthy);
    doc.iter()
        .filter(|(key, _)| {
            if key.as_str() == "_id" {
                include_id
            } else {
                projection.get(key.as_str()).map_or(false, is_truthy)
            }
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::Null => false,
        _ => true,
    }
}
