//! In-memory store adapter

use super::{apply_projection, matches_filter, AuthzStore};
use crate::error::Result;
use crate::types::{Document, Namespace};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Store keeping every namespace as a vector of documents
///
/// Insertion order is preserved, so `find_one` returns the earliest match.
#[derive(Debug, Default)]
pub struct InMemoryAuthzStore {
    collections: RwLock<HashMap<Namespace, Vec<Document>>>,
}

impl InMemoryAuthzStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document
    pub fn insert(&self, ns: &Namespace, doc: Document) {
        self.collections.write().entry(ns.clone()).or_default().push(doc);
    }

    /// Replace the first document matching `filter`
    ///
    /// Returns whether a document was replaced.
    pub fn replace_one(&self, ns: &Namespace, filter: &Document, doc: Document) -> bool {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(ns) else {
            return false;
        };
        match docs.iter_mut().find(|existing| matches_filter(existing, filter)) {
            Some(existing) => {
                *existing = doc;
                true
            }
            None => false,
        }
    }

    /// Remove every document matching `filter`, returning how many were removed
    pub fn remove(&self, ns: &Namespace, filter: &Document) -> usize {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(ns) else {
            return 0;
        };
        let before = docs.len();
        docs.retain(|doc| !matches_filter(doc, filter));
        before - docs.len()
    }

    /// Number of documents in `ns`
    pub fn count(&self, ns: &Namespace) -> usize {
        self.collections.read().get(ns).map_or(0, Vec::len)
    }
}

impl AuthzStore for InMemoryAuthzStore {
    fn find_one(&self, ns: &Namespace, filter: &Document) -> Result<Option<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(ns)
            .and_then(|docs| docs.iter().find(|doc| matches_filter(doc, filter)))
            .cloned())
    }

    fn query(
        &self,
        ns: &Namespace,
        filter: &Document,
        projection: Option<&Document>,
        each: &mut dyn FnMut(&Document) -> Result<()>,
    ) -> Result<()> {
        // Copy matches out so the callback may read the store again.
        let matches: Vec<Document> = {
            let collections = self.collections.read();
            collections
                .get(ns)
                .map(|docs| {
                    docs.iter()
                        .filter(|doc| matches_filter(doc, filter))
                        .map(|doc| match projection {
                            Some(projection) => apply_projection(doc, projection),
                            None => doc.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        for doc in &matches {
            each(doc)?;
        }
        Ok(())
    }
}
