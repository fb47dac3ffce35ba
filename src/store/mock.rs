use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use tokio::sync::Mutex;

use super::{doc_id, DocRef, DocumentStore, Filter, SetMode, ID_FIELD};
use crate::repositories::{RepositoryError, Result};

/// process-local document store.
///
/// counts reads so callers can observe memoization, and can be told to fail
/// lookups of given ids.
#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    failing: Mutex<HashSet<String>>,
    reads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }

    /// stores `fields` as `collection/id`, replacing what was there.
    pub async fn seed(&self, collection: &str, id: &str, mut fields: Document) {
        fields.insert(ID_FIELD, id);

        let mut guard = self.collections.lock().await;
        let docs = guard.entry(collection.to_string()).or_default();
        docs.retain(|d| doc_id(d) != Some(id));
        docs.push(fields);
    }

    /// `get`s of this id fail from now on.
    pub async fn fail_on(&self, id: &str) { self.failing.lock().await.insert(id.to_string()); }

    pub fn reads(&self) -> usize { self.reads.load(Ordering::SeqCst) }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[inline]
fn find_mut<'a>(docs: &'a mut [Document], id: &str) -> Option<&'a mut Document> {
    let mut res = docs
        .iter_mut()
        .filter(|d| doc_id(d) == Some(id))
        .collect::<Vec<_>>();

    tracing::trace!("found - {}", res.len());

    match res.len() {
        0 => None,
        _ => Some(res.remove(0)),
    }
}

fn merge_into(doc: &mut Document, fields: Document) {
    for (k, v) in fields {
        doc.insert(k, v);
    }
}

fn as_number(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// like `==`, but int32 / int64 / double compare by value.
fn lenient_eq(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(field, value) => doc.get(field).map(|v| lenient_eq(v, value)).unwrap_or(false),
        Filter::ArrayContains(field, value) => doc
            .get_array(field)
            .map(|arr| arr.iter().any(|v| lenient_eq(v, value)))
            .unwrap_or(false),
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().await.contains(id) {
            return Err(RepositoryError::Internal(anyhow!(
                "lookup of {}/{} failed",
                collection,
                id
            )));
        }

        let guard = self.collections.lock().await;
        let res = guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| doc_id(d) == Some(id)))
            .cloned();

        Ok(res)
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let guard = self.collections.lock().await;
        let res = guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filters.iter().all(|f| matches(d, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(res)
    }

    async fn add(&self, collection: &str, mut fields: Document) -> Result<String> {
        let id = ::uuid::Uuid::new_v4().simple().to_string();
        fields.insert(ID_FIELD, id.clone());

        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(fields);

        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        mode: SetMode,
    ) -> Result<()> {
        let mut guard = self.collections.lock().await;
        let docs = guard.entry(collection.to_string()).or_default();

        match (find_mut(docs, id), mode) {
            (Some(doc), SetMode::Merge) => merge_into(doc, fields),
            (Some(doc), SetMode::Overwrite) => {
                *doc = fields;
                doc.insert(ID_FIELD, id);
            },
            (None, _) => {
                let mut doc = fields;
                doc.insert(ID_FIELD, id);
                docs.push(doc);
            },
        }

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let mut guard = self.collections.lock().await;
        let doc = guard
            .get_mut(collection)
            .and_then(|docs| find_mut(docs, id))
            .ok_or(RepositoryError::NotFound)?;

        merge_into(doc, fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if let Some(docs) = self.collections.lock().await.get_mut(collection) {
            docs.retain(|d| doc_id(d) != Some(id));
        }

        Ok(())
    }

    async fn delete_batch(&self, refs: Vec<DocRef>) -> Result<()> {
        // one lock for the whole batch keeps it atomic
        let mut guard = self.collections.lock().await;

        for DocRef { collection, id } in refs {
            if let Some(docs) = guard.get_mut(&collection) {
                docs.retain(|d| doc_id(d) != Some(id.as_str()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[tokio::test]
    async fn query_matches_equality_and_containment() {
        let store = InMemoryStore::new();
        store
            .seed("movies", "1", doc! { "year": 2024_i64, "genres": ["5", "7"] })
            .await;
        store
            .seed("movies", "2", doc! { "year": 2019, "genres": ["7"] })
            .await;

        let by_year = store
            .query("movies", &[Filter::eq("year", 2024)])
            .await
            .unwrap();
        assert_eq!(by_year.len(), 1);
        assert_eq!(doc_id(&by_year[0]), Some("1"));

        let by_genre = store
            .query("movies", &[Filter::array_contains("genres", "7")])
            .await
            .unwrap();
        assert_eq!(by_genre.len(), 2);

        let both = store
            .query("movies", &[
                Filter::array_contains("genres", "7"),
                Filter::eq("year", 2019),
            ])
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(doc_id(&both[0]), Some("2"));

        assert_eq!(store.reads(), 3);
    }

    #[tokio::test]
    async fn merge_keeps_other_fields() {
        let store = InMemoryStore::new();
        store
            .seed("userInfo", "u", doc! { "about": "hi", "phone": "1" })
            .await;

        store
            .set("userInfo", "u", doc! { "phone": "2" }, SetMode::Merge)
            .await
            .unwrap();
        let doc = store.get("userInfo", "u").await.unwrap().unwrap();
        assert_eq!(doc.get_str("about").unwrap(), "hi");
        assert_eq!(doc.get_str("phone").unwrap(), "2");

        store
            .set("userInfo", "u", doc! { "phone": "3" }, SetMode::Overwrite)
            .await
            .unwrap();
        let doc = store.get("userInfo", "u").await.unwrap().unwrap();
        assert!(doc.get_str("about").is_err());
        assert_eq!(doc_id(&doc), Some("u"));
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = InMemoryStore::new();

        let res = store.update("reviews", "nope", doc! { "text": "x" }).await;
        assert!(matches!(res, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn failing_ids_fail_lookups() {
        let store = InMemoryStore::new();
        store.seed("actors", "1", doc! { "name": "a" }).await;
        store.fail_on("1").await;

        assert!(store.get("actors", "1").await.is_err());
    }
}
