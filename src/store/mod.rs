//! the remote document store, seen from the client.
//!
//! documents are loosely-typed field maps; the id of a stored document is kept
//! under [`ID_FIELD`] as a string. typing happens one layer up, in
//! `repositories::decode`.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::repositories::Result;

pub mod mock;
pub mod mongo;

pub const ID_FIELD: &str = "_id";

pub mod collections {
    pub const MOVIES: &str = "movies";
    pub const GENRES: &str = "genres";
    pub const ACTORS: &str = "actors";
    pub const DIRECTORS: &str = "directors";
    pub const USERS: &str = "users";
    pub const USER_INFO: &str = "userInfo";
    pub const REVIEWS: &str = "reviews";
    pub const SCORES: &str = "scores";
    pub const FAVORITES: &str = "favorites";
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Bson),
    ArrayContains(String, Bson),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::ArrayContains(field.into(), value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    Overwrite,
    /// only the given fields are written, the others are kept.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub collection: String,
    pub id: String,
}

impl DocRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

#[async_trait]
pub trait DocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;
    /// every filter must hold.
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>>;

    /// returns the id the store generated.
    async fn add(&self, collection: &str, fields: Document) -> Result<String>;
    async fn set(&self, collection: &str, id: &str, fields: Document, mode: SetMode)
        -> Result<()>;
    /// fails with `NotFound` when there is no such document.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
    /// all or nothing.
    async fn delete_batch(&self, refs: Vec<DocRef>) -> Result<()>;
}

/// reads the string id out of a stored document.
pub fn doc_id(doc: &Document) -> Option<&str> { doc.get_str(ID_FIELD).ok() }
