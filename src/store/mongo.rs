use anyhow::anyhow;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Result as MongoResult, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT};
use mongodb::options::{
    Acknowledgment, ReadConcern, ReplaceOptions, TransactionOptions, UpdateOptions, WriteConcern,
};
use mongodb::{Client, ClientSession, Collection, Database};
use tracing::Instrument;

use super::collections::{FAVORITES, REVIEWS, SCORES};
use super::{DocRef, DocumentStore, Filter, SetMode, ID_FIELD};
use crate::repositories::{RepositoryError, Result};
use crate::utils::LetChain;

/// fields the repositories query by equality; indexed on startup.
const QUERIED_FIELDS: &[(&str, &str)] = &[
    (REVIEWS, "user"),
    (REVIEWS, "movie"),
    (SCORES, "user"),
    (SCORES, "movie"),
    (FAVORITES, "user"),
];

pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn new_with(client: Client, db: Database) -> ::anyhow::Result<Self> {
        for (coll, field) in QUERIED_FIELDS {
            initialize_coll(coll, field, &db).await?;
        }

        Ok(Self { client, db })
    }

    fn coll(&self, name: &str) -> Collection<Document> { self.db.collection(name) }
}

fn convert_repo_err<T, E>(result: ::core::result::Result<T, E>) -> Result<T>
where E: Sync + Send + ::std::error::Error + 'static {
    result.map_err(|e| RepositoryError::Internal(anyhow!(e)))
}

fn filters_to_doc(filters: &[Filter]) -> Document {
    let mut query = doc! {};

    for f in filters {
        match f {
            Filter::Eq(field, value) =>
                query.insert(field.as_str(), value.clone()).let_(::core::mem::drop),
            Filter::ArrayContains(field, value) => query
                .insert(field.as_str(), doc! { "$in": [value.clone()] })
                .let_(::core::mem::drop),
        }
    }

    query
}

async fn initialize_coll(coll_name: &str, field: &str, db: &Database) -> MongoResult<()> {
    db.run_command(
        doc! {
            "createIndexes": coll_name,
            "indexes": [{
                "name": format!("by_{}", field),
                "key": { field: 1 },
            }],
        },
        None,
    )
    .instrument(tracing::trace_span!("run_command"))
    .await?;

    Ok(())
}

async fn make_session(c: &Client) -> MongoResult<ClientSession> {
    let mut s = c
        .start_session(None)
        .instrument(tracing::trace_span!("start_session"))
        .await?;

    let ta_opt = TransactionOptions::builder()
        .read_concern(ReadConcern::snapshot())
        .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
        .build();
    s.start_transaction(ta_opt)
        .instrument(tracing::trace_span!("start_transaction"))
        .await?;

    Ok(s)
}

async fn process_transaction(s: &mut ClientSession) -> MongoResult<()> {
    loop {
        let r = s
            .commit_transaction()
            .instrument(tracing::trace_span!("commit_transaction"))
            .await;
        if let Err(ref e) = r {
            if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) {
                continue;
            }
        }

        break r;
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.coll(collection)
            .find_one(doc! { ID_FIELD: id }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .let_(convert_repo_err)
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        self.coll(collection)
            .find(filters_to_doc(filters), None)
            .instrument(tracing::trace_span!("find"))
            .await
            .let_(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .let_(convert_repo_err)
    }

    async fn add(&self, collection: &str, mut fields: Document) -> Result<String> {
        let id = ::uuid::Uuid::new_v4().simple().to_string();
        fields.insert(ID_FIELD, id.clone());

        self.coll(collection)
            .insert_one(fields, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(convert_repo_err)?;

        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        mut fields: Document,
        mode: SetMode,
    ) -> Result<()> {
        fields.remove(ID_FIELD);
        let coll = self.coll(collection);

        match mode {
            SetMode::Overwrite => coll
                .replace_one(
                    doc! { ID_FIELD: id },
                    fields,
                    ReplaceOptions::builder().upsert(true).build(),
                )
                .instrument(tracing::trace_span!("replace_one"))
                .await
                .let_(convert_repo_err)?
                .let_(::core::mem::drop),
            SetMode::Merge => coll
                .update_one(
                    doc! { ID_FIELD: id },
                    doc! { "$set": fields },
                    UpdateOptions::builder().upsert(true).build(),
                )
                .instrument(tracing::trace_span!("update_one"))
                .await
                .let_(convert_repo_err)?
                .let_(::core::mem::drop),
        }

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, mut fields: Document) -> Result<()> {
        fields.remove(ID_FIELD);

        let res = self
            .coll(collection)
            .update_one(doc! { ID_FIELD: id }, doc! { "$set": fields }, None)
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        match res.matched_count {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.coll(collection)
            .delete_one(doc! { ID_FIELD: id }, None)
            .instrument(tracing::trace_span!("delete_one"))
            .await
            .let_(convert_repo_err)?;

        Ok(())
    }

    async fn delete_batch(&self, refs: Vec<DocRef>) -> Result<()> {
        async fn transaction(this: &MongoStore, refs: &[DocRef]) -> MongoResult<()> {
            let mut session = make_session(&this.client).await?;

            for DocRef { collection, id } in refs {
                this.coll(collection)
                    .delete_one_with_session(
                        doc! { ID_FIELD: Bson::String(id.clone()) },
                        None,
                        &mut session,
                    )
                    .instrument(tracing::trace_span!("delete_one_with_session"))
                    .await?;
            }

            process_transaction(&mut session).await
        }

        let res = loop {
            let r = transaction(self, &refs).await;
            if let Err(ref e) = r {
                if e.contains_label(TRANSIENT_TRANSACTION_ERROR) {
                    tracing::debug!("transient transaction error, retrying: {}", e);
                    continue;
                }
            }

            break r;
        };

        res.let_(convert_repo_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_become_one_query_document() {
        let q = filters_to_doc(&[
            Filter::array_contains("genres", "5"),
            Filter::eq("year", 2024),
        ]);

        assert_eq!(q, doc! { "genres": { "$in": ["5"] }, "year": 2024 });
    }

    #[test]
    fn no_filters_match_everything() {
        assert_eq!(filters_to_doc(&[]), doc! {});
    }
}
