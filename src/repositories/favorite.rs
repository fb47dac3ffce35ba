use mongodb::bson::doc;
use tokio_util::sync::CancellationToken;

use super::decode::{decode, decode_all, FavoriteModel, MovieModel};
use super::{require_user, Result, SharedAuth, SharedStore};
use crate::entities::{Favorite, MovieId, MovieSummary, UserId};
use crate::join::resolve_all;
use crate::store::collections::{FAVORITES, MOVIES};
use crate::store::{doc_id, DocRef, Filter};
use crate::utils::{AlsoChain, LetChain};

/// `favorites` records of the signed-in user. reads are not memoized.
pub struct FavoriteRepository {
    store: SharedStore,
    auth: SharedAuth,
}

impl FavoriteRepository {
    pub fn new(store: SharedStore, auth: SharedAuth) -> Self { Self { store, auth } }

    /// the signed-in user's records; nobody signed in means none.
    #[tracing::instrument(skip(self))]
    pub async fn favorites(&self) -> Result<Vec<Favorite>> {
        let user = match self.auth.current_user().await {
            Some(u) => u,
            None => return Ok(vec![]),
        };

        self.store
            .query(FAVORITES, &[Filter::eq("user", user.as_str())])
            .await?
            .let_(|docs| decode_all::<FavoriteModel>(FAVORITES, docs))
            .into_iter()
            .filter_map(FavoriteModel::into_favorite)
            .collect::<Vec<_>>()
            .also_(|v| tracing::trace!("output - {:?}", v))
            .let_(Ok)
    }

    pub async fn favorite_ids(&self) -> Result<Vec<MovieId>> {
        Ok(self.favorites().await?.into_iter().map(|f| f.movie).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn is_favorite(&self, movie: &MovieId) -> Result<bool> {
        let user = require_user(&self.auth).await?;

        Ok(!self.records(&user, movie).await?.is_empty())
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_favorite(&self, movie: &MovieId) -> Result<()> {
        let user = require_user(&self.auth).await?;

        self.store
            .add(FAVORITES, doc! {
                "user": user.as_str(),
                "movie": movie.as_str(),
            })
            .await?
            .let_(|id| tracing::trace!("output - {}", id));

        Ok(())
    }

    /// deletes every record that marks `movie`, duplicates included.
    #[tracing::instrument(skip(self))]
    pub async fn remove_favorite(&self, movie: &MovieId) -> Result<()> {
        let user = require_user(&self.auth).await?;

        let refs = self
            .records(&user, movie)
            .await?
            .into_iter()
            .map(|id| DocRef::new(FAVORITES, id))
            .collect::<Vec<_>>();

        match refs.is_empty() {
            true => Ok(()),
            false => self.store.delete_batch(refs).await,
        }
    }

    /// the marked movies themselves. ids whose movie cannot be read are left out.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn favorite_movies(&self, cancel: &CancellationToken) -> Result<Vec<MovieSummary>> {
        let ids = self.favorite_ids().await?;

        resolve_all(ids, cancel, |id| self.movie(id)).await
    }

    async fn movie(&self, id: MovieId) -> Result<Option<MovieSummary>> {
        match self.store.get(MOVIES, id.as_str()).await? {
            Some(doc) => decode::<MovieModel>(MOVIES, doc)
                .map(MovieSummary::from)
                .map(Some),
            None => Ok(None),
        }
    }

    async fn records(&self, user: &UserId, movie: &MovieId) -> Result<Vec<String>> {
        self.store
            .query(FAVORITES, &[
                Filter::eq("user", user.as_str()),
                Filter::eq("movie", movie.as_str()),
            ])
            .await?
            .iter()
            .filter_map(|d| doc_id(d).map(str::to_string))
            .collect::<Vec<_>>()
            .let_(Ok)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::*;
    use crate::auth::InMemoryAuth;
    use crate::repositories::RepositoryError;
    use crate::store::mock::InMemoryStore;

    async fn seeded() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());

        store.seed(MOVIES, "16", doc! { "title": "A" }).await;
        store.seed(MOVIES, "17", doc! { "title": "B" }).await;
        store
            .seed(FAVORITES, "f1", doc! { "user": "u1", "movie": "16" })
            .await;
        store
            .seed(FAVORITES, "f2", doc! { "user": "u1", "movie": "404" })
            .await;
        store
            .seed(FAVORITES, "f3", doc! { "user": "u2", "movie": "17" })
            .await;

        store
    }

    #[tokio::test]
    async fn nobody_signed_in_has_no_favorites() {
        let repo = FavoriteRepository::new(seeded().await, Arc::new(InMemoryAuth::new()));

        assert!(repo.favorite_ids().await.unwrap().is_empty());
        assert!(matches!(
            repo.is_favorite(&"16".into()).await,
            Err(RepositoryError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn favorite_movies_skips_unknown_ids() {
        let repo = FavoriteRepository::new(seeded().await, Arc::new(InMemoryAuth::signed_in("u1")));

        let movies = repo.favorite_movies(&CancellationToken::new()).await.unwrap();

        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "A");
    }

    #[tokio::test]
    async fn toggling_twice_leaves_nothing_behind() {
        let store = seeded().await;
        let repo = FavoriteRepository::new(store.clone(), Arc::new(InMemoryAuth::signed_in("u1")));
        let movie = MovieId::from("17");

        assert!(!repo.is_favorite(&movie).await.unwrap());

        repo.add_favorite(&movie).await.unwrap();
        assert!(repo.is_favorite(&movie).await.unwrap());

        repo.remove_favorite(&movie).await.unwrap();
        assert!(!repo.is_favorite(&movie).await.unwrap());
        assert_eq!(store.count(FAVORITES).await, 3);
    }

    #[tokio::test]
    async fn removal_clears_duplicates() {
        let store = seeded().await;
        store
            .seed(FAVORITES, "f4", doc! { "user": "u1", "movie": "16" })
            .await;
        let repo = FavoriteRepository::new(store.clone(), Arc::new(InMemoryAuth::signed_in("u1")));

        repo.remove_favorite(&"16".into()).await.unwrap();

        assert!(!repo.is_favorite(&"16".into()).await.unwrap());
        assert_eq!(store.count(FAVORITES).await, 2);
    }
}
