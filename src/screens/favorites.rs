use alloc::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::{unless_disposed, Observable};
use crate::entities::MovieSummary;
use crate::repositories::FavoriteRepository;

pub struct FavoritesScreen {
    repo: Arc<FavoriteRepository>,
    cancel: CancellationToken,

    pub favorite_movies: Observable<Vec<MovieSummary>>,
    pub is_loading: Observable<bool>,
}

impl FavoritesScreen {
    pub fn new(repo: Arc<FavoriteRepository>) -> Self {
        Self {
            repo,
            cancel: CancellationToken::new(),
            favorite_movies: Observable::default(),
            is_loading: Observable::new(false),
        }
    }

    /// signed out shows an empty list. a failed load empties it too.
    pub async fn load(&self) -> Result<()> {
        self.is_loading.set(true);
        let res = unless_disposed(&self.cancel, self.repo.favorite_movies(&self.cancel)).await;
        self.is_loading.set(false);

        match res {
            None => Ok(()),
            Some(Ok(movies)) => {
                self.favorite_movies.set(movies);
                Ok(())
            },
            Some(Err(e)) => {
                self.favorite_movies.set(vec![]);
                Err(e.into())
            },
        }
    }

    pub fn dispose(&self) { self.cancel.cancel() }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;
    use crate::auth::InMemoryAuth;
    use crate::store::collections::{FAVORITES, MOVIES};
    use crate::store::mock::InMemoryStore;

    async fn screen(auth: InMemoryAuth) -> FavoritesScreen {
        let store = Arc::new(InMemoryStore::new());

        store.seed(MOVIES, "16", doc! { "title": "A" }).await;
        store.seed(MOVIES, "17", doc! { "title": "B" }).await;
        store
            .seed(FAVORITES, "f1", doc! { "user": "u1", "movie": "17" })
            .await;
        store
            .seed(FAVORITES, "f2", doc! { "user": "u1", "movie": "16" })
            .await;
        store.fail_on("16").await;

        FavoritesScreen::new(Arc::new(FavoriteRepository::new(store, Arc::new(auth))))
    }

    #[tokio::test]
    async fn unreadable_movies_are_skipped() {
        let s = screen(InMemoryAuth::signed_in("u1")).await;

        s.load().await.unwrap();

        let movies = s.favorite_movies.get();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "B");
        assert!(!s.is_loading.get());
    }

    #[tokio::test]
    async fn signed_out_is_empty() {
        let s = screen(InMemoryAuth::new()).await;

        s.load().await.unwrap();

        assert!(s.favorite_movies.get().is_empty());
    }
}
