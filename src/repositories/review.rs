use alloc::sync::Arc;

use mongodb::bson::doc;

use super::decode::{decode_all, ReviewModel};
use super::{require_user, RepositoryError, Result, SharedAuth, SharedStore};
use crate::cache::{CacheKey, QueryCache};
use crate::entities::{MovieId, Review, UserId};
use crate::store::collections::REVIEWS;
use crate::store::Filter;
use crate::utils::{AlsoChain, LetChain};

pub struct ReviewRepository {
    store: SharedStore,
    auth: SharedAuth,
    reviews: QueryCache<Vec<Review>>,
}

fn user_key(user: &UserId) -> CacheKey { CacheKey::new(REVIEWS).with("user", Some(user)) }

fn movie_key(movie: &MovieId) -> CacheKey { CacheKey::new(REVIEWS).with("movie", Some(movie)) }

impl ReviewRepository {
    pub fn new(store: SharedStore, auth: SharedAuth) -> Self {
        Self {
            store,
            auth,
            reviews: QueryCache::new(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn reviews_for_user(&self, user: &UserId) -> Result<Arc<Vec<Review>>> {
        self.reviews
            .get_or_fetch(&user_key(user), || {
                self.fetch(Filter::eq("user", user.as_str()))
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reviews_for_movie(&self, movie: &MovieId) -> Result<Arc<Vec<Review>>> {
        self.reviews
            .get_or_fetch(&movie_key(movie), || {
                self.fetch(Filter::eq("movie", movie.as_str()))
            })
            .await
    }

    async fn fetch(&self, filter: Filter) -> Result<Vec<Review>> {
        self.store
            .query(REVIEWS, &[filter])
            .await?
            .let_(|docs| decode_all::<ReviewModel>(REVIEWS, docs))
            .into_iter()
            .map(Review::from)
            .collect::<Vec<_>>()
            .also_(|v| tracing::trace!("output - {} reviews", v.len()))
            .let_(Ok)
    }

    /// posts `text` under the signed-in user.
    #[tracing::instrument(skip(self, text))]
    pub async fn add_review(&self, movie: &MovieId, text: &str) -> Result<Review> {
        let user = require_user(&self.auth).await?;

        let id = self
            .store
            .add(REVIEWS, doc! {
                "movie": movie.as_str(),
                "user": user.as_str(),
                "text": text,
            })
            .await?;

        self.forget(&user, movie).await;

        Review {
            id: id.into(),
            movie: movie.clone(),
            user,
            text: text.to_string(),
        }
        .also_(|r| tracing::trace!("output - {:?}", r))
        .let_(Ok)
    }

    /// rewrites the text of `review`, which must belong to the signed-in user.
    #[tracing::instrument(skip(self))]
    pub async fn update_review(&self, review: &Review) -> Result<()> {
        self.check_owner(review).await?;

        self.store
            .update(REVIEWS, review.id.as_str(), doc! { "text": review.text.as_str() })
            .await?;

        self.forget(&review.user, &review.movie).await;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_review(&self, review: &Review) -> Result<()> {
        self.check_owner(review).await?;

        self.store.delete(REVIEWS, review.id.as_str()).await?;

        self.forget(&review.user, &review.movie).await;
        Ok(())
    }

    /// counted from the store, not the cache.
    #[tracing::instrument(skip(self))]
    pub async fn review_count(&self, user: &UserId) -> Result<u32> {
        let docs = self
            .store
            .query(REVIEWS, &[Filter::eq("user", user.as_str())])
            .await?;

        Ok(docs.len() as u32)
    }

    /// forgets every memoized list; the next reads go to the store.
    pub async fn refresh(&self) { self.reviews.invalidate_scope(REVIEWS).await }

    async fn check_owner(&self, review: &Review) -> Result<()> {
        match self.auth.current_user().await {
            None => Err(RepositoryError::Unauthenticated),
            Some(me) if me != review.user => Err(RepositoryError::Forbidden),
            Some(_) => Ok(()),
        }
    }

    async fn forget(&self, user: &UserId, movie: &MovieId) {
        self.reviews.invalidate(&user_key(user)).await;
        self.reviews.invalidate(&movie_key(movie)).await;
    }
}
