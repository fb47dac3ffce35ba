use alloc::sync::Arc;
use std::collections::HashMap;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::{unless_disposed, Observable};
use crate::constructors::Services;
use crate::entities::{Review, UserCard, UserId};
use crate::repositories::{ProfileRepository, ReviewRepository};

/// the signed-in user's own reviews.
pub struct ReviewsScreen {
    repo: Arc<ReviewRepository>,
    profiles: Arc<ProfileRepository>,
    cancel: CancellationToken,

    pub reviews: Observable<Vec<Review>>,
    pub user_cards: Observable<HashMap<UserId, UserCard>>,
}

impl ReviewsScreen {
    pub fn new(services: &Services) -> Self {
        Self {
            repo: services.reviews.clone(),
            profiles: services.profiles.clone(),
            cancel: CancellationToken::new(),
            reviews: Observable::default(),
            user_cards: Observable::default(),
        }
    }

    /// signed out leaves the list as it is.
    pub async fn load_reviews(&self) -> Result<()> {
        let user = match self.profiles.current_user().await {
            Some(u) => u,
            None => return Ok(()),
        };

        if let Some(res) = unless_disposed(&self.cancel, self.repo.reviews_for_user(&user)).await {
            self.reviews.set(res?.as_ref().clone());
        }

        Ok(())
    }

    pub async fn load_user_card(&self, user: &UserId) -> Result<()> {
        if self.user_cards.with(|c| c.contains_key(user)) {
            return Ok(());
        }

        if let Some(res) = unless_disposed(&self.cancel, self.profiles.load_user_card(user)).await {
            let card = res?;
            self.user_cards.update(|c| {
                c.insert(user.clone(), card);
            });
        }

        Ok(())
    }

    /// the local copy changes only once the store accepted the edit.
    pub async fn update_review(&self, review: Review) -> Result<()> {
        self.repo.update_review(&review).await?;

        self.reviews.update(|list| {
            if let Some(r) = list.iter_mut().find(|r| r.id == review.id) {
                *r = review;
            }
        });

        Ok(())
    }

    pub async fn delete_review(&self, review: &Review) -> Result<()> {
        self.repo.delete_review(review).await?;

        self.reviews.update(|list| list.retain(|r| r.id != review.id));

        Ok(())
    }

    pub fn dispose(&self) { self.cancel.cancel() }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;
    use crate::auth::InMemoryAuth;
    use crate::constructors::in_memory;
    use crate::image_host::NoImageHost;
    use crate::repositories::RepositoryError;
    use crate::store::collections::{REVIEWS, USERS};
    use crate::store::mock::InMemoryStore;

    async fn screen(auth: InMemoryAuth) -> (Arc<InMemoryStore>, ReviewsScreen) {
        let (store, services) = in_memory(Arc::new(auth), Arc::new(NoImageHost));

        store
            .seed(REVIEWS, "r1", doc! { "user": "u1", "movie": "16", "text": "a" })
            .await;
        store
            .seed(REVIEWS, "r2", doc! { "user": "u1", "movie": "17", "text": "b" })
            .await;
        store
            .seed(REVIEWS, "r3", doc! { "user": "u2", "movie": "16", "text": "c" })
            .await;
        store.seed(USERS, "u2", doc! { "name": "Dee" }).await;

        (store.clone(), ReviewsScreen::new(&services))
    }

    #[tokio::test]
    async fn own_reviews_only() {
        let (_, s) = screen(InMemoryAuth::signed_in("u1")).await;

        s.load_reviews().await.unwrap();

        assert_eq!(s.reviews.get().len(), 2);
    }

    #[tokio::test]
    async fn signed_out_loads_nothing() {
        let (store, s) = screen(InMemoryAuth::new()).await;

        s.load_reviews().await.unwrap();

        assert!(s.reviews.get().is_empty());
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn edits_apply_locally_after_the_store() {
        let (store, s) = screen(InMemoryAuth::signed_in("u1")).await;
        s.load_reviews().await.unwrap();

        let mut first = s.reviews.get()[0].clone();
        first.text = "edited".to_string();
        s.update_review(first.clone()).await.unwrap();
        assert_eq!(s.reviews.get()[0].text, "edited");

        s.delete_review(&first).await.unwrap();
        assert_eq!(s.reviews.get().len(), 1);
        assert_eq!(store.count(REVIEWS).await, 2);
    }

    #[tokio::test]
    async fn refused_edits_change_nothing() {
        let (_, s) = screen(InMemoryAuth::signed_in("u1")).await;
        s.load_reviews().await.unwrap();

        let theirs = Review {
            id: "r3".into(),
            movie: "16".into(),
            user: "u2".into(),
            text: "mine now".into(),
        };
        s.reviews.update(|l| l.push(theirs.clone()));

        let err = s.delete_review(&theirs).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::Forbidden)
        ));
        assert_eq!(s.reviews.get().len(), 3);
    }

    #[tokio::test]
    async fn user_card_is_cached() {
        let (store, s) = screen(InMemoryAuth::new()).await;

        s.load_user_card(&"u2".into()).await.unwrap();
        s.load_user_card(&"u2".into()).await.unwrap();

        assert_eq!(store.reads(), 2);
        assert_eq!(s.user_cards.get()[&UserId::from("u2")].name, "Dee");
    }
}
