use alloc::sync::Arc;
use std::collections::HashMap;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use super::{unless_disposed, Observable};
use crate::constructors::Services;
use crate::entities::{MovieDetail, MovieId, Review, UserCard, UserId};
use crate::repositories::{
    FavoriteRepository, MovieRepository, ProfileRepository, RepositoryError, ReviewRepository,
    ScoreRepository,
};

pub struct MovieDetailScreen {
    id: MovieId,
    movies: Arc<MovieRepository>,
    scores: Arc<ScoreRepository>,
    reviews_repo: Arc<ReviewRepository>,
    favorites: Arc<FavoriteRepository>,
    profiles: Arc<ProfileRepository>,
    cancel: CancellationToken,

    pub movie: Observable<Option<MovieDetail>>,
    pub is_loading: Observable<bool>,
    pub is_favorite: Observable<bool>,
    pub average_rating: Observable<f64>,
    pub reviews: Observable<Vec<Review>>,
    pub show_review_input: Observable<bool>,
    pub review_text: Observable<String>,
    pub user_cards: Observable<HashMap<UserId, UserCard>>,
}

impl MovieDetailScreen {
    pub fn new(id: MovieId, services: &Services) -> Self {
        Self {
            id,
            movies: services.movies.clone(),
            scores: services.scores.clone(),
            reviews_repo: services.reviews.clone(),
            favorites: services.favorites.clone(),
            profiles: services.profiles.clone(),
            cancel: CancellationToken::new(),
            movie: Observable::default(),
            is_loading: Observable::new(false),
            is_favorite: Observable::new(false),
            average_rating: Observable::new(0.0),
            reviews: Observable::default(),
            show_review_input: Observable::new(false),
            review_text: Observable::default(),
            user_cards: Observable::default(),
        }
    }

    pub fn movie_id(&self) -> &MovieId { &self.id }

    /// details, ratings, reviews and the favorite flag, side by side.
    ///
    /// each part that arrives is applied; the first failure is returned
    /// after all of them settled.
    pub async fn load(&self) -> Result<()> {
        self.is_loading.set(true);

        let all = async {
            tokio::join!(
                self.movies.get_movie_detail(&self.id, &self.cancel),
                self.scores.average_rating(&self.id),
                self.reviews_repo.reviews_for_movie(&self.id),
                self.favorite_flag(),
            )
        };
        let res = unless_disposed(&self.cancel, all).await;

        self.is_loading.set(false);

        let (detail, avg, reviews, fav) = match res {
            Some(r) => r,
            None => return Ok(()),
        };

        let mut first_err = None;
        match detail {
            Ok(Some(d)) => self.movie.set(Some(d)),
            Ok(None) => {
                first_err.get_or_insert(anyhow::anyhow!("cannot find movie {}.", self.id));
            },
            Err(e) => {
                first_err.get_or_insert(e.into());
            },
        }
        match avg {
            Ok(a) => self.average_rating.set(a),
            Err(e) => {
                first_err.get_or_insert(e.into());
            },
        }
        match reviews {
            Ok(r) => self.reviews.set(r.as_ref().clone()),
            Err(e) => {
                first_err.get_or_insert(e.into());
            },
        }
        match fav {
            Ok(f) => self.is_favorite.set(f),
            Err(e) => {
                first_err.get_or_insert(e.into());
            },
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// signed out counts as not a favorite.
    async fn favorite_flag(&self) -> crate::repositories::Result<bool> {
        match self.favorites.is_favorite(&self.id).await {
            Err(RepositoryError::Unauthenticated) => Ok(false),
            r => r,
        }
    }

    /// flips the flag first, then writes; a failed write flips it back.
    pub async fn toggle_favorite(&self) -> Result<()> {
        let now = !self.is_favorite.get();
        self.is_favorite.set(now);

        let res = match now {
            true => self.favorites.add_favorite(&self.id).await,
            false => self.favorites.remove_favorite(&self.id).await,
        };

        if let Err(e) = res {
            self.is_favorite.set(!now);
            return Err(e.into());
        }

        Ok(())
    }

    pub async fn update_rating(&self, score: f64) -> Result<()> {
        if !(0.0..=5.0).contains(&score) {
            bail!("rating must be between 0 and 5.");
        }

        if let Some(res) = unless_disposed(&self.cancel, self.scores.rate(&self.id, score)).await {
            self.average_rating.set(res?);
        }

        Ok(())
    }

    pub fn set_review_text(&self, text: impl Into<String>) { self.review_text.set(text.into()) }

    pub fn set_show_review_input(&self, show: bool) { self.show_review_input.set(show) }

    /// posts the current text. on success the review is appended and the
    /// input is cleared and hidden.
    pub async fn submit_review(&self) -> Result<()> {
        let text = self.review_text.get();
        if text.trim().is_empty() {
            bail!("review is empty.");
        }

        let res = unless_disposed(&self.cancel, self.reviews_repo.add_review(&self.id, &text)).await;

        if let Some(res) = res {
            let review = res?;
            self.reviews.update(|r| r.push(review));
            self.review_text.set(String::new());
            self.show_review_input.set(false);
        }

        Ok(())
    }

    /// fetched once per user.
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

    pub fn dispose(&self) { self.cancel.cancel() }
}
