use mongodb::bson::doc;

use super::decode::{decode_all, ScoreModel};
use super::{require_user, Result, SharedAuth, SharedStore};
use crate::entities::{MovieId, Score};
use crate::store::collections::SCORES;
use crate::store::{doc_id, Filter};
use crate::utils::{mean, AlsoChain, LetChain};

pub struct ScoreRepository {
    store: SharedStore,
    auth: SharedAuth,
}

impl ScoreRepository {
    pub fn new(store: SharedStore, auth: SharedAuth) -> Self { Self { store, auth } }

    /// every rating of `movie`. records without a score are left out.
    #[tracing::instrument(skip(self))]
    pub async fn scores(&self, movie: &MovieId) -> Result<Vec<Score>> {
        self.store
            .query(SCORES, &[Filter::eq("movie", movie.as_str())])
            .await?
            .let_(|docs| decode_all::<ScoreModel>(SCORES, docs))
            .into_iter()
            .filter_map(|m| {
                m.score.map(|score| Score {
                    user: m.user.into(),
                    movie: m.movie.into(),
                    score,
                })
            })
            .collect::<Vec<_>>()
            .let_(Ok)
    }

    /// 0 when nobody rated the movie.
    #[tracing::instrument(skip(self))]
    pub async fn average_rating(&self, movie: &MovieId) -> Result<f64> {
        self.scores(movie)
            .await?
            .iter()
            .map(|s| s.score)
            .collect::<Vec<_>>()
            .let_(|v| mean(&v))
            .also_(|avg| tracing::trace!("output - {}", avg))
            .let_(Ok)
    }

    /// records the signed-in user's rating, then returns the new average.
    ///
    /// when the user already has records for the movie every one of them is
    /// overwritten; duplicates are left in place.
    #[tracing::instrument(skip(self))]
    pub async fn rate(&self, movie: &MovieId, score: f64) -> Result<f64> {
        let user = require_user(&self.auth).await?;

        let existing = self
            .store
            .query(SCORES, &[
                Filter::eq("user", user.as_str()),
                Filter::eq("movie", movie.as_str()),
            ])
            .await?;

        if existing.is_empty() {
            self.store
                .add(SCORES, doc! {
                    "user": user.as_str(),
                    "movie": movie.as_str(),
                    "score": score,
                })
                .await?;
        } else {
            for id in existing.iter().filter_map(doc_id) {
                self.store
                    .update(SCORES, id, doc! { "score": score })
                    .await?;
            }
        }

        self.average_rating(movie).await
    }
}
