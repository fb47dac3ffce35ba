use alloc::sync::Arc;
use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use super::decode::{decode, decode_all, MovieModel, NamedModel};
use super::{Result, SharedStore};
use crate::cache::{CacheKey, QueryCache};
use crate::entities::{Genre, GenreId, MovieDetail, MovieId, MovieSummary};
use crate::join::resolve_all;
use crate::store::collections::{ACTORS, DIRECTORS, GENRES, MOVIES};
use crate::store::Filter;
use crate::utils::{AlsoChain, LetChain};

pub struct MovieRepository {
    store: SharedStore,
    movies: QueryCache<Vec<MovieSummary>>,
    genres: QueryCache<Vec<Genre>>,
}

impl MovieRepository {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            movies: QueryCache::new(),
            genres: QueryCache::new(),
        }
    }

    /// every movie, or those in `genre` and/or released in `year`.
    #[tracing::instrument(skip(self))]
    pub async fn load_movies(
        &self,
        genre: Option<&GenreId>,
        year: Option<i32>,
    ) -> Result<Arc<Vec<MovieSummary>>> {
        let key = CacheKey::new(MOVIES)
            .with("genre", genre)
            .with("year", year);

        let mut filters = vec![];
        if let Some(g) = genre {
            filters.push(Filter::array_contains("genres", g.as_str()));
        }
        if let Some(y) = year {
            filters.push(Filter::eq("year", y));
        }

        self.movies
            .get_or_fetch(&key, || self.fetch_movies(&filters))
            .await
    }

    async fn fetch_movies(&self, filters: &[Filter]) -> Result<Vec<MovieSummary>> {
        self.store
            .query(MOVIES, filters)
            .await?
            .let_(|docs| decode_all::<MovieModel>(MOVIES, docs))
            .into_iter()
            .map(MovieSummary::from)
            .collect::<Vec<_>>()
            .also_(|v| tracing::trace!("output - {} movies", v.len()))
            .let_(Ok)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_movie(&self, id: &MovieId) -> Result<Option<MovieSummary>> {
        match self.store.get(MOVIES, id.as_str()).await? {
            Some(doc) => decode::<MovieModel>(MOVIES, doc)?
                .let_(MovieSummary::from)
                .let_(Some)
                .let_(Ok),
            None => Ok(None),
        }
    }

    /// the movie with its actors, directors and genres looked up by id.
    ///
    /// the three lists resolve concurrently, one lookup per referenced id;
    /// ids that fail or are unknown are left out.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn get_movie_detail(
        &self,
        id: &MovieId,
        cancel: &CancellationToken,
    ) -> Result<Option<MovieDetail>> {
        let model = match self.store.get(MOVIES, id.as_str()).await? {
            Some(doc) => decode::<MovieModel>(MOVIES, doc)?,
            None => return Ok(None),
        };

        let genre_ids = model.genres.clone();
        let (mut detail, actor_ids, director_ids) = model.into_unresolved_detail();

        let (actors, directors, genres) = tokio::try_join!(
            resolve_all(actor_ids, cancel, |id| self.lookup(ACTORS, id)),
            resolve_all(director_ids, cancel, |id| self.lookup(DIRECTORS, id)),
            resolve_all(genre_ids, cancel, |id| self.lookup(GENRES, id)),
        )?;

        detail.actors = actors.into_iter().map(NamedModel::into_actor).collect();
        detail.directors = directors.into_iter().map(NamedModel::into_director).collect();
        detail.genres = genres.into_iter().filter_map(NamedModel::into_genre).collect();

        tracing::trace!("output - {:?}", detail);

        Ok(Some(detail))
    }

    async fn lookup(&self, collection: &'static str, id: String) -> Result<Option<NamedModel>> {
        match self.store.get(collection, &id).await? {
            Some(doc) => decode(collection, doc).map(Some),
            None => Ok(None),
        }
    }

    /// genres that carry a name.
    #[tracing::instrument(skip(self))]
    pub async fn load_genres(&self) -> Result<Arc<Vec<Genre>>> {
        self.genres
            .get_or_fetch(&CacheKey::new(GENRES), || self.fetch_genres())
            .await
    }

    async fn fetch_genres(&self) -> Result<Vec<Genre>> {
        self.store
            .query(GENRES, &[])
            .await?
            .let_(|docs| decode_all::<NamedModel>(GENRES, docs))
            .into_iter()
            .filter_map(NamedModel::into_genre)
            .collect::<Vec<_>>()
            .let_(Ok)
    }

    pub async fn genre_names(&self) -> Result<HashMap<GenreId, String>> {
        Ok(self
            .load_genres()
            .await?
            .iter()
            .map(|g| (g.id.clone(), g.name.clone()))
            .collect())
    }

    /// forgets every memoized list; the next reads go to the store.
    pub async fn refresh(&self) {
        self.movies.invalidate_scope(MOVIES).await;
        self.genres.clear().await;
    }
}
