use alloc::sync::Arc;
use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use regex::{Regex, RegexBuilder};
use tokio_util::sync::CancellationToken;

use super::{unless_disposed, Observable};
use crate::entities::{GenreId, MovieSummary};
use crate::repositories::MovieRepository;

pub struct SearchScreen {
    repo: Arc<MovieRepository>,
    cancel: CancellationToken,

    pub movies: Observable<Arc<Vec<MovieSummary>>>,
    pub genres: Observable<HashMap<GenreId, String>>,
    pub search_query: Observable<String>,
    pub selected_genres: Observable<BTreeSet<GenreId>>,
}

/// case-insensitive "contains", or `None` for a blank query.
fn title_matcher(query: &str) -> Result<Option<Regex>> {
    if query.trim().is_empty() {
        return Ok(None);
    }

    let re = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()?;

    Ok(Some(re))
}

impl SearchScreen {
    pub fn new(repo: Arc<MovieRepository>) -> Self {
        Self {
            repo,
            cancel: CancellationToken::new(),
            movies: Observable::default(),
            genres: Observable::default(),
            search_query: Observable::default(),
            selected_genres: Observable::default(),
        }
    }

    pub async fn load_movies(&self) -> Result<()> {
        if let Some(res) = unless_disposed(&self.cancel, self.repo.load_movies(None, None)).await {
            self.movies.set(res?);
        }

        Ok(())
    }

    /// does nothing once genres are there.
    pub async fn load_genres(&self) -> Result<()> {
        if !self.genres.with(HashMap::is_empty) {
            return Ok(());
        }

        if let Some(res) = unless_disposed(&self.cancel, self.repo.genre_names()).await {
            self.genres.set(res?);
        }

        Ok(())
    }

    pub fn update_search_query(&self, query: impl Into<String>) { self.search_query.set(query.into()) }

    pub fn toggle_genre(&self, genre: GenreId) {
        self.selected_genres.update(|s| {
            if !s.remove(&genre) {
                s.insert(genre);
            }
        });
    }

    /// movies whose title contains the query, ignoring case, and that carry
    /// at least one selected genre. a blank query or an empty selection lets
    /// everything through on that side.
    pub fn filtered_movies(&self) -> Result<Vec<MovieSummary>> {
        let matcher = self.search_query.with(|q| title_matcher(q))?;
        let selected = self.selected_genres.get();

        let res = self.movies.with(|movies| {
            movies
                .iter()
                .filter(|m| matcher.as_ref().map_or(true, |re| re.is_match(&m.title)))
                .filter(|m| selected.is_empty() || m.genres.iter().any(|g| selected.contains(g)))
                .cloned()
                .collect::<Vec<_>>()
        });

        Ok(res)
    }

    pub fn dispose(&self) { self.cancel.cancel() }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;
    use crate::store::collections::{GENRES, MOVIES};
    use crate::store::mock::InMemoryStore;

    async fn screen() -> (Arc<InMemoryStore>, SearchScreen) {
        let store = Arc::new(InMemoryStore::new());

        store
            .seed(MOVIES, "1", doc! { "title": "The Dark Knight", "genres": ["action", "crime"] })
            .await;
        store
            .seed(MOVIES, "2", doc! { "title": "Dark City", "genres": ["scifi"] })
            .await;
        store
            .seed(MOVIES, "3", doc! { "title": "Amélie", "genres": ["comedy"] })
            .await;
        store
            .seed(MOVIES, "4", doc! { "title": "What? (1972)", "genres": ["comedy"] })
            .await;
        store.seed(GENRES, "action", doc! { "name": "Action" }).await;

        let s = SearchScreen::new(Arc::new(MovieRepository::new(store.clone())));
        s.load_movies().await.unwrap();

        (store, s)
    }

    fn titles(movies: Vec<MovieSummary>) -> Vec<String> {
        movies.into_iter().map(|m| m.title).collect()
    }

    #[tokio::test]
    async fn nothing_entered_shows_everything() {
        let (_, s) = screen().await;

        assert_eq!(s.filtered_movies().unwrap().len(), 4);

        s.update_search_query("   ");
        assert_eq!(s.filtered_movies().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn title_match_ignores_case() {
        let (_, s) = screen().await;

        s.update_search_query("dark");
        assert_eq!(titles(s.filtered_movies().unwrap()), vec![
            "The Dark Knight",
            "Dark City"
        ]);

        s.update_search_query("AMÉLIE");
        assert_eq!(titles(s.filtered_movies().unwrap()), vec!["Amélie"]);
    }

    #[tokio::test]
    async fn query_is_taken_literally() {
        let (_, s) = screen().await;

        s.update_search_query("? (19");
        assert_eq!(titles(s.filtered_movies().unwrap()), vec!["What? (1972)"]);
    }

    #[tokio::test]
    async fn genres_and_query_both_apply() {
        let (_, s) = screen().await;

        s.toggle_genre("scifi".into());
        s.toggle_genre("crime".into());
        assert_eq!(s.filtered_movies().unwrap().len(), 2);

        s.update_search_query("knight");
        assert_eq!(titles(s.filtered_movies().unwrap()), vec!["The Dark Knight"]);

        s.toggle_genre("crime".into());
        assert!(s.filtered_movies().unwrap().is_empty());
    }

    #[tokio::test]
    async fn genres_load_once() {
        let (store, s) = screen().await;

        s.load_genres().await.unwrap();
        let reads = store.reads();
        s.load_genres().await.unwrap();

        assert_eq!(store.reads(), reads);
        assert_eq!(s.genres.get().len(), 1);
    }
}
