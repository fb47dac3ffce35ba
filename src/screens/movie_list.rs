use alloc::sync::Arc;
use std::collections::HashMap;

use anyhow::Result;
use smallvec::SmallVec;
use tokio_util::sync::CancellationToken;

use super::{unless_disposed, Observable};
use crate::entities::{GenreId, MovieSummary};
use crate::repositories::MovieRepository;
use crate::utils::{page_count, page_range};

pub const PAGE_SIZE: usize = 10;

pub type Page = SmallVec<[MovieSummary; PAGE_SIZE]>;

pub struct MovieListScreen {
    repo: Arc<MovieRepository>,
    cancel: CancellationToken,

    pub movies: Observable<Arc<Vec<MovieSummary>>>,
    pub genre_names: Observable<HashMap<GenreId, String>>,
    pub is_loading: Observable<bool>,
    /// 1-origin
    pub page: Observable<usize>,
}

impl MovieListScreen {
    pub fn new(repo: Arc<MovieRepository>) -> Self {
        Self {
            repo,
            cancel: CancellationToken::new(),
            movies: Observable::default(),
            genre_names: Observable::default(),
            is_loading: Observable::new(false),
            page: Observable::new(1),
        }
    }

    pub async fn load_genres(&self) -> Result<()> {
        if let Some(res) = unless_disposed(&self.cancel, self.repo.genre_names()).await {
            self.genre_names.set(res?);
        }

        Ok(())
    }

    /// replaces the list and goes back to the first page.
    pub async fn load_movies(&self, genre: Option<GenreId>, year: Option<i32>) -> Result<()> {
        self.is_loading.set(true);
        let res = unless_disposed(&self.cancel, self.repo.load_movies(genre.as_ref(), year)).await;
        self.is_loading.set(false);

        if let Some(res) = res {
            self.movies.set(res?);
            self.page.set(1);
        }

        Ok(())
    }

    pub fn total_pages(&self) -> usize { page_count(self.movies.with(|m| m.len()), PAGE_SIZE) }

    pub fn current_page(&self) -> Page {
        let page = self.page.get();

        self.movies
            .with(|m| Page::from(&m[page_range(m.len(), PAGE_SIZE, page)]))
    }

    /// `false` when already on the last page.
    pub fn next_page(&self) -> bool {
        let total = self.total_pages();
        let mut moved = false;

        self.page.update(|p| {
            if *p < total {
                *p += 1;
                moved = true;
            }
        });

        moved
    }

    /// `false` when already on the first page.
    pub fn prev_page(&self) -> bool {
        let mut moved = false;

        self.page.update(|p| {
            if *p > 1 {
                *p -= 1;
                moved = true;
            }
        });

        moved
    }

    pub fn dispose(&self) { self.cancel.cancel() }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;
    use crate::store::collections::{GENRES, MOVIES};
    use crate::store::mock::InMemoryStore;

    async fn screen(movies: usize) -> MovieListScreen {
        let store = Arc::new(InMemoryStore::new());

        for i in 0..movies {
            let genre = if i % 2 == 0 { "even" } else { "odd" };
            store
                .seed(MOVIES, &i.to_string(), doc! {
                    "title": format!("movie {}", i),
                    "genres": [genre],
                })
                .await;
        }
        store.seed(GENRES, "even", doc! { "name": "Even" }).await;

        MovieListScreen::new(Arc::new(MovieRepository::new(store)))
    }

    #[tokio::test]
    async fn pages_hold_ten_movies() {
        let s = screen(25).await;
        s.load_movies(None, None).await.unwrap();

        assert!(!s.is_loading.get());
        assert_eq!(s.total_pages(), 3);
        assert_eq!(s.current_page().len(), 10);

        assert!(s.next_page());
        assert!(s.next_page());
        assert_eq!(s.current_page().len(), 5);
        assert!(!s.next_page());
        assert_eq!(s.page.get(), 3);

        assert!(s.prev_page());
        assert!(s.prev_page());
        assert!(!s.prev_page());
        assert_eq!(s.page.get(), 1);
    }

    #[tokio::test]
    async fn filtering_returns_to_the_first_page() {
        let s = screen(25).await;
        s.load_movies(None, None).await.unwrap();
        s.next_page();

        s.load_movies(Some("odd".into()), None).await.unwrap();

        assert_eq!(s.page.get(), 1);
        assert_eq!(s.movies.with(|m| m.len()), 12);
        assert_eq!(s.total_pages(), 2);
    }

    #[tokio::test]
    async fn empty_catalog_has_one_empty_page() {
        let s = screen(0).await;
        s.load_movies(None, None).await.unwrap();

        assert_eq!(s.total_pages(), 1);
        assert!(s.current_page().is_empty());
        assert!(!s.next_page());
    }

    #[tokio::test]
    async fn genre_names_are_loaded() {
        let s = screen(1).await;
        s.load_genres().await.unwrap();

        assert_eq!(s.genre_names.get().get(&GenreId::from("even")).unwrap(), "Even");
    }

    #[tokio::test]
    async fn disposed_screen_ignores_results() {
        let s = screen(3).await;
        s.dispose();

        s.load_movies(None, None).await.unwrap();

        assert!(s.movies.with(|m| m.is_empty()));
        assert!(!s.is_loading.get());
    }
}
