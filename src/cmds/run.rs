use anyhow::Result;
use serde_json::{json, Value};

use super::Command;
use crate::constructors::Services;
use crate::entities::{GenreId, UserId};
use crate::screens::{
    FavoritesScreen, MovieDetailScreen, MovieListScreen, ProfileScreen, ReviewsScreen,
    SearchScreen,
};

/// drives the screen behind `cmd` and returns what it ended up showing.
#[tracing::instrument(skip(services))]
pub async fn run(cmd: Command, services: &Services) -> Result<Value> {
    let out = match cmd {
        Command::Movies { genre, year, page } => {
            let s = MovieListScreen::new(services.movies.clone());
            s.load_genres().await?;
            s.load_movies(genre.map(GenreId::from), year).await?;

            for _ in 1..page {
                if !s.next_page() {
                    break;
                }
            }

            json!({
                "page": s.page.get(),
                "total_pages": s.total_pages(),
                "movies": s.current_page().into_vec(),
                "genre_names": s.genre_names.get(),
            })
        },

        Command::Movie { id } => {
            let s = MovieDetailScreen::new(id.into(), services);
            s.load().await?;

            let authors = s
                .reviews
                .with(|r| r.iter().map(|r| r.user.clone()).collect::<Vec<UserId>>());
            for user in &authors {
                s.load_user_card(user).await?;
            }

            json!({
                "movie": s.movie.get(),
                "average_rating": s.average_rating.get(),
                "is_favorite": s.is_favorite.get(),
                "reviews": s.reviews.get(),
                "user_cards": s.user_cards.get(),
            })
        },

        Command::Genres => {
            let genres = services.movies.load_genres().await?;

            json!(genres.as_ref())
        },

        Command::Search { query, genres } => {
            let s = SearchScreen::new(services.movies.clone());
            s.load_movies().await?;
            s.update_search_query(query);
            for g in genres {
                s.toggle_genre(g.into());
            }

            json!(s.filtered_movies()?)
        },

        Command::Favorites => {
            let s = FavoritesScreen::new(services.favorites.clone());
            s.load().await?;

            json!(s.favorite_movies.get())
        },

        Command::Favorite { id } => {
            let s = MovieDetailScreen::new(id.into(), services);
            s.load().await?;
            s.toggle_favorite().await?;

            json!({ "is_favorite": s.is_favorite.get() })
        },

        Command::Rate { id, score } => {
            let s = MovieDetailScreen::new(id.into(), services);
            s.update_rating(score).await?;

            json!({ "average_rating": s.average_rating.get() })
        },

        Command::Review { id, text } => {
            let s = MovieDetailScreen::new(id.into(), services);
            s.set_review_text(text);
            s.submit_review().await?;

            json!(s.reviews.with(|r| r.last().cloned()))
        },

        Command::MyReviews => {
            let s = ReviewsScreen::new(services);
            s.load_reviews().await?;

            json!(s.reviews.get())
        },

        Command::Profile => {
            let s = ProfileScreen::new(services);
            s.load_profile().await?;

            json!(s.profile.get())
        },
    };

    Ok(out)
}
