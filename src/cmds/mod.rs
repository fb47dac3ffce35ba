//! the command line.

pub mod parser;
mod run;

use parser::*;
pub use run::run;

/// browse the movie catalog.
#[derive(Debug, Clone, ::clap::Parser)]
#[clap(author, version)]
pub struct App {
    /// where the catalog lives. without it an empty in-memory store is used.
    #[clap(long, env = "MOVIE_CATALOG_MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    #[clap(long, env = "MOVIE_CATALOG_DATABASE", default_value = "movie_catalog")]
    pub database: String,

    /// act as this user id.
    #[clap(long, env = "MOVIE_CATALOG_USER")]
    pub user: Option<String>,

    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, ::clap::Subcommand)]
pub enum Command {
    /// list movies, ten per page.
    Movies {
        /// genre id
        #[clap(long)]
        genre: Option<String>,

        #[clap(long)]
        year: Option<i32>,

        /// u32 (1 =< n)
        #[clap(long, default_value = "1", parse(try_from_str = parse_nonzero_num))]
        page: u32,
    },

    /// one movie with its people, ratings and reviews.
    Movie {
        #[clap(name = "MOVIE_ID")]
        id: String,
    },

    Genres,

    /// movies by title, optionally narrowed to genres.
    Search {
        #[clap(name = "QUERY", default_value = "")]
        query: String,

        /// genre id; repeatable
        #[clap(long = "genre")]
        genres: Vec<String>,
    },

    Favorites,

    /// mark or unmark a movie.
    Favorite {
        #[clap(name = "MOVIE_ID")]
        id: String,
    },

    Rate {
        #[clap(name = "MOVIE_ID")]
        id: String,

        /// 0 ..= 5
        #[clap(name = "SCORE", parse(try_from_str = parse_score))]
        score: f64,
    },

    Review {
        #[clap(name = "MOVIE_ID")]
        id: String,

        #[clap(name = "TEXT")]
        text: String,
    },

    MyReviews,

    Profile,
}
