use ::core::fmt::{Display, Formatter, Result as FmtResult};

macro_rules! string_id {
    ($( $n:ident ),* $(,)?) => {
        $(
            #[derive(
                Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
                ::serde::Serialize, ::serde::Deserialize,
            )]
            #[serde(transparent)]
            pub struct $n(pub String);

            impl $n {
                pub fn as_str(&self) -> &str { &self.0 }
            }

            impl Display for $n {
                fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult { f.write_str(&self.0) }
            }

            impl From<String> for $n {
                fn from(s: String) -> Self { Self(s) }
            }

            impl From<&str> for $n {
                fn from(s: &str) -> Self { Self(s.to_string()) }
            }
        )*
    };
}

string_id!(MovieId, UserId, GenreId, PersonId, ReviewId);

#[derive(Debug, Clone, PartialEq, Default, ::serde::Serialize)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    pub description: String,
    pub photo_links: Vec<String>,
    pub genres: Vec<GenreId>,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Default, ::serde::Serialize)]
pub struct MovieDetail {
    pub summary: MovieSummary,
    pub category: String,
    /// minutes
    pub duration: i32,
    pub actors: Vec<Actor>,
    pub directors: Vec<Director>,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize)]
pub struct Actor {
    pub id: PersonId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize)]
pub struct Director {
    pub id: PersonId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub movie: MovieId,
    pub user: UserId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, ::serde::Serialize)]
pub struct Score {
    pub user: UserId,
    pub movie: MovieId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize)]
pub struct Favorite {
    pub user: UserId,
    pub movie: MovieId,
}

/// merged view of `users/<id>` and `userInfo/<id>`.
#[derive(Debug, Clone, PartialEq, Default, ::serde::Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub about: String,
    pub phone: String,
    pub birthday: String,
    pub gender: String,
    pub favorite_genres: Vec<GenreId>,
    pub review_count: u32,
    pub reg_date: String,
    pub photo_url: String,
}

/// what a review list needs to show about the author.
#[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize)]
pub struct UserCard {
    pub name: String,
    pub photo_url: String,
}

impl Default for UserCard {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
            photo_url: String::new(),
        }
    }
}
