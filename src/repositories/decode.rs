//! the typed edge of the store.
//!
//! every read goes through one of these models. a missing field takes the
//! model's default; a field of the wrong type rejects the whole document.

use mongodb::bson::{from_document, Bson, Document};
use serde::de::DeserializeOwned;

use super::{RepositoryError, Result};
use crate::entities::{
    Actor, Director, Favorite, Genre, MovieDetail, MovieSummary, Review, UserCard, UserId,
    UserProfile,
};
use crate::store::doc_id;

#[derive(Debug, Clone, Default, ::serde::Deserialize)]
#[serde(default)]
pub struct MovieModel {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "photoLinks")]
    pub photo_links: Vec<String>,
    pub genres: Vec<String>,
    pub year: i32,
    pub category: String,
    pub duration: i32,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
}

/// `genres`, `actors` and `directors` documents.
#[derive(Debug, Clone, Default, ::serde::Deserialize)]
#[serde(default)]
pub struct NamedModel {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, ::serde::Deserialize)]
#[serde(default)]
pub struct ReviewModel {
    #[serde(rename = "_id")]
    pub id: String,
    pub movie: String,
    pub user: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, ::serde::Deserialize)]
#[serde(default)]
pub struct ScoreModel {
    pub user: String,
    pub movie: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, ::serde::Deserialize)]
#[serde(default)]
pub struct FavoriteModel {
    pub user: Option<String>,
    pub movie: Option<String>,
}

#[derive(Debug, Clone, Default, ::serde::Deserialize)]
#[serde(default)]
pub struct UserModel {
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Default, ::serde::Deserialize)]
#[serde(default)]
pub struct UserInfoModel {
    pub about: String,
    pub phone: String,
    pub birthday: String,
    pub gender: String,
    #[serde(rename = "favoriteGenres")]
    pub favorite_genres: Vec<String>,
    #[serde(rename = "ReviewCount")]
    pub review_count: Option<Bson>,
    /// spelling used by older registrations
    #[serde(rename = "reviewCount")]
    pub legacy_review_count: Option<Bson>,
    #[serde(rename = "regDate")]
    pub reg_date: String,
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
}

pub fn decode<M: DeserializeOwned>(collection: &str, doc: Document) -> Result<M> {
    let id = doc_id(&doc).unwrap_or_default().to_string();

    from_document(doc).map_err(|source| RepositoryError::Malformed {
        collection: collection.to_string(),
        id,
        source,
    })
}

/// like `decode`, but a rejected document is logged and left out.
pub fn decode_all<M: DeserializeOwned>(collection: &str, docs: Vec<Document>) -> Vec<M> {
    docs.into_iter()
        .filter_map(|d| match decode(collection, d) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!("skipping document: {}", e);
                None
            },
        })
        .collect()
}

impl From<MovieModel> for MovieSummary {
    fn from(
        MovieModel {
            id,
            title,
            description,
            photo_links,
            genres,
            year,
            ..
        }: MovieModel,
    ) -> Self {
        MovieSummary {
            id: id.into(),
            title,
            description,
            photo_links,
            genres: genres.into_iter().map(Into::into).collect(),
            year,
        }
    }
}

impl MovieModel {
    /// the detail record before the referenced ids are resolved.
    pub fn into_unresolved_detail(mut self) -> (MovieDetail, Vec<String>, Vec<String>) {
        let category = ::core::mem::take(&mut self.category);
        let duration = self.duration;
        let actors = ::core::mem::take(&mut self.actors);
        let directors = ::core::mem::take(&mut self.directors);

        let detail = MovieDetail {
            summary: self.into(),
            category,
            duration,
            actors: vec![],
            directors: vec![],
            genres: vec![],
        };

        (detail, actors, directors)
    }
}

impl NamedModel {
    pub fn into_genre(self) -> Option<Genre> {
        let NamedModel { id, name } = self;
        name.map(|name| Genre { id: id.into(), name })
    }

    /// people without a name are still listed, under an empty one.
    pub fn into_actor(self) -> Actor {
        Actor {
            id: self.id.into(),
            name: self.name.unwrap_or_default(),
        }
    }

    pub fn into_director(self) -> Director {
        Director {
            id: self.id.into(),
            name: self.name.unwrap_or_default(),
        }
    }
}

impl FavoriteModel {
    /// records missing either side are not favorites.
    pub fn into_favorite(self) -> Option<Favorite> {
        match (self.user, self.movie) {
            (Some(user), Some(movie)) => Some(Favorite {
                user: user.into(),
                movie: movie.into(),
            }),
            _ => None,
        }
    }
}

impl From<ReviewModel> for Review {
    fn from(ReviewModel { id, movie, user, text }: ReviewModel) -> Self {
        Review {
            id: id.into(),
            movie: movie.into(),
            user: user.into(),
            text,
        }
    }
}

fn parse_count(raw: &Bson) -> u32 {
    let parsed = match raw {
        Bson::String(s) => s.trim().parse().ok(),
        Bson::Int32(n) => u32::try_from(*n).ok(),
        Bson::Int64(n) => u32::try_from(*n).ok(),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        tracing::warn!("unreadable review count {:?}, using 0", raw);
        0
    })
}

impl UserInfoModel {
    pub fn review_count(&self) -> u32 {
        self.review_count
            .as_ref()
            .or(self.legacy_review_count.as_ref())
            .map(parse_count)
            .unwrap_or(0)
    }
}

/// `users/<id>` and `userInfo/<id>` merged into one record.
pub fn merge_profile(id: UserId, user: UserModel, info: UserInfoModel) -> UserProfile {
    let review_count = info.review_count();

    UserProfile {
        id,
        name: user.name.unwrap_or_default(),
        email: user.email,
        about: info.about,
        phone: info.phone,
        birthday: info.birthday,
        gender: info.gender,
        favorite_genres: info.favorite_genres.into_iter().map(Into::into).collect(),
        review_count,
        reg_date: info.reg_date,
        photo_url: info.photo_url.unwrap_or_default(),
    }
}

pub fn user_card(user: Option<UserModel>, info: Option<UserInfoModel>) -> UserCard {
    let default = UserCard::default();

    UserCard {
        name: user.and_then(|u| u.name).unwrap_or(default.name),
        photo_url: info.and_then(|i| i.photo_url).unwrap_or(default.photo_url),
    }
}
