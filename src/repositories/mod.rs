use alloc::sync::Arc;

use crate::auth::AuthProvider;
use crate::entities::UserId;

pub(crate) mod decode;
mod favorite;
mod movie;
mod profile;
mod review;
mod score;

pub use favorite::FavoriteRepository;
pub use movie::MovieRepository;
pub use profile::{ProfileRepository, SharedImageHost, DEFAULT_PHOTO_URL};
pub use review::ReviewRepository;
pub use score::ScoreRepository;

pub type Result<T> = ::std::result::Result<T, RepositoryError>;

pub type SharedStore = Arc<dyn crate::store::DocumentStore + Sync + Send>;
pub type SharedAuth = Arc<dyn AuthProvider + Sync + Send>;

#[derive(Debug)]
pub enum RepositoryError {
    NotFound,
    /// nobody is signed in.
    Unauthenticated,
    /// the signed-in user does not own the record.
    Forbidden,
    Malformed {
        collection: String,
        id: String,
        source: ::mongodb::bson::de::Error,
    },
    Cancelled,
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "cannot find object."),
            RepositoryError::Unauthenticated => write!(f, "not signed in."),
            RepositoryError::Forbidden => write!(f, "not the owner of this object."),
            RepositoryError::Malformed { collection, id, source } =>
                write!(f, "malformed document {}/{}: {}", collection, id, source),
            RepositoryError::Cancelled => write!(f, "cancelled."),
            RepositoryError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
        match self {
            RepositoryError::Malformed { source, .. } => Some(source),
            RepositoryError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// the signed-in identity, or `Unauthenticated`.
pub(crate) async fn require_user(auth: &SharedAuth) -> Result<UserId> {
    auth.current_user()
        .await
        .ok_or(RepositoryError::Unauthenticated)
}
