use alloc::sync::Arc;

use crate::repositories::{
    FavoriteRepository, MovieRepository, ProfileRepository, ReviewRepository, ScoreRepository,
    SharedAuth, SharedImageHost, SharedStore,
};
use crate::store::mock::InMemoryStore;
use crate::store::mongo::MongoStore;

/// every repository, over one store and one identity.
///
/// screens take what they need from here. the repositories' caches live as
/// long as this does.
#[derive(Clone)]
pub struct Services {
    pub movies: Arc<MovieRepository>,
    pub reviews: Arc<ReviewRepository>,
    pub favorites: Arc<FavoriteRepository>,
    pub scores: Arc<ScoreRepository>,
    pub profiles: Arc<ProfileRepository>,
}

impl Services {
    pub fn new(store: SharedStore, auth: SharedAuth, images: SharedImageHost) -> Self {
        let reviews = Arc::new(ReviewRepository::new(store.clone(), auth.clone()));

        Self {
            movies: Arc::new(MovieRepository::new(store.clone())),
            favorites: Arc::new(FavoriteRepository::new(store.clone(), auth.clone())),
            scores: Arc::new(ScoreRepository::new(store.clone(), auth.clone())),
            profiles: Arc::new(ProfileRepository::new(store, auth, images, reviews.clone())),
            reviews,
        }
    }
}

pub fn in_memory(auth: SharedAuth, images: SharedImageHost) -> (Arc<InMemoryStore>, Services) {
    let store = Arc::new(InMemoryStore::new());
    let services = Services::new(store.clone(), auth, images);

    (store, services)
}

pub async fn mongo(
    uri_str: impl AsRef<str>,
    db_name: impl AsRef<str>,
    auth: SharedAuth,
    images: SharedImageHost,
) -> ::anyhow::Result<Services> {
    let c = ::mongodb::Client::with_uri_str(uri_str).await?;
    let db = c.database(db_name.as_ref());

    let store = MongoStore::new_with(c, db).await?;

    Ok(Services::new(Arc::new(store), auth, images))
}
