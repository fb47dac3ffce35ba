use alloc::sync::Arc;

use anyhow::anyhow;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mongodb::bson::{doc, Document};
use tokio::sync::Mutex;

use super::decode::{decode, merge_profile, user_card, UserInfoModel, UserModel};
use super::{require_user, RepositoryError, Result, ReviewRepository, SharedAuth, SharedStore};
use crate::entities::{UserCard, UserId, UserProfile};
use crate::image_host::ImageHost;
use crate::store::collections::{FAVORITES, REVIEWS, SCORES, USERS, USER_INFO};
use crate::store::{doc_id, DocRef, Filter, SetMode};
use crate::utils::AlsoChain;

/// photo every new account starts with.
pub const DEFAULT_PHOTO_URL: &str = "https://ibb.co/q3b835dC";

pub type SharedImageHost = Arc<dyn ImageHost + Sync + Send>;

pub struct ProfileRepository {
    store: SharedStore,
    auth: SharedAuth,
    images: SharedImageHost,
    /// its lists go stale when an account's reviews are deleted
    reviews: Arc<ReviewRepository>,
    cached: Mutex<Option<UserProfile>>,
}

impl ProfileRepository {
    pub fn new(
        store: SharedStore,
        auth: SharedAuth,
        images: SharedImageHost,
        reviews: Arc<ReviewRepository>,
    ) -> Self {
        Self {
            store,
            auth,
            images,
            reviews,
            cached: Mutex::new(None),
        }
    }

    pub async fn current_user(&self) -> Option<UserId> { self.auth.current_user().await }

    /// the signed-in user's profile. read once, then served from memory.
    #[tracing::instrument(skip(self))]
    pub async fn load_profile(&self) -> Result<UserProfile> {
        let id = require_user(&self.auth).await?;

        if let Some(p) = self.cached.lock().await.as_ref().filter(|p| p.id == id) {
            tracing::debug!("profile cache hit");
            return Ok(p.clone());
        }

        let user = self.read::<UserModel>(USERS, &id).await?.unwrap_or_default();
        let info = self
            .read::<UserInfoModel>(USER_INFO, &id)
            .await?
            .unwrap_or_default();

        let profile = merge_profile(id, user, info).also_(|p| tracing::trace!("output - {:?}", p));
        *self.cached.lock().await = Some(profile.clone());

        Ok(profile)
    }

    /// writes the extended fields of `profile`, leaving the others in
    /// `userInfo` alone.
    #[tracing::instrument(skip(self, profile), fields(id = %profile.id))]
    pub async fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let id = require_user(&self.auth).await?;

        let fields = doc! {
            "about": profile.about.as_str(),
            "phone": profile.phone.as_str(),
            "birthday": profile.birthday.as_str(),
            "gender": profile.gender.as_str(),
            "favoriteGenres": profile
                .favorite_genres
                .iter()
                .map(|g| g.as_str())
                .collect::<Vec<_>>(),
            "ReviewCount": profile.review_count.to_string(),
            "regDate": profile.reg_date.as_str(),
            "photoUrl": profile.photo_url.as_str(),
        };

        self.store
            .set(USER_INFO, id.as_str(), fields, SetMode::Merge)
            .await?;

        *self.cached.lock().await = Some(UserProfile {
            id,
            ..profile.clone()
        });

        Ok(())
    }

    /// creates the identity, then `users/<id>`, then `userInfo/<id>`.
    ///
    /// each step runs only when the one before it succeeded; nothing already
    /// written is undone.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<UserId> {
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(RepositoryError::Internal(anyhow!(
                "name, email and password are required"
            )));
        }

        let id = self.auth.create_user(email, password).await?;
        *self.cached.lock().await = None;

        self.store
            .set(
                USERS,
                id.as_str(),
                doc! { "name": name, "email": email },
                SetMode::Overwrite,
            )
            .await?;

        self.store
            .set(USER_INFO, id.as_str(), new_user_info(), SetMode::Overwrite)
            .await?;

        tracing::info!("registered {}", id);

        Ok(id)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        *self.cached.lock().await = None;

        self.auth.sign_in(email, password).await
    }

    pub async fn sign_out(&self) {
        *self.cached.lock().await = None;
        self.auth.sign_out().await;

        tracing::info!("signed out");
    }

    /// removes everything the signed-in user owns, then the identity itself.
    ///
    /// runs step by step and stops at the first failure. the documents go in
    /// one all-or-nothing batch, but a failure after the batch leaves them
    /// deleted.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self) -> Result<()> {
        let id = require_user(&self.auth).await?;

        let mut refs = vec![
            DocRef::new(USERS, id.as_str()),
            DocRef::new(USER_INFO, id.as_str()),
        ];
        for collection in [REVIEWS, SCORES, FAVORITES] {
            self.store
                .query(collection, &[Filter::eq("user", id.as_str())])
                .await?
                .iter()
                .filter_map(doc_id)
                .for_each(|d| refs.push(DocRef::new(collection, d)));
        }

        tracing::debug!("deleting {} documents", refs.len());
        self.store.delete_batch(refs).await?;
        self.reviews.refresh().await;

        self.auth.delete_current_user().await?;
        self.sign_out().await;

        Ok(())
    }

    /// hands the image to the image host and returns where it ended up.
    #[tracing::instrument(skip(self, image))]
    pub async fn upload_photo(&self, image: &[u8]) -> Result<String> {
        let url = self.images.upload(STANDARD.encode(image)).await?;

        if url.is_empty() {
            return Err(RepositoryError::Internal(anyhow!(
                "image host returned no url"
            )));
        }

        tracing::trace!("output - {}", url);
        Ok(url)
    }

    /// name and photo of any user, for showing next to their reviews.
    #[tracing::instrument(skip(self))]
    pub async fn load_user_card(&self, user: &UserId) -> Result<UserCard> {
        let (u, info) = tokio::try_join!(
            self.read::<UserModel>(USERS, user),
            self.read::<UserInfoModel>(USER_INFO, user),
        )?;

        Ok(user_card(u, info))
    }

    async fn read<M>(&self, collection: &'static str, id: &UserId) -> Result<Option<M>>
    where M: ::serde::de::DeserializeOwned {
        match self.store.get(collection, id.as_str()).await? {
            Some(doc) => decode(collection, doc).map(Some),
            None => Ok(None),
        }
    }
}

fn new_user_info() -> Document {
    doc! {
        "about": "",
        "phone": "",
        "birthday": "",
        "gender": "",
        "favoriteGenres": [],
        "ReviewCount": "0",
        "regDate": ::chrono::Local::now().format("%Y-%m-%d").to_string(),
        "photoUrl": DEFAULT_PHOTO_URL,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::{AuthProvider, InMemoryAuth};
    use crate::entities::MovieId;
    use crate::store::mock::InMemoryStore;
    use crate::store::DocumentStore;

    #[derive(Default)]
    struct RecordingHost {
        uploads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageHost for RecordingHost {
        async fn upload(&self, image_base64: String) -> Result<String> {
            self.uploads.lock().await.push(image_base64);
            Ok("https://i.ibb.co/photo.png".to_string())
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        auth: Arc<InMemoryAuth>,
        host: Arc<RecordingHost>,
        reviews: Arc<ReviewRepository>,
        repo: ProfileRepository,
    }

    async fn fixture(auth: InMemoryAuth) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let auth = Arc::new(auth);
        let host = Arc::new(RecordingHost::default());

        store
            .seed(USERS, "u1", doc! { "name": "Ann", "email": "ann@example.com" })
            .await;
        store
            .seed(USER_INFO, "u1", doc! {
                "about": "hi",
                "favoriteGenres": ["5"],
                "ReviewCount": "2",
                "regDate": "2024-05-01",
                "photoUrl": "https://i.ibb.co/ann.png",
            })
            .await;

        let reviews = Arc::new(ReviewRepository::new(store.clone(), auth.clone()));
        let repo = ProfileRepository::new(store.clone(), auth.clone(), host.clone(), reviews.clone());

        Fixture {
            store,
            auth,
            host,
            reviews,
            repo,
        }
    }

    #[tokio::test]
    async fn profile_merges_both_documents_once() {
        let f = fixture(InMemoryAuth::signed_in("u1")).await;

        let p = f.repo.load_profile().await.unwrap();
        assert_eq!(p.name, "Ann");
        assert_eq!(p.about, "hi");
        assert_eq!(p.review_count, 2);
        assert_eq!(p.phone, "");

        let reads = f.store.reads();
        assert_eq!(f.repo.load_profile().await.unwrap(), p);
        assert_eq!(f.store.reads(), reads);
    }

    #[tokio::test]
    async fn profile_needs_a_user() {
        let f = fixture(InMemoryAuth::new()).await;

        assert!(matches!(
            f.repo.load_profile().await,
            Err(RepositoryError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn update_merges_and_replaces_the_cache() {
        let f = fixture(InMemoryAuth::signed_in("u1")).await;
        f.store
            .set(USER_INFO, "u1", doc! { "extra": true }, SetMode::Merge)
            .await
            .unwrap();

        let mut p = f.repo.load_profile().await.unwrap();
        p.phone = "555".to_string();
        f.repo.update_profile(&p).await.unwrap();

        let reads = f.store.reads();
        assert_eq!(f.repo.load_profile().await.unwrap().phone, "555");
        assert_eq!(f.store.reads(), reads);

        let stored = f.store.get(USER_INFO, "u1").await.unwrap().unwrap();
        assert_eq!(stored.get_str("phone").unwrap(), "555");
        assert!(stored.get_bool("extra").unwrap());
    }

    #[tokio::test]
    async fn registration_writes_defaults() {
        let f = fixture(InMemoryAuth::new()).await;

        let id = f.repo.register("Bob", "bob@example.com", "pw").await.unwrap();
        let p = f.repo.load_profile().await.unwrap();

        assert_eq!(p.id, id);
        assert_eq!(p.name, "Bob");
        assert_eq!(p.review_count, 0);
        assert_eq!(p.photo_url, DEFAULT_PHOTO_URL);
        assert_eq!(p.reg_date.len(), "yyyy-mm-dd".len());
    }

    #[tokio::test]
    async fn registration_rejects_blank_fields() {
        let f = fixture(InMemoryAuth::new()).await;

        assert!(f.repo.register("", "bob@example.com", "pw").await.is_err());
        assert_eq!(f.auth.current_user().await, None);
    }

    #[tokio::test]
    async fn switching_users_drops_the_cached_profile() {
        let f = fixture(InMemoryAuth::new()).await;
        f.repo.register("Bob", "bob@example.com", "pw").await.unwrap();
        assert_eq!(f.repo.load_profile().await.unwrap().name, "Bob");

        f.repo.sign_out().await;
        f.repo.register("Cy", "cy@example.com", "pw").await.unwrap();
        assert_eq!(f.repo.load_profile().await.unwrap().name, "Cy");

        f.repo.sign_in("bob@example.com", "pw").await.unwrap();
        assert_eq!(f.repo.load_profile().await.unwrap().name, "Bob");
    }

    #[tokio::test]
    async fn account_deletion_takes_everything_owned() {
        let f = fixture(InMemoryAuth::new()).await;
        let id = f.repo.register("Bob", "bob@example.com", "pw").await.unwrap();

        for (coll, key) in [(REVIEWS, "r1"), (SCORES, "s1"), (FAVORITES, "f1")] {
            f.store
                .seed(coll, key, doc! { "user": id.as_str(), "movie": "16" })
                .await;
        }
        f.store
            .seed(REVIEWS, "r2", doc! { "user": "u1", "movie": "16" })
            .await;

        f.repo.delete_account().await.unwrap();

        assert_eq!(f.auth.current_user().await, None);
        assert!(f.store.get(USERS, id.as_str()).await.unwrap().is_none());
        assert!(f.store.get(USER_INFO, id.as_str()).await.unwrap().is_none());
        assert_eq!(f.store.count(REVIEWS).await, 1);
        assert_eq!(f.store.count(SCORES).await, 0);
        assert_eq!(f.store.count(FAVORITES).await, 0);
        assert!(f.auth.sign_in("bob@example.com", "pw").await.is_err());
    }

    #[tokio::test]
    async fn account_deletion_drops_memoized_reviews() {
        let f = fixture(InMemoryAuth::new()).await;
        let id = f.repo.register("Bob", "bob@example.com", "pw").await.unwrap();
        f.store
            .seed(REVIEWS, "r1", doc! { "user": id.as_str(), "movie": "16", "text": "x" })
            .await;
        let movie = MovieId::from("16");

        assert_eq!(f.reviews.reviews_for_movie(&movie).await.unwrap().len(), 1);
        assert_eq!(f.reviews.reviews_for_user(&id).await.unwrap().len(), 1);

        f.repo.delete_account().await.unwrap();

        assert_eq!(f.store.count(REVIEWS).await, 0);
        assert!(f.reviews.reviews_for_movie(&movie).await.unwrap().is_empty());
        assert!(f.reviews.reviews_for_user(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn photo_is_sent_base64_encoded() {
        let f = fixture(InMemoryAuth::signed_in("u1")).await;

        let url = f.repo.upload_photo(b"png").await.unwrap();

        assert_eq!(url, "https://i.ibb.co/photo.png");
        assert_eq!(*f.host.uploads.lock().await, vec!["cG5n".to_string()]);
    }

    #[tokio::test]
    async fn user_cards_fall_back_to_defaults() {
        let f = fixture(InMemoryAuth::new()).await;

        let ann = f.repo.load_user_card(&"u1".into()).await.unwrap();
        assert_eq!(ann.name, "Ann");
        assert_eq!(ann.photo_url, "https://i.ibb.co/ann.png");

        assert_eq!(
            f.repo.load_user_card(&"nobody".into()).await.unwrap(),
            UserCard::default()
        );
    }
}
