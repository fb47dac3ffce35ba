use alloc::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::{unless_disposed, Observable};
use crate::constructors::Services;
use crate::entities::{Genre, GenreId, UserProfile};
use crate::repositories::{MovieRepository, ProfileRepository, ReviewRepository};

pub struct ProfileScreen {
    profiles: Arc<ProfileRepository>,
    reviews: Arc<ReviewRepository>,
    movies: Arc<MovieRepository>,
    cancel: CancellationToken,

    pub profile: Observable<UserProfile>,
    pub is_loading: Observable<bool>,
    pub is_editing: Observable<bool>,
    pub is_uploading: Observable<bool>,
    pub genres: Observable<Arc<Vec<Genre>>>,
}

impl ProfileScreen {
    pub fn new(services: &Services) -> Self {
        Self {
            profiles: services.profiles.clone(),
            reviews: services.reviews.clone(),
            movies: services.movies.clone(),
            cancel: CancellationToken::new(),
            profile: Observable::default(),
            is_loading: Observable::new(false),
            is_editing: Observable::new(false),
            is_uploading: Observable::new(false),
            genres: Observable::default(),
        }
    }

    /// the stored profile, then its review count recounted from the reviews
    /// themselves.
    pub async fn load_profile(&self) -> Result<()> {
        self.is_loading.set(true);
        let res = unless_disposed(&self.cancel, self.profiles.load_profile()).await;
        self.is_loading.set(false);

        let profile = match res {
            Some(r) => r?,
            None => return Ok(()),
        };
        let id = profile.id.clone();
        self.profile.set(profile);

        if let Some(count) = unless_disposed(&self.cancel, self.reviews.review_count(&id)).await {
            let count = count?;
            self.profile.update(|p| p.review_count = count);
        }

        Ok(())
    }

    pub fn toggle_editing(&self) { self.is_editing.update(|e| *e = !*e) }

    /// stays in edit mode when the write fails.
    pub async fn save_profile(&self) -> Result<()> {
        let profile = self.profile.get();

        if let Some(res) = unless_disposed(&self.cancel, self.profiles.update_profile(&profile)).await
        {
            res?;
            self.is_editing.set(false);
        }

        Ok(())
    }

    pub fn update_about(&self, about: impl Into<String>) {
        let about = about.into();
        self.profile.update(|p| p.about = about);
    }

    pub fn update_phone(&self, phone: impl Into<String>) {
        let phone = phone.into();
        self.profile.update(|p| p.phone = phone);
    }

    pub fn update_birthday(&self, birthday: impl Into<String>) {
        let birthday = birthday.into();
        self.profile.update(|p| p.birthday = birthday);
    }

    pub fn update_gender(&self, gender: impl Into<String>) {
        let gender = gender.into();
        self.profile.update(|p| p.gender = gender);
    }

    pub fn update_favorite_genres(&self, genres: Vec<GenreId>) {
        self.profile.update(|p| p.favorite_genres = genres);
    }

    pub async fn load_genres(&self) -> Result<()> {
        if let Some(res) = unless_disposed(&self.cancel, self.movies.load_genres()).await {
            self.genres.set(res?);
        }

        Ok(())
    }

    pub async fn sign_out(&self) {
        self.profiles.sign_out().await;
        self.profile.set(UserProfile::default());
        self.is_editing.set(false);
    }

    pub async fn delete_account(&self) -> Result<()> {
        self.profiles.delete_account().await?;

        self.profile.set(UserProfile::default());
        self.is_editing.set(false);

        Ok(())
    }

    /// uploads the image, points the profile at it and saves.
    pub async fn upload_photo(&self, image: &[u8]) -> Result<()> {
        self.is_uploading.set(true);
        let res = unless_disposed(&self.cancel, self.profiles.upload_photo(image)).await;

        let url = match res {
            Some(Ok(url)) => url,
            Some(Err(e)) => {
                self.is_uploading.set(false);
                return Err(e.into());
            },
            None => {
                self.is_uploading.set(false);
                return Ok(());
            },
        };

        self.profile.update(|p| p.photo_url = url);
        let saved = self.profiles.update_profile(&self.profile.get()).await;
        self.is_uploading.set(false);

        saved.map_err(Into::into)
    }

    pub fn dispose(&self) { self.cancel.cancel() }
}
