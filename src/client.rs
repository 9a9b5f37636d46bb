use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::cache::{keys, Mutation, QueryCache, QueryKey};
use crate::constants::MIN_SEARCH_QUERY_LEN;
use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateway;
use crate::models::{
    Album, ChangePasswordRequest, CreateAlbumRequest, DeletePhotosRequest, ForgotPasswordRequest,
    LoginRequest, MessageResponse, NewPhoto, PageRequest, Photo, PhotoPage, RegisterRequest,
    ResetPasswordRequest, UpdateAlbumRequest, UpdatePhotoRequest, UpdateProfileRequest, User,
};
use crate::session::SessionStore;

/// Cached reads and invalidating writes on top of a [`Gateway`].
///
/// Reads are served from the cache while fresh. Writes go straight to the
/// gateway and, only when they succeed, mark their [`Mutation`]'s keys
/// stale. Nothing is updated optimistically.
pub struct QueryClient<G> {
    gateway: Arc<G>,
    session: Arc<SessionStore>,
    cache: QueryCache,
    /// Session generation the cached entries belong to.
    cache_generation: AtomicU64,
}

impl<G: Gateway> QueryClient<G> {
    pub fn new(gateway: Arc<G>, session: Arc<SessionStore>) -> Self {
        let cache_generation = AtomicU64::new(session.generation());
        Self {
            gateway,
            session,
            cache: QueryCache::new(),
            cache_generation,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Drops every entry cached for a previous identity, including after a
    /// forced logout on a rejected token.
    fn sync_identity(&self) -> u64 {
        let current = self.session.generation();
        let previous = self.cache_generation.swap(current, Ordering::SeqCst);
        if previous != current {
            debug!("Session changed, dropping {} cache entries", self.cache.len());
            self.cache.clear();
        }
        current
    }

    async fn query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> ClientResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let generation = self.sync_identity();
        if let Some(value) = self.cache.fresh(&key) {
            debug!("Cache hit {}", key);
            return Ok(serde_json::from_value(value)?);
        }

        let value = fetch().await?;
        if self.session.generation() == generation {
            self.cache.store(key, serde_json::to_value(&value)?);
        }
        Ok(value)
    }

    fn settle<T>(&self, mutation: Mutation, outcome: ClientResult<T>) -> ClientResult<T> {
        match outcome {
            Ok(value) => {
                let count = self.cache.invalidate_all(&mutation.invalidation_set());
                debug!("{} succeeded, {} cache entries stale", mutation, count);
                Ok(value)
            }
            Err(e) => {
                warn!("{} failed: {}", mutation, e);
                Err(e)
            }
        }
    }

    pub async fn albums(&self) -> ClientResult<Vec<Album>> {
        self.query(keys::albums(), || self.gateway.list_albums())
            .await
    }

    pub async fn album(&self, id: &str) -> ClientResult<Album> {
        self.query(keys::album(id), || self.gateway.get_album(id))
            .await
    }

    pub async fn shared_album(&self, share_token: &str) -> ClientResult<Album> {
        self.query(keys::shared_album(share_token), || {
            self.gateway.get_shared_album(share_token)
        })
        .await
    }

    pub async fn photos(&self, album_id: &str, page: PageRequest) -> ClientResult<PhotoPage> {
        page.validate()?;
        self.query(keys::album_photos_page(album_id, &page), || {
            self.gateway.list_photos(album_id, &page)
        })
        .await
    }

    pub async fn photo(&self, album_id: &str, photo_id: &str) -> ClientResult<Photo> {
        self.query(keys::photo(album_id, photo_id), || {
            self.gateway.get_photo(album_id, photo_id)
        })
        .await
    }

    pub async fn search_photos(&self, query: &str, page: PageRequest) -> ClientResult<PhotoPage> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            return Err(ClientError::Validation(format!(
                "Search needs at least {} characters",
                MIN_SEARCH_QUERY_LEN
            )));
        }
        page.validate()?;
        self.query(keys::photo_search(query, &page), || {
            self.gateway.search_photos(query, &page)
        })
        .await
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.query(keys::user_me(), || self.gateway.me()).await
    }

    pub async fn create_album(&self, request: CreateAlbumRequest) -> ClientResult<Album> {
        request.validate()?;
        let outcome = self.gateway.create_album(&request).await;
        self.settle(Mutation::CreateAlbum, outcome)
    }

    pub async fn update_album(&self, id: &str, request: UpdateAlbumRequest) -> ClientResult<Album> {
        request.validate()?;
        let outcome = self.gateway.update_album(id, &request).await;
        self.settle(
            Mutation::UpdateAlbum {
                album_id: id.to_string(),
            },
            outcome,
        )
    }

    pub async fn share_album(&self, id: &str, is_public: bool) -> ClientResult<Album> {
        let outcome = self.gateway.share_album(id, is_public).await;
        self.settle(
            Mutation::ShareAlbum {
                album_id: id.to_string(),
            },
            outcome,
        )
    }

    pub async fn delete_album(&self, id: &str) -> ClientResult<()> {
        let outcome = self.gateway.delete_album(id).await;
        self.settle(
            Mutation::DeleteAlbum {
                album_id: id.to_string(),
            },
            outcome,
        )
    }

    pub async fn create_photo(&self, album_id: &str, photo: &NewPhoto) -> ClientResult<Photo> {
        photo.validate()?;
        let outcome = self.gateway.create_photo(album_id, photo).await;
        self.settle(
            Mutation::CreatePhoto {
                album_id: album_id.to_string(),
            },
            outcome,
        )
    }

    pub async fn update_photo(
        &self,
        album_id: &str,
        photo_id: &str,
        request: UpdatePhotoRequest,
    ) -> ClientResult<Photo> {
        request.validate()?;
        let outcome = self.gateway.update_photo(album_id, photo_id, &request).await;
        self.settle(
            Mutation::UpdatePhoto {
                album_id: album_id.to_string(),
            },
            outcome,
        )
    }

    pub async fn delete_photo(&self, album_id: &str, photo_id: &str) -> ClientResult<()> {
        let outcome = self.gateway.delete_photo(album_id, photo_id).await;
        self.settle(
            Mutation::DeletePhoto {
                album_id: album_id.to_string(),
            },
            outcome,
        )
    }

    pub async fn delete_photos(&self, album_id: &str, ids: Vec<String>) -> ClientResult<()> {
        let request = DeletePhotosRequest { ids };
        request.validate()?;
        let outcome = self.gateway.delete_photos(album_id, &request).await;
        self.settle(
            Mutation::DeletePhotos {
                album_id: album_id.to_string(),
            },
            outcome,
        )
    }

    pub async fn login(&self, request: LoginRequest) -> ClientResult<User> {
        request.validate()?;
        let response = self.gateway.login(&request).await?;
        self.sign_in(response.user.clone(), response.access_token);
        Ok(response.user)
    }

    pub async fn register(&self, request: RegisterRequest) -> ClientResult<User> {
        request.validate()?;
        let response = self.gateway.register(&request).await?;
        self.sign_in(response.user.clone(), response.access_token);
        Ok(response.user)
    }

    /// Finishes an OAuth sign-in from the redirect URL, which carries the
    /// token and the URL-encoded JSON user as query parameters.
    pub fn complete_oauth(&self, callback_url: &str) -> ClientResult<User> {
        let url = reqwest::Url::parse(callback_url)
            .map_err(|e| ClientError::Validation(format!("Invalid callback URL: {}", e)))?;

        let mut token = None;
        let mut user_param = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "token" => token = Some(value.into_owned()),
                "user" => user_param = Some(value.into_owned()),
                _ => {}
            }
        }

        let (token, user_param) = match (token, user_param) {
            (Some(t), Some(u)) if !t.is_empty() => (t, u),
            _ => {
                return Err(ClientError::Validation(
                    "Callback URL is missing token or user".to_string(),
                ))
            }
        };

        let user: User = serde_json::from_str(&user_param)
            .map_err(|e| ClientError::Validation(format!("Invalid user in callback: {}", e)))?;
        self.sign_in(user.clone(), token);
        Ok(user)
    }

    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> ClientResult<MessageResponse> {
        request.validate()?;
        self.gateway.forgot_password(&request).await
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> ClientResult<MessageResponse> {
        request.validate()?;
        self.gateway.reset_password(&request).await
    }

    pub async fn change_password(&self, request: ChangePasswordRequest) -> ClientResult<()> {
        request.validate()?;
        self.gateway.change_password(&request).await
    }

    pub async fn update_profile(&self, request: UpdateProfileRequest) -> ClientResult<User> {
        request.validate()?;
        let outcome = self.gateway.update_me(&request).await;
        let updated = self.settle(Mutation::UpdateProfile, outcome)?;

        let is_current = self
            .session
            .user()
            .map(|user| user.id == updated.id)
            .unwrap_or(false);
        if is_current {
            self.session.update_user(updated.clone());
        }
        Ok(updated)
    }

    pub async fn delete_account(&self) -> ClientResult<()> {
        self.gateway.delete_me().await?;
        info!("Account deleted");
        self.logout();
        Ok(())
    }

    fn sign_in(&self, user: User, token: String) {
        self.cache.clear();
        self.session.set_auth(user, token);
        self.sync_identity();
    }

    pub fn logout(&self) {
        self.session.logout();
        self.cache.clear();
        self.sync_identity();
    }
}
