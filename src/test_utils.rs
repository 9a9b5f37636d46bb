#![cfg(test)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, ClientResult};
use crate::gateway::{AlbumsApi, AuthApi, CredentialProvider, PhotosApi, UsersApi};
use crate::models::{
    Album, AuthResponse, ChangePasswordRequest, CreateAlbumRequest, DeletePhotosRequest,
    ForgotPasswordRequest, LoginRequest, MessageResponse, NewPhoto, PageRequest, Photo, PhotoPage,
    RegisterRequest, ResetPasswordRequest, SortOrder, UpdateAlbumRequest, UpdatePhotoRequest,
    UpdateProfileRequest, User,
};
use crate::upload::UploadFile;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn sample_user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: format!("User {}", id),
        provider: None,
        profile_picture: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn new_photo(filename: &str, title: &str) -> NewPhoto {
    NewPhoto {
        title: title.to_string(),
        description: None,
        acquisition_date: None,
        filename: filename.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xFF, 0xD8, 0xFF],
    }
}

pub fn upload_file(filename: &str) -> UploadFile {
    UploadFile::new(filename, vec![0xFF, 0xD8, 0xFF])
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read test server address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });
    format!("http://{}", addr)
}

/// An address nothing listens on.
pub fn unused_address() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener.local_addr().expect("Failed to read address")
}

/// Fixed token that counts how often the gateway reported it as rejected.
pub struct StaticCredentials {
    token: Option<String>,
    unauthorized: AtomicUsize,
}

impl StaticCredentials {
    pub fn with_token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
            unauthorized: AtomicUsize::new(0),
        })
    }

    pub fn anonymous() -> Arc<Self> {
        Arc::new(Self {
            token: None,
            unauthorized: AtomicUsize::new(0),
        })
    }

    pub fn unauthorized_calls(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn on_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::SeqCst);
    }
}

struct UploadFailure {
    /// `None` fails forever.
    remaining: Option<usize>,
    status: u16,
    message: String,
}

/// In-memory stand-in for the REST API.
#[derive(Default)]
pub struct FakeGateway {
    albums: Mutex<Vec<Album>>,
    photos: Mutex<Vec<Photo>>,
    user: Mutex<Option<User>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    next_failures: Mutex<HashMap<&'static str, ClientError>>,
    upload_failures: Mutex<HashMap<String, UploadFailure>>,
    upload_attempts: Mutex<HashMap<String, usize>>,
    cancel_on_upload: Mutex<Option<(String, CancellationToken)>>,
    sequence: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_album(&self, id: &str, title: &str) {
        lock(&self.albums).push(Album {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            photos: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            user_id: Some("u1".to_string()),
            is_public: false,
            share_token: None,
        });
    }

    /// The next call of `operation` fails with `error`.
    pub fn fail_next(&self, operation: &'static str, error: ClientError) {
        lock(&self.next_failures).insert(operation, error);
    }

    pub fn always_fail_upload(&self, filename: &str, status: u16, message: &str) {
        self.script_upload(filename, None, status, message);
    }

    pub fn fail_upload_times(&self, filename: &str, times: usize, status: u16, message: &str) {
        self.script_upload(filename, Some(times), status, message);
    }

    fn script_upload(&self, filename: &str, remaining: Option<usize>, status: u16, message: &str) {
        lock(&self.upload_failures).insert(
            filename.to_string(),
            UploadFailure {
                remaining,
                status,
                message: message.to_string(),
            },
        );
    }

    /// Cancels `token` while the upload of `filename` is in flight.
    pub fn cancel_during_upload(&self, filename: &str, token: CancellationToken) {
        *lock(&self.cancel_on_upload) = Some((filename.to_string(), token));
    }

    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    pub fn upload_attempts(&self, filename: &str) -> usize {
        lock(&self.upload_attempts).get(filename).copied().unwrap_or(0)
    }

    fn hit(&self, operation: &'static str) -> ClientResult<()> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        match lock(&self.next_failures).remove(operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn find_album(&self, id: &str) -> ClientResult<Album> {
        lock(&self.albums)
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ClientError::from_status(404, "Album not found".to_string()))
    }

    fn paginate(mut photos: Vec<Photo>, page: &PageRequest) -> PhotoPage {
        if page.order == SortOrder::Desc {
            photos.reverse();
        }
        let total = photos.len() as u64;
        let skip = ((page.page - 1) * page.limit) as usize;
        PhotoPage {
            photos: photos.into_iter().skip(skip).take(page.limit as usize).collect(),
            total,
            page: page.page,
            limit: page.limit,
        }
    }

    fn check_upload(&self, filename: &str) -> ClientResult<()> {
        *lock(&self.upload_attempts)
            .entry(filename.to_string())
            .or_insert(0) += 1;

        let mut failures = lock(&self.upload_failures);
        let Some(failure) = failures.get_mut(filename) else {
            return Ok(());
        };
        match failure.remaining {
            Some(0) => Ok(()),
            Some(ref mut left) => {
                *left -= 1;
                Err(ClientError::from_status(failure.status, failure.message.clone()))
            }
            None => Err(ClientError::from_status(failure.status, failure.message.clone())),
        }
    }

    fn current_user(&self) -> User {
        lock(&self.user).clone().unwrap_or_else(|| sample_user("u1"))
    }
}

#[async_trait]
impl AlbumsApi for FakeGateway {
    async fn list_albums(&self) -> ClientResult<Vec<Album>> {
        self.hit("list_albums")?;
        Ok(lock(&self.albums).clone())
    }

    async fn get_album(&self, id: &str) -> ClientResult<Album> {
        self.hit("get_album")?;
        self.find_album(id)
    }

    async fn get_shared_album(&self, share_token: &str) -> ClientResult<Album> {
        self.hit("get_shared_album")?;
        lock(&self.albums)
            .iter()
            .find(|a| a.is_public && a.share_token.as_deref() == Some(share_token))
            .cloned()
            .ok_or_else(|| ClientError::from_status(404, "Album not found".to_string()))
    }

    async fn create_album(&self, request: &CreateAlbumRequest) -> ClientResult<Album> {
        self.hit("create_album")?;
        let album = Album {
            id: self.next_id("a"),
            title: request.title.clone(),
            description: request.description.clone(),
            photos: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            user_id: Some("u1".to_string()),
            is_public: false,
            share_token: None,
        };
        lock(&self.albums).push(album.clone());
        Ok(album)
    }

    async fn update_album(&self, id: &str, request: &UpdateAlbumRequest) -> ClientResult<Album> {
        self.hit("update_album")?;
        let mut albums = lock(&self.albums);
        let album = albums
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ClientError::from_status(404, "Album not found".to_string()))?;
        if let Some(title) = &request.title {
            album.title = title.clone();
        }
        if let Some(description) = &request.description {
            album.description = Some(description.clone());
        }
        Ok(album.clone())
    }

    async fn share_album(&self, id: &str, is_public: bool) -> ClientResult<Album> {
        self.hit("share_album")?;
        let mut albums = lock(&self.albums);
        let album = albums
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ClientError::from_status(404, "Album not found".to_string()))?;
        album.is_public = is_public;
        album.share_token = is_public.then(|| format!("share-{}", id));
        Ok(album.clone())
    }

    async fn delete_album(&self, id: &str) -> ClientResult<()> {
        self.hit("delete_album")?;
        lock(&self.albums).retain(|a| a.id != id);
        lock(&self.photos).retain(|p| p.album_id != id);
        Ok(())
    }
}

#[async_trait]
impl PhotosApi for FakeGateway {
    async fn list_photos(&self, album_id: &str, page: &PageRequest) -> ClientResult<PhotoPage> {
        self.hit("list_photos")?;
        let photos: Vec<Photo> = lock(&self.photos)
            .iter()
            .filter(|p| p.album_id == album_id)
            .cloned()
            .collect();
        Ok(Self::paginate(photos, page))
    }

    async fn get_photo(&self, album_id: &str, photo_id: &str) -> ClientResult<Photo> {
        self.hit("get_photo")?;
        lock(&self.photos)
            .iter()
            .find(|p| p.album_id == album_id && p.id == photo_id)
            .cloned()
            .ok_or_else(|| ClientError::from_status(404, "Photo not found".to_string()))
    }

    async fn create_photo(&self, album_id: &str, photo: &NewPhoto) -> ClientResult<Photo> {
        self.hit("create_photo")?;
        if let Some((filename, token)) = lock(&self.cancel_on_upload).as_ref() {
            if *filename == photo.filename {
                token.cancel();
            }
        }
        self.check_upload(&photo.filename)?;
        self.find_album(album_id)?;

        let created = Photo {
            id: self.next_id("p"),
            title: photo.title.clone(),
            description: photo.description.clone(),
            filename: photo.filename.clone(),
            size: photo.bytes.len() as u64,
            acquisition_date: photo.acquisition_date.clone(),
            dominant_color: Some("#336699".to_string()),
            album_id: album_id.to_string(),
            url: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        lock(&self.photos).push(created.clone());
        Ok(created)
    }

    async fn update_photo(
        &self,
        album_id: &str,
        photo_id: &str,
        request: &UpdatePhotoRequest,
    ) -> ClientResult<Photo> {
        self.hit("update_photo")?;
        let mut photos = lock(&self.photos);
        let photo = photos
            .iter_mut()
            .find(|p| p.album_id == album_id && p.id == photo_id)
            .ok_or_else(|| ClientError::from_status(404, "Photo not found".to_string()))?;
        if let Some(title) = &request.title {
            photo.title = title.clone();
        }
        if let Some(description) = &request.description {
            photo.description = Some(description.clone());
        }
        if let Some(date) = &request.acquisition_date {
            photo.acquisition_date = Some(date.clone());
        }
        Ok(photo.clone())
    }

    async fn delete_photo(&self, album_id: &str, photo_id: &str) -> ClientResult<()> {
        self.hit("delete_photo")?;
        lock(&self.photos).retain(|p| !(p.album_id == album_id && p.id == photo_id));
        Ok(())
    }

    async fn delete_photos(&self, album_id: &str, request: &DeletePhotosRequest) -> ClientResult<()> {
        self.hit("delete_photos")?;
        lock(&self.photos).retain(|p| !(p.album_id == album_id && request.ids.contains(&p.id)));
        Ok(())
    }

    async fn search_photos(&self, query: &str, page: &PageRequest) -> ClientResult<PhotoPage> {
        self.hit("search_photos")?;
        let needle = query.to_lowercase();
        let photos: Vec<Photo> = lock(&self.photos)
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.filename.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        Ok(Self::paginate(photos, page))
    }
}

#[async_trait]
impl AuthApi for FakeGateway {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        self.hit("login")?;
        let mut user = self.current_user();
        user.email = request.email.clone();
        Ok(AuthResponse {
            access_token: "fake-token".to_string(),
            user,
        })
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        self.hit("register")?;
        let mut user = self.current_user();
        user.email = request.email.clone();
        user.name = request.name.clone();
        *lock(&self.user) = Some(user.clone());
        Ok(AuthResponse {
            access_token: "fake-token".to_string(),
            user,
        })
    }

    async fn forgot_password(&self, _request: &ForgotPasswordRequest) -> ClientResult<MessageResponse> {
        self.hit("forgot_password")?;
        Ok(MessageResponse {
            message: "Reset e-mail sent".to_string(),
        })
    }

    async fn reset_password(&self, _request: &ResetPasswordRequest) -> ClientResult<MessageResponse> {
        self.hit("reset_password")?;
        Ok(MessageResponse {
            message: "Password updated".to_string(),
        })
    }
}

#[async_trait]
impl UsersApi for FakeGateway {
    async fn me(&self) -> ClientResult<User> {
        self.hit("me")?;
        Ok(self.current_user())
    }

    async fn update_me(&self, request: &UpdateProfileRequest) -> ClientResult<User> {
        self.hit("update_me")?;
        let mut user = self.current_user();
        if let Some(name) = &request.name {
            user.name = name.clone();
        }
        if let Some(email) = &request.email {
            user.email = email.clone();
        }
        *lock(&self.user) = Some(user.clone());
        Ok(user)
    }

    async fn change_password(&self, _request: &ChangePasswordRequest) -> ClientResult<()> {
        self.hit("change_password")
    }

    async fn delete_me(&self) -> ClientResult<()> {
        self.hit("delete_me")
    }
}
