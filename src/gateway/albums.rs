use async_trait::async_trait;
use reqwest::Method;

use crate::error::ClientResult;
use crate::gateway::HttpGateway;
use crate::models::{Album, CreateAlbumRequest, ShareAlbumRequest, UpdateAlbumRequest};

#[async_trait]
pub trait AlbumsApi: Send + Sync {
    async fn list_albums(&self) -> ClientResult<Vec<Album>>;
    async fn get_album(&self, id: &str) -> ClientResult<Album>;
    async fn get_shared_album(&self, share_token: &str) -> ClientResult<Album>;
    async fn create_album(&self, request: &CreateAlbumRequest) -> ClientResult<Album>;
    async fn update_album(&self, id: &str, request: &UpdateAlbumRequest) -> ClientResult<Album>;
    async fn share_album(&self, id: &str, is_public: bool) -> ClientResult<Album>;
    async fn delete_album(&self, id: &str) -> ClientResult<()>;
}

#[async_trait]
impl AlbumsApi for HttpGateway {
    async fn list_albums(&self) -> ClientResult<Vec<Album>> {
        self.get_json(&["albums"], &[]).await
    }

    async fn get_album(&self, id: &str) -> ClientResult<Album> {
        self.get_json(&["albums", id], &[]).await
    }

    async fn get_shared_album(&self, share_token: &str) -> ClientResult<Album> {
        self.get_json(&["albums", "shared", share_token], &[]).await
    }

    async fn create_album(&self, request: &CreateAlbumRequest) -> ClientResult<Album> {
        self.send_json(Method::POST, &["albums"], request).await
    }

    async fn update_album(&self, id: &str, request: &UpdateAlbumRequest) -> ClientResult<Album> {
        self.send_json(Method::PATCH, &["albums", id], request).await
    }

    async fn share_album(&self, id: &str, is_public: bool) -> ClientResult<Album> {
        let body = ShareAlbumRequest { is_public };
        self.send_json(Method::PATCH, &["albums", id, "share"], &body)
            .await
    }

    async fn delete_album(&self, id: &str) -> ClientResult<()> {
        self.send_without_reply::<()>(Method::DELETE, &["albums", id], None)
            .await
    }
}
