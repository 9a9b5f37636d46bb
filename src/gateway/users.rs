use async_trait::async_trait;
use reqwest::Method;

use crate::error::ClientResult;
use crate::gateway::HttpGateway;
use crate::models::{ChangePasswordRequest, UpdateProfileRequest, User};

#[async_trait]
pub trait UsersApi: Send + Sync {
    async fn me(&self) -> ClientResult<User>;
    async fn update_me(&self, request: &UpdateProfileRequest) -> ClientResult<User>;
    async fn change_password(&self, request: &ChangePasswordRequest) -> ClientResult<()>;
    async fn delete_me(&self) -> ClientResult<()>;
}

#[async_trait]
impl UsersApi for HttpGateway {
    async fn me(&self) -> ClientResult<User> {
        self.get_json(&["users", "me"], &[]).await
    }

    async fn update_me(&self, request: &UpdateProfileRequest) -> ClientResult<User> {
        self.send_json(Method::PATCH, &["users", "me"], request).await
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> ClientResult<()> {
        self.send_without_reply(Method::PATCH, &["users", "me", "password"], Some(request))
            .await
    }

    async fn delete_me(&self) -> ClientResult<()> {
        self.send_without_reply::<()>(Method::DELETE, &["users", "me"], None)
            .await
    }
}
