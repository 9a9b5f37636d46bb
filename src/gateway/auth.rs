use async_trait::async_trait;
use reqwest::Method;

use crate::error::ClientResult;
use crate::gateway::HttpGateway;
use crate::models::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    ResetPasswordRequest,
};

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse>;
    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse>;
    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> ClientResult<MessageResponse>;
    async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<MessageResponse>;
}

#[async_trait]
impl AuthApi for HttpGateway {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        self.send_json(Method::POST, &["auth", "login"], request).await
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        self.send_json(Method::POST, &["auth", "register"], request).await
    }

    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> ClientResult<MessageResponse> {
        self.send_json(Method::POST, &["auth", "forgot-password"], request)
            .await
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<MessageResponse> {
        self.send_json(Method::POST, &["auth", "reset-password"], request)
            .await
    }
}
