mod albums;
mod auth;
mod photos;
mod users;

pub use albums::AlbumsApi;
pub use auth::AuthApi;
pub use photos::PhotosApi;
pub use users::UsersApi;

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::ApiConfig;
use crate::constants::GENERIC_ERROR_MESSAGE;
use crate::error::{ClientError, ClientResult};

/// Supplies the bearer token for outgoing requests and is told when the
/// server rejects it.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;

    /// Called on a 401 response, only when the request carried a token.
    fn on_unauthorized(&self);
}

/// Everything the REST API offers.
pub trait Gateway: AlbumsApi + PhotosApi + AuthApi + UsersApi {}

impl<T> Gateway for T where T: AlbumsApi + PhotosApi + AuthApi + UsersApi {}

pub struct HttpGateway {
    client: reqwest::Client,
    api_root: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialProvider>) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .build()?;

        let root = config.api_root();
        let api_root = Url::parse(&root)
            .map_err(|e| ClientError::Config(format!("Invalid API URL {}: {}", root, e)))?;

        Ok(Self {
            client,
            api_root,
            credentials,
        })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Where the browser is sent to start an OAuth sign-in.
    pub fn oauth_url(&self, provider: &str) -> ClientResult<Url> {
        self.endpoint(&["auth", provider])
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("API URL cannot be a base: {}", self.api_root)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        Ok(self.client.request(method, self.endpoint(segments)?))
    }

    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let token = self
            .credentials
            .bearer_token()
            .map(|t| clean_token(&t).to_string())
            .filter(|t| !t.is_empty());

        let builder = match &token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let request = builder.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let start = Instant::now();
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                // Connectivity failures never touch the session
                let err = ClientError::from_transport(e);
                error!("{} {} failed: {}", method, path, err);
                return Err(err);
            }
        };

        let status = response.status();
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let log_line = format!("{} {} {} {:05.2}ms", method, path, status.as_u16(), duration_ms);
        match status.as_u16() {
            400..=499 => warn!("{}", log_line),
            500..=599 => error!("{}", log_line),
            _ => debug!("{}", log_line),
        }

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());

        if status == StatusCode::UNAUTHORIZED {
            if token.is_some() {
                info!("Token rejected on {} {}", method, path);
                self.credentials.on_unauthorized();
            } else {
                debug!("Anonymous request to {} {} was rejected", method, path);
            }
        }

        Err(ClientError::from_status(status.as_u16(), message))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let bytes = response.bytes().await.map_err(ClientError::from_transport)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let builder = self.request(Method::GET, segments)?.query(query);
        let response = self.send(builder).await?;
        Self::read_json(response).await
    }

    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(method, segments)?.json(body);
        let response = self.send(builder).await?;
        Self::read_json(response).await
    }

    pub(crate) async fn send_without_reply<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> ClientResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut builder = self.request(method, segments)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await?;
        Ok(())
    }

    pub(crate) async fn send_multipart<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: reqwest::multipart::Form,
    ) -> ClientResult<T> {
        let builder = self.request(Method::POST, segments)?.multipart(form);
        let response = self.send(builder).await?;
        Self::read_json(response).await
    }
}

fn clean_token(token: &str) -> &str {
    token.strip_prefix("Bearer ").unwrap_or(token).trim()
}

/// Pulls a human readable message out of an error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for field in ["message", "detail", "error"] {
        match value.get(field) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.clone());
            }
            Some(serde_json::Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                if !parts.is_empty() {
                    return Some(parts.join(", "));
                }
            }
            _ => {}
        }
    }
    None
}
