use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;

use crate::error::ClientResult;
use crate::gateway::HttpGateway;
use crate::models::{DeletePhotosRequest, NewPhoto, PageRequest, Photo, PhotoPage, UpdatePhotoRequest};

#[async_trait]
pub trait PhotosApi: Send + Sync {
    async fn list_photos(&self, album_id: &str, page: &PageRequest) -> ClientResult<PhotoPage>;
    async fn get_photo(&self, album_id: &str, photo_id: &str) -> ClientResult<Photo>;
    async fn create_photo(&self, album_id: &str, photo: &NewPhoto) -> ClientResult<Photo>;
    async fn update_photo(
        &self,
        album_id: &str,
        photo_id: &str,
        request: &UpdatePhotoRequest,
    ) -> ClientResult<Photo>;
    async fn delete_photo(&self, album_id: &str, photo_id: &str) -> ClientResult<()>;
    async fn delete_photos(&self, album_id: &str, request: &DeletePhotosRequest) -> ClientResult<()>;
    async fn search_photos(&self, query: &str, page: &PageRequest) -> ClientResult<PhotoPage>;
}

fn photo_form(photo: &NewPhoto) -> ClientResult<Form> {
    let file = Part::bytes(photo.bytes.clone())
        .file_name(photo.filename.clone())
        .mime_str(&photo.content_type)?;

    let mut form = Form::new().part("file", file).text("title", photo.title.clone());
    if let Some(description) = photo.description.as_ref().filter(|d| !d.is_empty()) {
        form = form.text("description", description.clone());
    }
    if let Some(date) = photo.acquisition_date.as_ref().filter(|d| !d.is_empty()) {
        form = form.text("acquisitionDate", date.clone());
    }
    Ok(form)
}

#[async_trait]
impl PhotosApi for HttpGateway {
    async fn list_photos(&self, album_id: &str, page: &PageRequest) -> ClientResult<PhotoPage> {
        self.get_json(&["albums", album_id, "photos"], &page.query_pairs())
            .await
    }

    async fn get_photo(&self, album_id: &str, photo_id: &str) -> ClientResult<Photo> {
        self.get_json(&["albums", album_id, "photos", photo_id], &[])
            .await
    }

    async fn create_photo(&self, album_id: &str, photo: &NewPhoto) -> ClientResult<Photo> {
        let form = photo_form(photo)?;
        self.send_multipart(&["albums", album_id, "photos"], form)
            .await
    }

    async fn update_photo(
        &self,
        album_id: &str,
        photo_id: &str,
        request: &UpdatePhotoRequest,
    ) -> ClientResult<Photo> {
        self.send_json(Method::PATCH, &["albums", album_id, "photos", photo_id], request)
            .await
    }

    async fn delete_photo(&self, album_id: &str, photo_id: &str) -> ClientResult<()> {
        self.send_without_reply::<()>(Method::DELETE, &["albums", album_id, "photos", photo_id], None)
            .await
    }

    async fn delete_photos(&self, album_id: &str, request: &DeletePhotosRequest) -> ClientResult<()> {
        self.send_without_reply(Method::DELETE, &["albums", album_id, "photos", "batch"], Some(request))
            .await
    }

    async fn search_photos(&self, query: &str, page: &PageRequest) -> ClientResult<PhotoPage> {
        let mut params = vec![("q", query.to_string())];
        params.extend(page.query_pairs());
        self.get_json(&["photos", "search"], &params).await
    }
}
