//! Typed HTTP client for the `/api/v1` surface.

use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use shared::{
    ActivityDay, ActivityEntry, ApiResponse, Cattle, CattlePatch, CreateActivityInput,
    CreateCattleInput, CreateMilkRecordInput, HealthStatus, ImageInfo, ImageUpload, MilkRecord,
    MilkSummary,
};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const USER_HEADER: &str = "X-User";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    /// Server root, e.g. `http://localhost:3000`.
    base_url: String,
    api_key: String,
    user: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::builder().build()?,
            base_url: base_url.to_string(),
            api_key: api_key.into(),
            user: None,
        })
    }

    /// Attribute mutations to `user` through the `X-User` header
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/v1{}", self.base_url, path);
        debug!("{} {}", method, url);
        let builder = self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key);
        match &self.user {
            Some(user) => builder.header(USER_HEADER, user),
            None => builder,
        }
    }

    async fn envelope<T: DeserializeOwned>(response: Response) -> ClientResult<ApiResponse<T>> {
        let status = response.status();
        let text = response.text().await?;
        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) => {
                return Err(ClientError::Api {
                    status,
                    message: text,
                })
            }
        };
        if !status.is_success() || !envelope.success {
            let message = envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| status.to_string());
            return Err(ClientError::Api { status, message });
        }
        Ok(envelope)
    }

    async fn data<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> ClientResult<T> {
        let response = builder.send().await?;
        Self::envelope::<T>(response)
            .await?
            .data
            .ok_or_else(|| ClientError::MissingData(what.to_string()))
    }

    async fn unit(&self, builder: RequestBuilder) -> ClientResult<()> {
        let response = builder.send().await?;
        Self::envelope::<serde_json::Value>(response).await?;
        Ok(())
    }

    fn json<B: Serialize>(&self, method: Method, path: &str, body: &B) -> RequestBuilder {
        self.request(method, path).json(body)
    }

    pub async fn list_cattle(&self) -> ClientResult<Vec<Cattle>> {
        self.data(self.request(Method::GET, "/cattle"), "GET /cattle").await
    }

    pub async fn search_cattle(&self, term: &str) -> ClientResult<Vec<Cattle>> {
        let builder = self.request(Method::GET, "/cattle").query(&[("search", term)]);
        self.data(builder, "GET /cattle").await
    }

    pub async fn get_cattle(&self, id: &str) -> ClientResult<Cattle> {
        self.data(self.request(Method::GET, &format!("/cattle/{id}")), "GET /cattle/{id}")
            .await
    }

    pub async fn create_cattle(&self, input: &CreateCattleInput) -> ClientResult<Cattle> {
        info!("Creating cattle {:?}", input.name);
        self.data(self.json(Method::POST, "/cattle", input), "POST /cattle").await
    }

    pub async fn update_cattle(&self, id: &str, patch: &CattlePatch) -> ClientResult<Cattle> {
        info!("Updating cattle {}", id);
        self.data(
            self.json(Method::PATCH, &format!("/cattle/{id}"), patch),
            "PATCH /cattle/{id}",
        )
        .await
    }

    pub async fn delete_cattle(&self, id: &str) -> ClientResult<()> {
        info!("Deleting cattle {}", id);
        self.unit(self.request(Method::DELETE, &format!("/cattle/{id}"))).await
    }

    pub async fn list_milk(&self, cow_name: Option<&str>) -> ClientResult<Vec<MilkRecord>> {
        let mut builder = self.request(Method::GET, "/milk");
        if let Some(cow) = cow_name {
            builder = builder.query(&[("cowName", cow)]);
        }
        self.data(builder, "GET /milk").await
    }

    pub async fn milk_summary(&self) -> ClientResult<MilkSummary> {
        self.data(self.request(Method::GET, "/milk/summary"), "GET /milk/summary").await
    }

    pub async fn create_milk(&self, input: &CreateMilkRecordInput) -> ClientResult<MilkRecord> {
        info!("Creating milk record for {:?}", input.cow_name);
        self.data(self.json(Method::POST, "/milk", input), "POST /milk").await
    }

    pub async fn delete_milk(&self, id: &str) -> ClientResult<()> {
        info!("Deleting milk record {}", id);
        self.unit(self.request(Method::DELETE, &format!("/milk/{id}"))).await
    }

    pub async fn list_activities(&self) -> ClientResult<Vec<ActivityEntry>> {
        self.data(self.request(Method::GET, "/activities"), "GET /activities").await
    }

    pub async fn grouped_activities(&self, tz_offset_minutes: i32) -> ClientResult<Vec<ActivityDay>> {
        let builder = self
            .request(Method::GET, "/activities/grouped")
            .query(&[("tzOffsetMinutes", tz_offset_minutes)]);
        self.data(builder, "GET /activities/grouped").await
    }

    pub async fn create_activity(&self, input: &CreateActivityInput) -> ClientResult<ActivityEntry> {
        self.data(self.json(Method::POST, "/activities", input), "POST /activities")
            .await
    }

    pub async fn upload_image(
        &self,
        file_name: &str,
        mimetype: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<ImageUpload> {
        info!("Uploading image {} ({} bytes)", file_name, bytes.len());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mimetype)?;
        let form = multipart::Form::new().part("file", part);
        self.data(
            self.request(Method::POST, "/images/upload").multipart(form),
            "POST /images/upload",
        )
        .await
    }

    pub async fn image_info(&self, filename: &str) -> ClientResult<ImageInfo> {
        self.data(
            self.request(Method::GET, &format!("/images/{filename}")),
            "GET /images/{filename}",
        )
        .await
    }

    pub async fn delete_image(&self, filename: &str) -> ClientResult<()> {
        self.unit(self.request(Method::DELETE, &format!("/images/{filename}")))
            .await
    }

    /// Health check. A degraded server still yields a status.
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_validation() {
        assert!(ApiClient::new("http://localhost:3000/", "key").is_ok());
        assert!(matches!(
            ApiClient::new("localhost:3000", "key"),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_with_user() {
        let client = ApiClient::new("http://localhost:3000", "key").unwrap().with_user("Lazarus");
        assert_eq!(client.user(), Some("Lazarus"));
        assert_eq!(client.base_url, "http://localhost:3000");
    }
}
