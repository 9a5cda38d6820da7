//! HTTP client for the recipe backend.

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    error::ClientError,
    model::{
        FeedbackRequest, FeedbackResponse, HitCount, IpInfo, Recipe, RecipeHistory,
        RecipeRequest, RecipeResponse,
    },
};

#[derive(Clone, Debug)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /api/recipe`. The backend answers failures with `{"error": ...}`
    /// and a 5xx status, so the body is read before the status is considered.
    #[instrument(skip(self, request), fields(mood = %request.mood, city = %request.city))]
    pub async fn request_recipe(&self, request: &RecipeRequest) -> Result<Recipe, ClientError> {
        let response = self
            .http
            .post(self.url("/api/recipe"))
            .json(request)
            .send()
            .await?;
        debug!(status = %response.status(), "recipe response");

        match response.json::<RecipeResponse>().await? {
            RecipeResponse::Recipe(recipe) => Ok(recipe),
            RecipeResponse::Failure { error } => Err(ClientError::Backend(error_text(error))),
        }
    }

    /// `GET /api/my-recipes/<ip_key>`. A `null` body means nothing stored yet.
    #[instrument(skip(self))]
    pub async fn my_recipes(&self, ip_key: &str) -> Result<RecipeHistory, ClientError> {
        let body: Value = self
            .http
            .get(self.url(&format!("/api/my-recipes/{ip_key}")))
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = backend_error(&body) {
            return Err(ClientError::Backend(error));
        }
        if body.is_null() {
            return Ok(RecipeHistory::new());
        }
        Ok(serde_json::from_value(body)?)
    }

    /// `GET /api/get-ip`: the caller's address as seen by the backend.
    #[instrument(skip(self))]
    pub async fn client_ip(&self) -> Result<IpInfo, ClientError> {
        let body: Value = self
            .http
            .get(self.url("/api/get-ip"))
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = backend_error(&body) {
            return Err(ClientError::Backend(error));
        }
        let info: IpInfo = serde_json::from_value(body)?;
        if info.ip().is_none() {
            return Err(ClientError::MissingIp);
        }
        Ok(info)
    }

    /// `POST /api/hit-count`: bumps the visit counter and returns the new total.
    #[instrument(skip(self))]
    pub async fn hit_count(&self) -> Result<u64, ClientError> {
        let count: HitCount = self
            .http
            .post(self.url("/api/hit-count"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(count.hit_count)
    }

    /// `POST /api/save-feedback`. Returns whether the backend accepted it.
    #[instrument(skip(self, feedback), fields(rating = %feedback.rating))]
    pub async fn save_feedback(&self, feedback: &FeedbackRequest) -> Result<bool, ClientError> {
        let response: FeedbackResponse = self
            .http
            .post(self.url("/api/save-feedback"))
            .json(feedback)
            .send()
            .await?
            .json()
            .await?;
        Ok(response.success)
    }
}

fn backend_error(body: &Value) -> Option<String> {
    body.as_object()?.get("error").cloned().map(error_text)
}

fn error_text(error: Value) -> String {
    match error {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
