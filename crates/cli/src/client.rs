//! API client for communicating with the fare server

use anyhow::{Context, Result};
use fare_lib::{predictor::ModelSummary, Dashboard, FareComparison, RawFeatures};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the fare server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("API error ({}, {}): {}", status, err.kind, err.error),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn predict(&self, trip: &RawFeatures) -> Result<PredictResponse> {
        self.post("api/v1/predict", trip).await
    }

    pub async fn train(&self, trip: RawFeatures, actual_fare: f64) -> Result<TrainResponse> {
        self.post("api/v1/train", &TrainRequest { trip, actual_fare })
            .await
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        self.get("api/v1/dashboard").await
    }

    pub async fn model_summary(&self) -> Result<ModelSummary> {
        self.get("api/v1/model").await
    }

    pub async fn save_model(&self) -> Result<ModelStateResponse> {
        self.post("api/v1/model/save", &serde_json::json!({})).await
    }

    pub async fn reload_model(&self) -> Result<ModelStateResponse> {
        self.post("api/v1/model/reload", &serde_json::json!({}))
            .await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub estimate: f64,
    #[serde(default)]
    pub comparison: Option<FareComparison>,
    #[serde(default)]
    pub warning: Option<String>,
    pub examples_seen: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    #[serde(flatten)]
    pub trip: RawFeatures,
    pub actual_fare: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub error: f64,
    pub examples_seen: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStateResponse {
    pub path: String,
    pub examples_seen: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}
