//! Backend service interface.
//!
//! `TrafficApi` is the seam the controller talks through; `HttpApi` is the
//! production implementation over the monitoring backend's REST routes.
//! Responses are normalized here so the rest of the application only ever
//! sees domain types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::ApiError;
use crate::model::{
    normalize_records, CaptureEvent, CapturesResponse, ForecastReport, Period, PredictionRecord,
    PredictionResponse, RawTrafficRecord, TrafficEnvelope, TrafficRecord,
};

/// Backend services consumed by the dashboard.
#[async_trait]
pub trait TrafficApi: Send + Sync {
    /// Current reporting window, one row per client.
    async fn fetch_live(&self) -> Result<Vec<TrafficRecord>, ApiError>;

    /// Aggregate over the given window, one row per client.
    async fn fetch_historical(&self, period: Period) -> Result<Vec<TrafficRecord>, ApiError>;

    /// Recent capture rows for one client, newest first.
    async fn fetch_captures(&self, client_ip: &str, limit: usize)
        -> Result<Vec<CaptureEvent>, ApiError>;

    /// Latest per-protocol snapshot for one client.
    async fn fetch_client_protocols(&self, client_ip: &str) -> Result<TrafficRecord, ApiError>;

    /// Triggers a classifier run for one client.
    async fn run_prediction(&self, client_ip: &str) -> Result<(), ApiError>;

    /// Stored classifier results for one client, newest first.
    async fn fetch_predictions(
        &self,
        client_ip: &str,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, ApiError>;

    /// Runs a volume forecast for one client and returns the report.
    async fn run_forecast(&self, client_ip: &str) -> Result<ForecastReport, ApiError>;
}

/// REST client for the traffic backend.
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(%path, "backend GET");
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(path, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        debug!(%path, "backend POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::Empty {
                endpoint: path.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status,
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl TrafficApi for HttpApi {
    async fn fetch_live(&self) -> Result<Vec<TrafficRecord>, ApiError> {
        let envelope: TrafficEnvelope = self.get_json("/api/traffic").await?;
        Ok(normalize_records(envelope.traffic))
    }

    async fn fetch_historical(&self, period: Period) -> Result<Vec<TrafficRecord>, ApiError> {
        let path = format!("/api/traffic/aggregate?period={period}");
        let envelope: TrafficEnvelope = self.get_json(&path).await?;
        Ok(normalize_records(envelope.traffic))
    }

    async fn fetch_captures(
        &self,
        client_ip: &str,
        limit: usize,
    ) -> Result<Vec<CaptureEvent>, ApiError> {
        let path = format!("/api/traffic/captures/{client_ip}?limit={limit}");
        let response: CapturesResponse = self.get_json(&path).await?;
        Ok(response.into_events())
    }

    async fn fetch_client_protocols(&self, client_ip: &str) -> Result<TrafficRecord, ApiError> {
        let path = format!("/api/traffic/protocols/{client_ip}");
        let raw: RawTrafficRecord = self.get_json(&path).await?;
        raw.normalize().ok_or(ApiError::Empty { endpoint: path })
    }

    async fn run_prediction(&self, client_ip: &str) -> Result<(), ApiError> {
        let body = json!({ "client_ip": client_ip, "features": {} });
        let _ack: serde_json::Value = self.post_json("/api/prediction/run", &body).await?;
        Ok(())
    }

    async fn fetch_predictions(
        &self,
        client_ip: &str,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, ApiError> {
        let path = format!("/api/prediction/{client_ip}?limit={limit}");
        let response: PredictionResponse = self.get_json(&path).await?;
        Ok(response.into_records())
    }

    async fn run_forecast(&self, client_ip: &str) -> Result<ForecastReport, ApiError> {
        let body = json!({ "client_ip": client_ip });
        self.post_json("/api/forecast/run", &body).await
    }
}
