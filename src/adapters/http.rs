use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::domain::model::{ApiResponse, ShipmentId, Unit, UnitId};
use crate::domain::ports::{AuditLevel, AuditLogger, InventoryClient, StorageClient};
use crate::utils::error::{PipelineError, Result};

const INVENTORY: &str = "inventory";
const STORAGE: &str = "storage";
const AUDIT: &str = "audit";

fn join(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// 送出請求，將傳輸錯誤和非 2xx 回應統一轉成 ExternalServiceError
async fn send(service: &str, request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| PipelineError::external(service, e.to_string()))?;

    let status = response.status();
    tracing::debug!("📡 {} responded with {}", service, status);

    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(PipelineError::external(
            service,
            format!("HTTP {}: {}", status, body.trim()),
        ))
    }
}

async fn send_json<T: DeserializeOwned>(service: &str, request: RequestBuilder) -> Result<T> {
    let response = send(service, request).await?;
    let envelope: ApiResponse<T> = response
        .json()
        .await
        .map_err(|e| PipelineError::external(service, format!("invalid response body: {}", e)))?;

    if !envelope.success {
        return Err(PipelineError::external(service, "response reported success=false"));
    }
    Ok(envelope.data)
}

#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    client: Client,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn harvest(&self, common_name: &str, count: usize) -> Result<Vec<Unit>> {
        let url = join(&self.base_url, "plants/harvest");
        tracing::debug!("📡 Harvesting {} '{}' units via {}", count, common_name, url);

        send_json(
            INVENTORY,
            self.client
                .post(url)
                .json(&json!({ "commonName": common_name, "count": count })),
        )
        .await
    }

    async fn create(
        &self,
        common_name: &str,
        type_name: &str,
        origin_country: &str,
    ) -> Result<Unit> {
        let url = join(&self.base_url, "plants");
        send_json(
            INVENTORY,
            self.client.post(url).json(&json!({
                "commonName": common_name,
                "typeName": type_name,
                "originCountry": origin_country,
            })),
        )
        .await
    }

    async fn adjust_strength(&self, unit_id: &UnitId, percentage_delta: f64) -> Result<Unit> {
        let url = join(&self.base_url, &format!("plants/{}/oil-strength", unit_id));
        send_json(
            INVENTORY,
            self.client
                .patch(url)
                .json(&json!({ "percentage": percentage_delta })),
        )
        .await
    }

    async fn mark_processed(&self, unit_ids: &[UnitId]) -> Result<()> {
        let url = join(&self.base_url, "plants/processed");
        send(INVENTORY, self.client.post(url).json(&json!({ "ids": unit_ids }))).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpStorageClient {
    client: Client,
    base_url: String,
}

impl HttpStorageClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StorageClient for HttpStorageClient {
    async fn receive_shipment(&self, shipment_id: &ShipmentId) -> Result<()> {
        let url = join(&self.base_url, &format!("shipments/{}/receive", shipment_id));
        send(STORAGE, self.client.post(url)).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpAuditLogger {
    client: Client,
    base_url: String,
}

impl HttpAuditLogger {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AuditLogger for HttpAuditLogger {
    async fn log(&self, level: AuditLevel, source: &str, message: &str) -> Result<()> {
        let url = join(&self.base_url, "logs");
        send(
            AUDIT,
            self.client.post(url).json(&json!({
                "level": level.as_str(),
                "source": source,
                "message": message,
            })),
        )
        .await?;
        Ok(())
    }
}
