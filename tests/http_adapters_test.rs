use httpmock::prelude::*;
use httpmock::Method::PATCH;
use perfume_pipeline::adapters::http::{HttpAuditLogger, HttpInventoryClient, HttpStorageClient};
use perfume_pipeline::domain::model::{
    GoodKind, HarvestStatus, PackagingRequest, ProcessingRequest, ShipmentId, ShipmentStatus,
    UnitId,
};
use perfume_pipeline::domain::ports::{AuditLevel, AuditLogger, InventoryClient, StorageClient};
use perfume_pipeline::{PerfumeService, PipelineError, TomlConfig};
use serde_json::json;

fn unit_json(id: &str, strength: f64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "commonName": "Lavender",
        "typeName": "Lavandula angustifolia",
        "originCountry": "France",
        "oilStrength": strength,
        "status": status,
    })
}

#[tokio::test]
async fn test_harvest_sends_body_and_unwraps_envelope() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/plants/harvest")
                .json_body(json!({ "commonName": "Lavender", "count": 2 }));
            then.status(200).json_body(json!({
                "success": true,
                "data": [unit_json("u-1", 3.1, "HARVESTED"), unit_json("u-2", 2.4, "HARVESTED")],
                "count": 2,
                "timestamp": "2026-01-01T00:00:00Z",
            }));
        })
        .await;

    let client = HttpInventoryClient::new(reqwest::Client::new(), server.url("/api/"));
    let units = client.harvest("Lavender", 2).await.unwrap();

    mock.assert_async().await;
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].id, UnitId::new("u-1"));
    assert_eq!(units[1].oil_strength, 2.4);
    assert_eq!(units[1].status, HarvestStatus::Harvested);
    assert_eq!(units[0].origin_country, "France");
}

#[tokio::test]
async fn test_non_success_status_is_external_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/plants");
            then.status(500).body("inventory exploded");
        })
        .await;

    let client = HttpInventoryClient::new(reqwest::Client::new(), server.base_url());
    let err = client
        .create("Lavender", "Lavandula angustifolia", "France")
        .await
        .unwrap_err();

    match err {
        PipelineError::ExternalServiceError { service, message } => {
            assert_eq!(service, "inventory");
            assert!(message.contains("500"));
            assert!(message.contains("inventory exploded"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_adjust_strength_patches_percentage() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/plants/u-9/oil-strength")
                .json_body(json!({ "percentage": -20.0 }));
            then.status(200).json_body(json!({
                "success": true,
                "data": unit_json("u-9", 3.2, "PLANTED"),
            }));
        })
        .await;

    let client = HttpInventoryClient::new(reqwest::Client::new(), server.base_url());
    let unit = client.adjust_strength(&UnitId::new("u-9"), -20.0).await.unwrap();

    mock.assert_async().await;
    assert_eq!(unit.oil_strength, 3.2);
    assert_eq!(unit.status, HarvestStatus::Planted);
}

#[tokio::test]
async fn test_envelope_reporting_failure_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/plants/harvest");
            then.status(200).json_body(json!({ "success": false, "data": [] }));
        })
        .await;

    let client = HttpInventoryClient::new(reqwest::Client::new(), server.base_url());
    let err = client.harvest("Lavender", 1).await.unwrap_err();
    assert!(matches!(err, PipelineError::ExternalServiceError { .. }));
}

#[tokio::test]
async fn test_storage_receive_posts_to_shipment_path() {
    let server = MockServer::start_async().await;
    let shipment_id = ShipmentId::new();
    let path = format!("/shipments/{}/receive", shipment_id);
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(path.as_str());
            then.status(204);
        })
        .await;

    let client = HttpStorageClient::new(reqwest::Client::new(), server.base_url());
    client.receive_shipment(&shipment_id).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_audit_logger_posts_entry() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/logs").json_body(json!({
                "level": "WARNING",
                "source": "PackagingManager",
                "message": "2 goods skipped",
            }));
            then.status(201);
        })
        .await;

    let logger = HttpAuditLogger::new(reqwest::Client::new(), server.base_url());
    logger
        .log(AuditLevel::Warning, "PackagingManager", "2 goods skipped")
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_end_to_end_against_mocked_services() {
    let server = MockServer::start_async().await;

    let harvest = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/inventory/plants/harvest")
                .json_body(json!({ "commonName": "Lavender", "count": 2 }));
            then.status(200).json_body(json!({
                "success": true,
                "data": [unit_json("u-1", 3.0, "HARVESTED"), unit_json("u-2", 3.8, "HARVESTED")],
                "count": 2,
            }));
        })
        .await;
    let processed = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/inventory/plants/processed")
                .json_body(json!({ "ids": ["u-1", "u-2"] }));
            then.status(200).json_body(json!({ "success": true, "data": null }));
        })
        .await;
    let receive = server
        .mock_async(|when, then| {
            when.method(POST)
                .path_matches(regex::Regex::new(r"^/storage/shipments/[0-9a-f-]{36}/receive$").unwrap());
            then.status(200);
        })
        .await;
    let audit = server
        .mock_async(|when, then| {
            when.method(POST).path("/audit/logs");
            then.status(201);
        })
        .await;

    let config = TomlConfig::from_toml_str(&format!(
        r#"
[services]
inventory_url = "{}"
storage_url = "{}"
audit_url = "{}"
timeout_seconds = 5

[processing]
creation_delay_ms = 0
settle_delay_ms = 0
"#,
        server.url("/inventory"),
        server.url("/storage"),
        server.url("/audit"),
    ))
    .unwrap();

    let service = PerfumeService::from_config(&config).unwrap();

    let goods = service
        .start_processing(&ProcessingRequest {
            perfume_name: "Lavender Field".to_string(),
            count: 2,
            bottle_size_ml: 50,
            kind: GoodKind::Perfume,
            unit_common_name: "Lavender".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(goods.len(), 2);

    let shipment = service
        .create_packaging(&PackagingRequest {
            label: "Lavender Batch".to_string(),
            sender_address: "Valensole".to_string(),
            destination_warehouse_id: "wh-paris".to_string(),
            good_ids: goods.iter().map(|g| g.id).collect(),
        })
        .await
        .unwrap();
    let sent = service.send_packaging(&shipment.id).await.unwrap();
    assert_eq!(sent.status, ShipmentStatus::Sent);

    service.shutdown().await;

    harvest.assert_async().await;
    processed.assert_async().await;
    receive.assert_async().await;
    assert!(audit.hits_async().await >= 1);
}
