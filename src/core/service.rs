use std::sync::Arc;
use std::time::Duration;

use crate::adapters::http::{HttpAuditLogger, HttpInventoryClient, HttpStorageClient};
use crate::adapters::memory::{InMemoryFinishedGoodRepository, InMemoryShipmentRepository};
use crate::core::audit::AuditTrail;
use crate::core::packaging::{PackagingManager, PackagingOutcome};
use crate::core::processing::ProcessingCoordinator;
use crate::core::shortage::ShortageCompensator;
use crate::domain::model::{
    FinishedGood, FinishedGoodFilter, FinishedGoodId, PackagingRequest, ProcessingRequest,
    Shipment, ShipmentId, Unit, UnitId,
};
use crate::domain::ports::{
    AuditLogger, ConfigProvider, FinishedGoodRepository, InventoryClient, ShipmentRepository,
    StorageClient,
};
use crate::utils::error::{PipelineError, Result};

/// Tunables of a processing run that are not business policy.
#[derive(Debug, Clone)]
pub struct ProcessingSettings {
    pub creation_delay: Duration,
    pub settle_delay: Duration,
    pub default_origin_country: String,
    pub audit_queue_capacity: usize,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            creation_delay: Duration::from_millis(50),
            settle_delay: Duration::from_millis(200),
            default_origin_country: "Unknown".to_string(),
            audit_queue_capacity: 256,
        }
    }
}

impl ProcessingSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            creation_delay: config.creation_delay(),
            settle_delay: config.settle_delay(),
            default_origin_country: config.default_origin_country().to_string(),
            audit_queue_capacity: config.audit_queue_capacity(),
        }
    }
}

pub struct Collaborators {
    pub inventory: Arc<dyn InventoryClient>,
    pub storage: Arc<dyn StorageClient>,
    pub audit: Option<Arc<dyn AuditLogger>>,
    pub goods: Arc<dyn FinishedGoodRepository>,
    pub shipments: Arc<dyn ShipmentRepository>,
}

/// Entry point for callers of the plant-to-perfume pipeline.
pub struct PerfumeService {
    processing: ProcessingCoordinator,
    packaging: PackagingManager,
    goods: Arc<dyn FinishedGoodRepository>,
    shipments: Arc<dyn ShipmentRepository>,
    audit: Arc<AuditTrail>,
}

impl PerfumeService {
    /// Wires the service. Spawns the audit drain task when an audit logger is
    /// given, so it must run inside a Tokio runtime in that case.
    pub fn new(collaborators: Collaborators, settings: ProcessingSettings) -> Self {
        let Collaborators {
            inventory,
            storage,
            audit,
            goods,
            shipments,
        } = collaborators;

        let audit = Arc::new(match audit {
            Some(logger) => AuditTrail::spawn(logger, settings.audit_queue_capacity),
            None => AuditTrail::disabled(),
        });

        let compensator = ShortageCompensator::new(
            inventory.clone(),
            settings.creation_delay,
            settings.settle_delay,
            settings.default_origin_country,
        );
        let processing =
            ProcessingCoordinator::new(inventory, goods.clone(), compensator, audit.clone());
        let packaging =
            PackagingManager::new(goods.clone(), shipments.clone(), storage, audit.clone());

        Self {
            processing,
            packaging,
            goods,
            shipments,
            audit,
        }
    }

    /// HTTP collaborators from `config`, in-memory repositories.
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PipelineError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let audit: Option<Arc<dyn AuditLogger>> = config.audit_endpoint().map(|endpoint| {
            Arc::new(HttpAuditLogger::new(client.clone(), endpoint)) as Arc<dyn AuditLogger>
        });

        let collaborators = Collaborators {
            inventory: Arc::new(HttpInventoryClient::new(
                client.clone(),
                config.inventory_endpoint(),
            )),
            storage: Arc::new(HttpStorageClient::new(client, config.storage_endpoint())),
            audit,
            goods: Arc::new(InMemoryFinishedGoodRepository::new()),
            shipments: Arc::new(InMemoryShipmentRepository::new()),
        };

        Ok(Self::new(collaborators, ProcessingSettings::from_config(config)))
    }

    pub async fn start_processing(&self, request: &ProcessingRequest) -> Result<Vec<FinishedGood>> {
        self.processing.start_processing(request).await
    }

    pub async fn adjust_oil_strength(&self, unit_id: &UnitId, percentage: f64) -> Result<Unit> {
        self.processing.adjust_oil_strength(unit_id, percentage).await
    }

    pub async fn get_finished_good(&self, id: &FinishedGoodId) -> Result<FinishedGood> {
        self.goods
            .find(id)
            .await?
            .ok_or_else(|| PipelineError::not_found("FinishedGood", id))
    }

    pub async fn list_finished_goods(&self, filter: &FinishedGoodFilter) -> Result<Vec<FinishedGood>> {
        self.goods.list(filter).await
    }

    pub async fn create_packaging(&self, request: &PackagingRequest) -> Result<Shipment> {
        self.packaging.create_packaging(request).await
    }

    /// Like [`Self::create_packaging`] but also reports the skipped goods.
    pub async fn create_packaging_detailed(
        &self,
        request: &PackagingRequest,
    ) -> Result<PackagingOutcome> {
        self.packaging.pack(request).await
    }

    pub async fn send_packaging(&self, shipment_id: &ShipmentId) -> Result<Shipment> {
        self.packaging.send_packaging(shipment_id).await
    }

    pub async fn get_shipment(&self, id: &ShipmentId) -> Result<Shipment> {
        self.shipments
            .find(id)
            .await?
            .ok_or_else(|| PipelineError::not_found("Shipment", id))
    }

    pub async fn list_shipments(&self) -> Result<Vec<Shipment>> {
        self.shipments.list().await
    }

    /// Flushes pending audit events.
    pub async fn shutdown(&self) {
        self.audit.shutdown().await;
    }
}
