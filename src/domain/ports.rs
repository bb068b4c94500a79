use crate::domain::model::{
    FinishedGood, FinishedGoodFilter, FinishedGoodId, Shipment, ShipmentId, Unit, UnitId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Inventory service owning raw units.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Returns up to `count` harvested units. A shortage is not an error.
    async fn harvest(&self, common_name: &str, count: usize) -> Result<Vec<Unit>>;
    async fn create(&self, common_name: &str, type_name: &str, origin_country: &str)
        -> Result<Unit>;
    async fn adjust_strength(&self, unit_id: &UnitId, percentage_delta: f64) -> Result<Unit>;
    async fn mark_processed(&self, unit_ids: &[UnitId]) -> Result<()>;
}

/// Downstream warehouse that takes over a shipment once it is sent.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn receive_shipment(&self, shipment_id: &ShipmentId) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Warning => "WARNING",
            AuditLevel::Error => "ERROR",
        }
    }
}

/// Best-effort audit sink. Callers never depend on the outcome.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log(&self, level: AuditLevel, source: &str, message: &str) -> Result<()>;
}

#[async_trait]
pub trait FinishedGoodRepository: Send + Sync {
    /// Persists a whole batch; fails without writing anything if a serial number is taken.
    async fn save_all(&self, goods: &[FinishedGood]) -> Result<()>;
    async fn find(&self, id: &FinishedGoodId) -> Result<Option<FinishedGood>>;
    async fn find_many(&self, ids: &[FinishedGoodId]) -> Result<Vec<FinishedGood>>;
    async fn list(&self, filter: &FinishedGoodFilter) -> Result<Vec<FinishedGood>>;
    /// Sets `shipment_id` and status `PACKED` only if the good is still unassigned.
    /// Returns `false` when another shipment got there first.
    async fn assign_to_shipment(&self, id: &FinishedGoodId, shipment_id: &ShipmentId)
        -> Result<bool>;
    /// Undoes [`Self::assign_to_shipment`]: back to `CREATED` with no shipment,
    /// but only while the good still belongs to `shipment_id`.
    async fn release_from_shipment(&self, id: &FinishedGoodId, shipment_id: &ShipmentId)
        -> Result<()>;
}

#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    async fn save(&self, shipment: &Shipment) -> Result<()>;
    async fn find(&self, id: &ShipmentId) -> Result<Option<Shipment>>;
    async fn list(&self) -> Result<Vec<Shipment>>;
}

pub trait ConfigProvider: Send + Sync {
    fn inventory_endpoint(&self) -> &str;
    fn storage_endpoint(&self) -> &str;
    fn audit_endpoint(&self) -> Option<&str>;
    fn request_timeout(&self) -> Duration;
    /// Pause between sequential unit creations.
    fn creation_delay(&self) -> Duration;
    /// Pause after the last creation before re-harvesting.
    fn settle_delay(&self) -> Duration;
    fn default_origin_country(&self) -> &str;
    fn audit_queue_capacity(&self) -> usize;
}
