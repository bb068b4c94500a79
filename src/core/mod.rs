pub mod audit;
pub mod packaging;
pub mod processing;
pub mod rebalancer;
pub mod serial;
pub mod service;
pub mod shortage;

pub use crate::domain::model::{FinishedGood, Shipment, Unit};
pub use crate::domain::ports::{
    AuditLogger, ConfigProvider, FinishedGoodRepository, InventoryClient, ShipmentRepository,
    StorageClient,
};
pub use crate::utils::error::Result;
