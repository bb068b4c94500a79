use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::core::audit::AuditTrail;
use crate::domain::model::{
    FinishedGood, FinishedGoodId, GoodStatus, PackagingRequest, Shipment, ShipmentId,
    ShipmentStatus,
};
use crate::domain::ports::{FinishedGoodRepository, ShipmentRepository, StorageClient};
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{validate_non_empty_list, validate_non_empty_string, Validate};

const AUDIT_SOURCE: &str = "packaging";

impl Validate for PackagingRequest {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("label", &self.label)?;
        validate_non_empty_string("senderAddress", &self.sender_address)?;
        validate_non_empty_string("destinationWarehouseId", &self.destination_warehouse_id)?;
        validate_non_empty_list("goodIds", &self.good_ids)?;
        Ok(())
    }
}

/// Three-way split of the goods referenced by a packaging request.
#[derive(Debug, Default)]
pub struct PackagingPartition {
    pub valid: Vec<FinishedGood>,
    pub already_shipped: Vec<FinishedGood>,
    pub invalid_status: Vec<FinishedGood>,
}

pub fn partition_goods(goods: Vec<FinishedGood>) -> PackagingPartition {
    let mut partition = PackagingPartition::default();
    for good in goods {
        if good.shipment_id.is_some() {
            partition.already_shipped.push(good);
        } else if good.status != GoodStatus::Created {
            partition.invalid_status.push(good);
        } else {
            partition.valid.push(good);
        }
    }
    partition
}

/// What a packaging request actually did.
#[derive(Debug, Clone)]
pub struct PackagingOutcome {
    pub shipment: Shipment,
    pub skipped_already_shipped: Vec<FinishedGoodId>,
    pub skipped_invalid_status: Vec<FinishedGoodId>,
    pub missing: Vec<FinishedGoodId>,
}

pub struct PackagingManager {
    goods: Arc<dyn FinishedGoodRepository>,
    shipments: Arc<dyn ShipmentRepository>,
    storage: Arc<dyn StorageClient>,
    audit: Arc<AuditTrail>,
}

impl PackagingManager {
    pub fn new(
        goods: Arc<dyn FinishedGoodRepository>,
        shipments: Arc<dyn ShipmentRepository>,
        storage: Arc<dyn StorageClient>,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            goods,
            shipments,
            storage,
            audit,
        }
    }

    pub async fn create_packaging(&self, request: &PackagingRequest) -> Result<Shipment> {
        self.pack(request).await.map(|outcome| outcome.shipment)
    }

    /// Groups the packable goods of `request` into a new `PACKED` shipment.
    ///
    /// Goods that are already assigned or no longer `CREATED` are skipped; the
    /// request only fails when nothing packable is left. Resubmitting a
    /// partially packed request therefore picks up exactly the remainder.
    pub async fn pack(&self, request: &PackagingRequest) -> Result<PackagingOutcome> {
        request.validate()?;

        let mut seen = HashSet::new();
        let ids: Vec<FinishedGoodId> = request
            .good_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let found = self.goods.find_many(&ids).await?;
        let found_ids: HashSet<FinishedGoodId> = found.iter().map(|g| g.id).collect();
        let missing: Vec<FinishedGoodId> = ids
            .iter()
            .copied()
            .filter(|id| !found_ids.contains(id))
            .collect();

        let partition = partition_goods(found);
        log_skipped("unknown", &missing);
        log_skipped(
            "already shipped",
            &partition.already_shipped.iter().map(|g| g.id).collect::<Vec<_>>(),
        );
        log_skipped(
            "not in CREATED status",
            &partition.invalid_status.iter().map(|g| g.id).collect::<Vec<_>>(),
        );

        if partition.valid.is_empty() {
            self.audit.warning(
                AUDIT_SOURCE,
                format!("Packaging '{}' rejected: no valid goods", request.label),
            );
            return Err(PipelineError::business_rule("no valid goods available"));
        }

        let shipment_id = ShipmentId::new();
        let mut members = Vec::with_capacity(partition.valid.len());
        let mut skipped_already_shipped: Vec<FinishedGoodId> =
            partition.already_shipped.iter().map(|g| g.id).collect();

        for good in &partition.valid {
            match self.goods.assign_to_shipment(&good.id, &shipment_id).await {
                Ok(true) => members.push(good.id),
                Ok(false) => {
                    // 其他包裝請求搶先指派了這個商品
                    tracing::warn!("📦 Good {} was assigned concurrently, skipping", good.id);
                    skipped_already_shipped.push(good.id);
                }
                Err(e) => {
                    self.release(&members, &shipment_id).await;
                    return Err(e);
                }
            }
        }

        if members.is_empty() {
            return Err(PipelineError::business_rule("no valid goods available"));
        }

        let shipment = Shipment {
            id: shipment_id,
            label: request.label.clone(),
            sender_address: request.sender_address.clone(),
            destination_warehouse_id: request.destination_warehouse_id.clone(),
            status: ShipmentStatus::Packed,
            sent_at: None,
            member_good_ids: members,
        };
        if let Err(e) = self.shipments.save(&shipment).await {
            tracing::error!("❌ Failed to persist shipment {}: {}", shipment.id, e);
            self.release(&shipment.member_good_ids, &shipment_id).await;
            return Err(e);
        }

        tracing::info!(
            "📦 Packed {} goods into shipment {} ('{}')",
            shipment.member_good_ids.len(),
            shipment.id,
            shipment.label
        );
        self.audit.info(
            AUDIT_SOURCE,
            format!(
                "Shipment {} packed with {} goods",
                shipment.id,
                shipment.member_good_ids.len()
            ),
        );

        Ok(PackagingOutcome {
            shipment,
            skipped_already_shipped,
            skipped_invalid_status: partition.invalid_status.iter().map(|g| g.id).collect(),
            missing,
        })
    }

    /// Hands a packed shipment to the storage service and marks it `SENT`.
    ///
    /// The storage notification must succeed before the status is persisted.
    pub async fn send_packaging(&self, shipment_id: &ShipmentId) -> Result<Shipment> {
        let mut shipment = self
            .shipments
            .find(shipment_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("Shipment", shipment_id))?;

        if shipment.status != ShipmentStatus::Packed {
            return Err(PipelineError::business_rule(format!(
                "shipment {} is {:?}; only PACKED shipments can be sent",
                shipment_id, shipment.status
            )));
        }

        if let Err(e) = self.storage.receive_shipment(shipment_id).await {
            let e = match e {
                PipelineError::ExternalServiceError { .. } => e,
                other => PipelineError::external("storage", other.to_string()),
            };
            tracing::error!("❌ Storage rejected shipment {}: {}", shipment_id, e);
            self.audit.error(
                AUDIT_SOURCE,
                format!("Sending shipment {} failed: {}", shipment_id, e),
            );
            return Err(e);
        }

        shipment.status = ShipmentStatus::Sent;
        shipment.sent_at = Some(Utc::now());
        self.shipments.save(&shipment).await?;

        tracing::info!("🚚 Shipment {} sent", shipment_id);
        self.audit
            .info(AUDIT_SOURCE, format!("Shipment {} sent", shipment_id));
        Ok(shipment)
    }

    /// Hands goods back to `CREATED` so the request can be resubmitted.
    async fn release(&self, ids: &[FinishedGoodId], shipment_id: &ShipmentId) {
        for id in ids {
            if let Err(e) = self.goods.release_from_shipment(id, shipment_id).await {
                tracing::error!("❌ Good {} is stuck on shipment {}: {}", id, shipment_id, e);
            }
        }
    }
}

fn log_skipped(reason: &str, ids: &[FinishedGoodId]) {
    if !ids.is_empty() {
        tracing::warn!("📦 Skipping {} goods ({}): {:?}", ids.len(), reason, ids);
    }
}
