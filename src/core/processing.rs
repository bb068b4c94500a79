use std::sync::Arc;

use chrono::{DateTime, Months, Utc};

use crate::core::audit::AuditTrail;
use crate::core::rebalancer::{
    needs_rebalance, round_strength, OilRebalancer, MAX_OIL_STRENGTH, MIN_OIL_STRENGTH,
};
use crate::core::serial::SerialNumberGenerator;
use crate::core::shortage::ShortageCompensator;
use crate::domain::model::{
    FinishedGood, FinishedGoodId, GoodStatus, ProcessingRequest, Unit, UnitId,
};
use crate::domain::ports::{FinishedGoodRepository, InventoryClient};
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};

/// Millilitres of finished product one raw unit yields.
pub const ML_PER_UNIT: u32 = 50;
/// Finished goods expire three years after production.
pub const SHELF_LIFE_MONTHS: u32 = 36;
/// Largest batch a single processing request may ask for.
pub const MAX_BATCH_COUNT: u32 = 10_000;
pub const MAX_BOTTLE_SIZE_ML: u32 = 1_000;

const AUDIT_SOURCE: &str = "processing";

/// `ceil(count * bottle_size_ml / ML_PER_UNIT)`
pub fn required_units(count: u32, bottle_size_ml: u32) -> usize {
    let total_ml = u64::from(count) * u64::from(bottle_size_ml);
    total_ml.div_ceil(u64::from(ML_PER_UNIT)) as usize
}

impl Validate for ProcessingRequest {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("perfumeName", &self.perfume_name)?;
        validate_range("count", self.count, 1, MAX_BATCH_COUNT)?;
        validate_range("bottleSizeMl", self.bottle_size_ml, 1, MAX_BOTTLE_SIZE_ML)?;
        validate_non_empty_string("unitCommonName", &self.unit_common_name)?;
        Ok(())
    }
}

/// Drives a processing run from harvest to persisted finished goods.
pub struct ProcessingCoordinator {
    inventory: Arc<dyn InventoryClient>,
    goods: Arc<dyn FinishedGoodRepository>,
    compensator: ShortageCompensator,
    rebalancer: OilRebalancer,
    serials: SerialNumberGenerator,
    audit: Arc<AuditTrail>,
}

impl ProcessingCoordinator {
    pub fn new(
        inventory: Arc<dyn InventoryClient>,
        goods: Arc<dyn FinishedGoodRepository>,
        compensator: ShortageCompensator,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            rebalancer: OilRebalancer::new(inventory.clone()),
            inventory,
            goods,
            compensator,
            serials: SerialNumberGenerator::new(),
            audit,
        }
    }

    /// Produces exactly `request.count` finished goods.
    pub async fn start_processing(&self, request: &ProcessingRequest) -> Result<Vec<FinishedGood>> {
        request.validate()?;

        match self.run(request).await {
            Ok(goods) => {
                tracing::info!(
                    "✅ Processed {} x {}ml '{}' from '{}'",
                    goods.len(),
                    request.bottle_size_ml,
                    request.perfume_name,
                    request.unit_common_name
                );
                self.audit.info(
                    AUDIT_SOURCE,
                    format!(
                        "Processing of {} '{}' bottles completed",
                        goods.len(),
                        request.perfume_name
                    ),
                );
                Ok(goods)
            }
            Err(e) => {
                tracing::error!("❌ Processing of '{}' failed: {}", request.perfume_name, e);
                self.audit.error(
                    AUDIT_SOURCE,
                    format!("Processing of '{}' failed: {}", request.perfume_name, e),
                );
                Err(e)
            }
        }
    }

    async fn run(&self, request: &ProcessingRequest) -> Result<Vec<FinishedGood>> {
        let common_name = request.unit_common_name.as_str();
        let required = required_units(request.count, request.bottle_size_ml);
        tracing::info!(
            "🚀 Processing {} bottles of '{}' requires {} '{}' units",
            request.count,
            request.perfume_name,
            required,
            common_name
        );

        let mut units = self.inventory.harvest(common_name, required).await?;

        if units.len() < required {
            let missing = required - units.len();
            tracing::warn!(
                "⚠️ Harvest of '{}' returned {}/{} units, compensating {}",
                common_name,
                units.len(),
                required,
                missing
            );
            self.audit.warning(
                AUDIT_SOURCE,
                format!(
                    "Shortage of {} '{}' units ({} available, {} required)",
                    missing,
                    common_name,
                    units.len(),
                    required
                ),
            );

            self.compensator
                .compensate(common_name, missing, units.first())
                .await?;

            // 重新收成，讓剛建立的單位也納入這次的處理
            units = self.inventory.harvest(common_name, required).await?;
            if units.len() < required {
                tracing::warn!(
                    "⚠️ Still {}/{} '{}' units after compensation, cycling what is available",
                    units.len(),
                    required,
                    common_name
                );
            }
        }

        let processed = self.substitute_overshoot_units(units).await?;
        if processed.is_empty() {
            return Err(PipelineError::invariant(format!(
                "no '{}' units available to process",
                common_name
            )));
        }

        let unit_ids: Vec<UnitId> = processed.iter().map(|u| u.id.clone()).collect();
        if let Err(e) = self.inventory.mark_processed(&unit_ids).await {
            // best-effort：已完成的強度調整不回滾
            tracing::warn!("⚠️ Failed to mark {} units processed: {}", unit_ids.len(), e);
            self.audit.warning(
                AUDIT_SOURCE,
                format!("Marking {} units processed failed: {}", unit_ids.len(), e),
            );
        }

        let goods = self.materialize(request, &processed, Utc::now())?;
        self.goods.save_all(&goods).await?;
        Ok(goods)
    }

    /// Replaces every unit above the oil threshold with a freshly created,
    /// proportionally reduced unit. The overshoot unit itself stays untouched.
    async fn substitute_overshoot_units(&self, units: Vec<Unit>) -> Result<Vec<Unit>> {
        let mut processed = Vec::with_capacity(units.len());

        for unit in units {
            if !needs_rebalance(unit.oil_strength) {
                processed.push(unit);
                continue;
            }

            let replacement = self
                .inventory
                .create(&unit.common_name, &unit.type_name, &unit.origin_country)
                .await?;
            let replacement = self
                .rebalancer
                .rebalance(&replacement.id, unit.oil_strength)
                .await?;

            tracing::info!(
                "⚖️ Unit {} overshoots ({:.2}), substituted by {} ({:.2})",
                unit.id,
                unit.oil_strength,
                replacement.id,
                replacement.oil_strength
            );
            processed.push(replacement);
        }

        Ok(processed)
    }

    fn materialize(
        &self,
        request: &ProcessingRequest,
        processed: &[Unit],
        now: DateTime<Utc>,
    ) -> Result<Vec<FinishedGood>> {
        if processed.is_empty() {
            return Err(PipelineError::invariant("processed unit set is empty"));
        }
        let expiration_date = now
            .checked_add_months(Months::new(SHELF_LIFE_MONTHS))
            .ok_or_else(|| PipelineError::invariant("expiration date out of range"))?;

        let goods = (0..request.count as usize)
            .map(|i| {
                let unit = &processed[i % processed.len()];
                FinishedGood {
                    id: FinishedGoodId::new(),
                    name: request.perfume_name.clone(),
                    kind: request.kind,
                    net_volume_ml: request.bottle_size_ml,
                    serial_number: self.serials.next_serial(),
                    source_unit_id: unit.id.clone(),
                    expiration_date,
                    status: GoodStatus::Created,
                    shipment_id: None,
                }
            })
            .collect();

        Ok(goods)
    }

    /// User-facing "adjust oil strength by X%".
    pub async fn adjust_oil_strength(&self, unit_id: &UnitId, percentage: f64) -> Result<Unit> {
        if !percentage.is_finite() {
            return Err(PipelineError::validation("percentage", "must be a finite number"));
        }
        validate_range("percentage", percentage, -100.0, 100.0)?;

        let mut unit = self.inventory.adjust_strength(unit_id, percentage).await?;
        unit.oil_strength = round_strength(unit.oil_strength.clamp(MIN_OIL_STRENGTH, MAX_OIL_STRENGTH));

        tracing::info!(
            "⚖️ Adjusted unit {} by {:+.2}% to {:.2}",
            unit_id,
            percentage,
            unit.oil_strength
        );
        self.audit.info(
            AUDIT_SOURCE,
            format!("Oil strength of {} adjusted by {:+.2}%", unit_id, percentage),
        );
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryFinishedGoodRepository, InMemoryInventory};
    use crate::domain::model::GoodKind;
    use std::time::Duration;

    fn request(count: u32, bottle_size_ml: u32) -> ProcessingRequest {
        ProcessingRequest {
            perfume_name: "Lavender Dusk".to_string(),
            count,
            bottle_size_ml,
            kind: GoodKind::Perfume,
            unit_common_name: "Lavender".to_string(),
        }
    }

    fn coordinator(inventory: Arc<InMemoryInventory>) -> ProcessingCoordinator {
        let compensator =
            ShortageCompensator::new(inventory.clone(), Duration::ZERO, Duration::ZERO, "France");
        ProcessingCoordinator::new(
            inventory,
            Arc::new(InMemoryFinishedGoodRepository::new()),
            compensator,
            Arc::new(AuditTrail::disabled()),
        )
    }

    #[test]
    fn test_required_units_rounds_up() {
        assert_eq!(required_units(3, 150), 9);
        assert_eq!(required_units(1, 30), 1);
        assert_eq!(required_units(2, 30), 2);
        assert_eq!(required_units(5, 10), 1);
        assert_eq!(required_units(1, 51), 2);
    }

    #[test]
    fn test_request_validation() {
        assert!(request(1, 50).validate().is_ok());
        assert!(request(0, 50).validate().is_err());
        assert!(request(1, 0).validate().is_err());
        assert!(request(MAX_BATCH_COUNT, MAX_BOTTLE_SIZE_ML).validate().is_ok());
        assert!(request(MAX_BATCH_COUNT + 1, 50).validate().is_err());
        assert!(request(1, MAX_BOTTLE_SIZE_ML + 1).validate().is_err());

        let mut blank = request(1, 50);
        blank.unit_common_name = " ".to_string();
        assert!(matches!(
            blank.validate(),
            Err(PipelineError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_goods_cycle_round_robin_over_units() {
        // 5 x 10ml needs a single unit; all goods share it.
        let inventory = Arc::new(InMemoryInventory::new());
        inventory.seed_harvested("Lavender", &[2.5, 3.0]);

        let goods = coordinator(inventory.clone())
            .start_processing(&request(5, 10))
            .await
            .unwrap();

        assert_eq!(goods.len(), 5);
        let first = &goods[0].source_unit_id;
        assert!(goods.iter().all(|g| &g.source_unit_id == first));
        assert!(goods.iter().all(|g| g.status == GoodStatus::Created));
        assert!(goods.iter().all(|g| g.shipment_id.is_none()));
    }

    #[tokio::test]
    async fn test_expiration_is_three_years_out() {
        let inventory = Arc::new(InMemoryInventory::new());
        inventory.seed_harvested("Lavender", &[2.0]);
        let coordinator = coordinator(inventory);

        let now = Utc::now();
        let unit_list = vec![Unit {
            id: UnitId::new("u"),
            common_name: "Lavender".to_string(),
            type_name: String::new(),
            origin_country: String::new(),
            oil_strength: 2.0,
            status: crate::domain::model::HarvestStatus::Harvested,
        }];
        let goods = coordinator
            .materialize(&request(2, 50), &unit_list, now)
            .unwrap();

        assert_eq!(goods[0].expiration_date, now.checked_add_months(Months::new(36)).unwrap());
        assert_ne!(goods[0].serial_number, goods[1].serial_number);
    }

    #[tokio::test]
    async fn test_materialize_rejects_empty_unit_set() {
        let coordinator = coordinator(Arc::new(InMemoryInventory::new()));
        let result = coordinator.materialize(&request(1, 50), &[], Utc::now());
        assert!(matches!(result, Err(PipelineError::InvariantViolation { .. })));
    }

    #[tokio::test]
    async fn test_adjust_oil_strength_bounds() {
        let inventory = Arc::new(InMemoryInventory::new());
        let ids = inventory.seed_harvested("Lavender", &[4.0]);
        let coordinator = coordinator(inventory);

        let unit = coordinator.adjust_oil_strength(&ids[0], 100.0).await.unwrap();
        assert_eq!(unit.oil_strength, 5.0);

        let err = coordinator
            .adjust_oil_strength(&ids[0], -150.0)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError { .. }));

        let missing = coordinator
            .adjust_oil_strength(&UnitId::new("nope"), 10.0)
            .await
            .unwrap_err();
        assert!(matches!(missing, PipelineError::NotFoundError { .. }));
    }
}
