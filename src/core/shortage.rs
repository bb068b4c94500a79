use std::sync::Arc;
use std::time::Duration;

use crate::core::rebalancer::{needs_rebalance, OilRebalancer};
use crate::domain::model::Unit;
use crate::domain::ports::InventoryClient;
use crate::utils::error::Result;

/// Creates missing units when a harvest comes back short.
///
/// Creations are issued one at a time with a settling pause in between, and a
/// longer pause after the last one, because the inventory service only makes
/// new units visible to `harvest` eventually.
pub struct ShortageCompensator {
    inventory: Arc<dyn InventoryClient>,
    rebalancer: OilRebalancer,
    creation_delay: Duration,
    settle_delay: Duration,
    default_origin_country: String,
}

impl ShortageCompensator {
    pub fn new(
        inventory: Arc<dyn InventoryClient>,
        creation_delay: Duration,
        settle_delay: Duration,
        default_origin_country: impl Into<String>,
    ) -> Self {
        Self {
            rebalancer: OilRebalancer::new(inventory.clone()),
            inventory,
            creation_delay,
            settle_delay,
            default_origin_country: default_origin_country.into(),
        }
    }

    /// Creates `missing_count` units of `common_name`, reducing any that come
    /// back above the oil threshold before they can be harvested.
    ///
    /// `template` supplies type name and origin country when a unit of the same
    /// plant was already harvested.
    pub async fn compensate(
        &self,
        common_name: &str,
        missing_count: usize,
        template: Option<&Unit>,
    ) -> Result<Vec<Unit>> {
        let (type_name, origin_country) = match template {
            Some(unit) if !unit.type_name.is_empty() => {
                (unit.type_name.as_str(), unit.origin_country.as_str())
            }
            _ => (common_name, self.default_origin_country.as_str()),
        };

        tracing::info!(
            "🌱 Creating {} compensating '{}' units ({} / {})",
            missing_count,
            common_name,
            type_name,
            origin_country
        );

        let mut created = Vec::new();
        for index in 0..missing_count {
            let unit = self
                .inventory
                .create(common_name, type_name, origin_country)
                .await?;

            let unit = if needs_rebalance(unit.oil_strength) {
                let strength = unit.oil_strength;
                self.rebalancer.rebalance(&unit.id, strength).await?
            } else {
                unit
            };

            tracing::debug!(
                "🌱 Created unit {}/{}: {} (strength {:.2})",
                index + 1,
                missing_count,
                unit.id,
                unit.oil_strength
            );
            created.push(unit);

            if index + 1 < missing_count {
                pause(self.creation_delay).await;
            }
        }

        pause(self.settle_delay).await;
        Ok(created)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
