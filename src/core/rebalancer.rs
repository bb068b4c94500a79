//! Oil-intensity rebalancing.
//!
//! Strength adjustments are expressed as a percentage delta applied
//! multiplicatively: `new = current * (1 + pct / 100)`, clamped to
//! `[MIN_OIL_STRENGTH, MAX_OIL_STRENGTH]`.
//!
//! The overshoot policy derives the percentage from the excess over
//! [`OIL_THRESHOLD`]: an excess of `e` means "keep `e * 100` percent". This is
//! the observed production behaviour and is reproduced as-is, including the
//! override to the floor once the excess reaches 1.0.

use std::sync::Arc;

use crate::domain::model::{Unit, UnitId};
use crate::domain::ports::InventoryClient;
use crate::utils::error::Result;

pub const OIL_THRESHOLD: f64 = 4.0;
pub const MIN_OIL_STRENGTH: f64 = 1.0;
pub const MAX_OIL_STRENGTH: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebalancePlan {
    /// Percentage delta sent to the inventory service.
    pub percentage: f64,
    /// Expected strength after the adjustment, clamped but not rounded.
    pub new_strength: f64,
    /// The keep-fraction reached 100% and the floor override kicked in.
    pub forced_to_floor: bool,
}

pub fn needs_rebalance(strength: f64) -> bool {
    strength > OIL_THRESHOLD
}

/// Computes the overshoot adjustment for a unit of `current_strength`.
///
/// Must receive the pre-adjustment value; no rounding happens here.
pub fn plan_rebalance(current_strength: f64) -> RebalancePlan {
    let excess = current_strength - OIL_THRESHOLD;
    let keep_percentage = excess * 100.0;

    if keep_percentage >= 100.0 {
        return RebalancePlan {
            percentage: floor_percentage(current_strength),
            new_strength: MIN_OIL_STRENGTH,
            forced_to_floor: true,
        };
    }

    let percentage = clamp_percentage(current_strength, keep_percentage - 100.0);

    RebalancePlan {
        percentage,
        new_strength: apply_percentage(current_strength, percentage),
        forced_to_floor: false,
    }
}

/// Limits `percentage` so that applying it to `current_strength` lands inside
/// the strength bounds.
pub fn clamp_percentage(current_strength: f64, percentage: f64) -> f64 {
    let raw = current_strength * (1.0 + percentage / 100.0);
    if raw < MIN_OIL_STRENGTH {
        floor_percentage(current_strength)
    } else if raw > MAX_OIL_STRENGTH {
        (MAX_OIL_STRENGTH / current_strength - 1.0) * 100.0
    } else {
        percentage
    }
}

pub fn apply_percentage(current_strength: f64, percentage: f64) -> f64 {
    (current_strength * (1.0 + percentage / 100.0)).clamp(MIN_OIL_STRENGTH, MAX_OIL_STRENGTH)
}

/// Stored strengths carry two decimals.
pub fn round_strength(strength: f64) -> f64 {
    (strength * 100.0).round() / 100.0
}

fn floor_percentage(current_strength: f64) -> f64 {
    (MIN_OIL_STRENGTH / current_strength - 1.0) * 100.0
}

/// Pushes overshoot adjustments to the inventory service.
#[derive(Clone)]
pub struct OilRebalancer {
    inventory: Arc<dyn InventoryClient>,
}

impl OilRebalancer {
    pub fn new(inventory: Arc<dyn InventoryClient>) -> Self {
        Self { inventory }
    }

    /// Reduces `unit_id` according to the overshoot of `current_strength` and
    /// returns the unit as stored by the inventory service.
    pub async fn rebalance(&self, unit_id: &UnitId, current_strength: f64) -> Result<Unit> {
        let plan = plan_rebalance(current_strength);

        tracing::debug!(
            "⚖️ Rebalancing {}: strength {:.4} -> {:.4} ({:+.2}%{})",
            unit_id,
            current_strength,
            plan.new_strength,
            plan.percentage,
            if plan.forced_to_floor { ", forced to floor" } else { "" }
        );

        let mut unit = self
            .inventory
            .adjust_strength(unit_id, plan.percentage)
            .await?;
        unit.oil_strength = round_strength(unit.oil_strength.clamp(MIN_OIL_STRENGTH, MAX_OIL_STRENGTH));
        Ok(unit)
    }
}
