//! In-memory adapters for development and tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::rebalancer::{apply_percentage, clamp_percentage, round_strength};
use crate::domain::model::{
    FinishedGood, FinishedGoodFilter, FinishedGoodId, GoodStatus, HarvestStatus, Shipment,
    ShipmentId, Unit, UnitId,
};
use crate::domain::ports::{FinishedGoodRepository, InventoryClient, ShipmentRepository};
use crate::utils::error::{PipelineError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Offline inventory service.
///
/// `harvest` hands out already harvested units first and then harvests planted
/// ones; new units start out planted.
#[derive(Debug)]
pub struct InMemoryInventory {
    units: Mutex<Vec<Unit>>,
    next_id: AtomicU64,
    new_unit_strength: f64,
    harvest_requests: Mutex<Vec<usize>>,
    adjustments: Mutex<Vec<(UnitId, f64)>>,
    created: Mutex<Vec<UnitId>>,
    fail_mark_processed: AtomicBool,
}

impl Default for InMemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self {
            units: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            new_unit_strength: 3.0,
            harvest_requests: Mutex::new(Vec::new()),
            adjustments: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            fail_mark_processed: AtomicBool::new(false),
        }
    }

    /// Strength given to every unit created through [`InventoryClient::create`].
    pub fn with_new_unit_strength(mut self, strength: f64) -> Self {
        self.new_unit_strength = strength;
        self
    }

    /// Makes `mark_processed` fail, simulating a flaky inventory service.
    pub fn fail_mark_processed(&self, fail: bool) {
        self.fail_mark_processed.store(fail, Ordering::SeqCst);
    }

    pub fn seed_harvested(&self, common_name: &str, strengths: &[f64]) -> Vec<UnitId> {
        self.seed(common_name, strengths, HarvestStatus::Harvested)
    }

    pub fn seed_planted(&self, common_name: &str, strengths: &[f64]) -> Vec<UnitId> {
        self.seed(common_name, strengths, HarvestStatus::Planted)
    }

    fn seed(&self, common_name: &str, strengths: &[f64], status: HarvestStatus) -> Vec<UnitId> {
        let mut units = lock(&self.units);
        strengths
            .iter()
            .map(|&strength| {
                let unit = self.new_unit(common_name, common_name, "Unknown", strength, status);
                let id = unit.id.clone();
                units.push(unit);
                id
            })
            .collect()
    }

    fn new_unit(
        &self,
        common_name: &str,
        type_name: &str,
        origin_country: &str,
        oil_strength: f64,
        status: HarvestStatus,
    ) -> Unit {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Unit {
            id: UnitId::new(format!("unit-{}", n)),
            common_name: common_name.to_string(),
            type_name: type_name.to_string(),
            origin_country: origin_country.to_string(),
            oil_strength,
            status,
        }
    }

    pub fn unit(&self, id: &UnitId) -> Option<Unit> {
        lock(&self.units).iter().find(|u| &u.id == id).cloned()
    }

    pub fn units_with_status(&self, status: HarvestStatus) -> Vec<Unit> {
        lock(&self.units)
            .iter()
            .filter(|u| u.status == status)
            .cloned()
            .collect()
    }

    /// Counts passed to `harvest`, in call order.
    pub fn harvest_requests(&self) -> Vec<usize> {
        lock(&self.harvest_requests).clone()
    }

    pub fn adjustments(&self) -> Vec<(UnitId, f64)> {
        lock(&self.adjustments).clone()
    }

    pub fn created_count(&self) -> usize {
        lock(&self.created).len()
    }

    pub fn created_ids(&self) -> Vec<UnitId> {
        lock(&self.created).clone()
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventory {
    async fn harvest(&self, common_name: &str, count: usize) -> Result<Vec<Unit>> {
        lock(&self.harvest_requests).push(count);
        let mut units = lock(&self.units);

        let mut picked: Vec<usize> = units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.common_name == common_name && u.status == HarvestStatus::Harvested)
            .map(|(i, _)| i)
            .take(count)
            .collect();

        if picked.len() < count {
            let planted: Vec<usize> = units
                .iter()
                .enumerate()
                .filter(|(_, u)| u.common_name == common_name && u.status == HarvestStatus::Planted)
                .map(|(i, _)| i)
                .take(count - picked.len())
                .collect();
            for &i in &planted {
                units[i].status = HarvestStatus::Harvested;
            }
            picked.extend(planted);
        }

        Ok(picked.into_iter().map(|i| units[i].clone()).collect())
    }

    async fn create(
        &self,
        common_name: &str,
        type_name: &str,
        origin_country: &str,
    ) -> Result<Unit> {
        let unit = self.new_unit(
            common_name,
            type_name,
            origin_country,
            self.new_unit_strength,
            HarvestStatus::Planted,
        );
        lock(&self.units).push(unit.clone());
        lock(&self.created).push(unit.id.clone());
        Ok(unit)
    }

    async fn adjust_strength(&self, unit_id: &UnitId, percentage_delta: f64) -> Result<Unit> {
        let mut units = lock(&self.units);
        let unit = units
            .iter_mut()
            .find(|u| &u.id == unit_id)
            .ok_or_else(|| PipelineError::not_found("Unit", unit_id))?;

        let effective = clamp_percentage(unit.oil_strength, percentage_delta);
        unit.oil_strength = round_strength(apply_percentage(unit.oil_strength, effective));
        lock(&self.adjustments).push((unit_id.clone(), percentage_delta));
        Ok(unit.clone())
    }

    async fn mark_processed(&self, unit_ids: &[UnitId]) -> Result<()> {
        if self.fail_mark_processed.load(Ordering::SeqCst) {
            return Err(PipelineError::external("inventory", "mark processed unavailable"));
        }
        let ids: HashSet<&UnitId> = unit_ids.iter().collect();
        for unit in lock(&self.units).iter_mut() {
            if ids.contains(&unit.id) {
                unit.status = HarvestStatus::Processed;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFinishedGoodRepository {
    goods: Mutex<Vec<FinishedGood>>,
}

impl InMemoryFinishedGoodRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FinishedGoodRepository for InMemoryFinishedGoodRepository {
    async fn save_all(&self, batch: &[FinishedGood]) -> Result<()> {
        let mut goods = lock(&self.goods);

        let mut serials: HashSet<&str> = goods.iter().map(|g| g.serial_number.as_str()).collect();
        for good in batch {
            if !serials.insert(good.serial_number.as_str()) {
                return Err(PipelineError::invariant(format!(
                    "serial number {} already exists",
                    good.serial_number
                )));
            }
        }

        goods.extend(batch.iter().cloned());
        Ok(())
    }

    async fn find(&self, id: &FinishedGoodId) -> Result<Option<FinishedGood>> {
        Ok(lock(&self.goods).iter().find(|g| &g.id == id).cloned())
    }

    async fn find_many(&self, ids: &[FinishedGoodId]) -> Result<Vec<FinishedGood>> {
        let wanted: HashSet<&FinishedGoodId> = ids.iter().collect();
        Ok(lock(&self.goods)
            .iter()
            .filter(|g| wanted.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &FinishedGoodFilter) -> Result<Vec<FinishedGood>> {
        Ok(lock(&self.goods)
            .iter()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect())
    }

    async fn assign_to_shipment(
        &self,
        id: &FinishedGoodId,
        shipment_id: &ShipmentId,
    ) -> Result<bool> {
        let mut goods = lock(&self.goods);
        let good = goods
            .iter_mut()
            .find(|g| &g.id == id)
            .ok_or_else(|| PipelineError::not_found("FinishedGood", id))?;

        if !good.is_packable() {
            return Ok(false);
        }
        good.shipment_id = Some(*shipment_id);
        good.status = GoodStatus::Packed;
        Ok(true)
    }

    async fn release_from_shipment(
        &self,
        id: &FinishedGoodId,
        shipment_id: &ShipmentId,
    ) -> Result<()> {
        let mut goods = lock(&self.goods);
        if let Some(good) = goods
            .iter_mut()
            .find(|g| &g.id == id && g.shipment_id.as_ref() == Some(shipment_id))
        {
            good.shipment_id = None;
            good.status = GoodStatus::Created;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryShipmentRepository {
    shipments: Mutex<Vec<Shipment>>,
}

impl InMemoryShipmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShipmentRepository for InMemoryShipmentRepository {
    async fn save(&self, shipment: &Shipment) -> Result<()> {
        let mut shipments = lock(&self.shipments);
        match shipments.iter_mut().find(|s| s.id == shipment.id) {
            Some(existing) => *existing = shipment.clone(),
            None => shipments.push(shipment.clone()),
        }
        Ok(())
    }

    async fn find(&self, id: &ShipmentId) -> Result<Option<Shipment>> {
        Ok(lock(&self.shipments).iter().find(|s| &s.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Shipment>> {
        Ok(lock(&self.shipments).clone())
    }
}
