use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::error::PipelineError;

/// Identifier of a raw unit, assigned by the inventory service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinishedGoodId(Uuid);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(Uuid);

macro_rules! impl_uuid_id {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = PipelineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s)
                    .map(Self)
                    .map_err(|e| PipelineError::validation($name, e.to_string()))
            }
        }
    };
}

impl_uuid_id!(FinishedGoodId, "finishedGoodId");
impl_uuid_id!(ShipmentId, "shipmentId");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarvestStatus {
    Planted,
    Harvested,
    Processed,
}

/// Raw plant unit as exposed by the inventory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub common_name: String,
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub origin_country: String,
    pub oil_strength: f64,
    pub status: HarvestStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoodKind {
    Perfume,
    Cologne,
}

impl FromStr for GoodKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERFUME" => Ok(Self::Perfume),
            "COLOGNE" => Ok(Self::Cologne),
            other => Err(PipelineError::validation(
                "kind",
                format!("'{}' is not one of PERFUME, COLOGNE", other),
            )),
        }
    }
}

/// `CREATED → PACKED → SOLD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoodStatus {
    Created,
    Packed,
    Sold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedGood {
    pub id: FinishedGoodId,
    pub name: String,
    pub kind: GoodKind,
    pub net_volume_ml: u32,
    pub serial_number: String,
    pub source_unit_id: UnitId,
    pub expiration_date: DateTime<Utc>,
    pub status: GoodStatus,
    pub shipment_id: Option<ShipmentId>,
}

impl FinishedGood {
    /// A good can join a new shipment only while it is fresh and unassigned.
    pub fn is_packable(&self) -> bool {
        self.status == GoodStatus::Created && self.shipment_id.is_none()
    }
}

/// `PACKED → SENT`; later states belong to the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Packed,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: ShipmentId,
    pub label: String,
    pub sender_address: String,
    pub destination_warehouse_id: String,
    pub status: ShipmentStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub member_good_ids: Vec<FinishedGoodId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedGoodFilter {
    pub kind: Option<GoodKind>,
    pub status: Option<GoodStatus>,
    pub shipment_id: Option<ShipmentId>,
}

impl FinishedGoodFilter {
    pub fn matches(&self, good: &FinishedGood) -> bool {
        self.kind.map_or(true, |kind| good.kind == kind)
            && self.status.map_or(true, |status| good.status == status)
            && self
                .shipment_id
                .map_or(true, |id| good.shipment_id == Some(id))
    }
}

/// Input of a processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    pub perfume_name: String,
    pub count: u32,
    pub bottle_size_ml: u32,
    pub kind: GoodKind,
    pub unit_common_name: String,
}

/// Input of a packaging request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingRequest {
    pub label: String,
    pub sender_address: String,
    pub destination_warehouse_id: String,
    pub good_ids: Vec<FinishedGoodId>,
}

/// Uniform success envelope `{success, data, count?, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub count: Option<usize>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
            timestamp: Utc::now(),
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            success: true,
            data,
            count: Some(count),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&PipelineError> for ErrorResponse {
    fn from(err: &PipelineError) -> Self {
        Self {
            success: false,
            error: err.code().to_string(),
            message: err.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn good(status: GoodStatus, shipment_id: Option<ShipmentId>) -> FinishedGood {
        FinishedGood {
            id: FinishedGoodId::new(),
            name: "Rose Noir".to_string(),
            kind: GoodKind::Perfume,
            net_volume_ml: 50,
            serial_number: "PP-2026-1-abcd".to_string(),
            source_unit_id: UnitId::new("u-1"),
            expiration_date: Utc.with_ymd_and_hms(2029, 1, 1, 0, 0, 0).unwrap(),
            status,
            shipment_id,
        }
    }

    #[test]
    fn test_only_fresh_unassigned_goods_are_packable() {
        assert!(good(GoodStatus::Created, None).is_packable());
        assert!(!good(GoodStatus::Packed, None).is_packable());
        assert!(!good(GoodStatus::Created, Some(ShipmentId::new())).is_packable());
    }

    #[test]
    fn test_filter_matches_on_all_set_fields() {
        let shipment = ShipmentId::new();
        let packed = good(GoodStatus::Packed, Some(shipment));

        assert!(FinishedGoodFilter::default().matches(&packed));
        assert!(FinishedGoodFilter {
            kind: Some(GoodKind::Perfume),
            status: Some(GoodStatus::Packed),
            shipment_id: Some(shipment),
        }
        .matches(&packed));
        assert!(!FinishedGoodFilter {
            kind: Some(GoodKind::Cologne),
            ..Default::default()
        }
        .matches(&packed));
    }

    #[test]
    fn test_unit_wire_format_is_camel_case() {
        let json = serde_json::json!({
            "id": "plant-7",
            "commonName": "Lavender",
            "typeName": "Lavandula",
            "originCountry": "France",
            "oilStrength": 4.65,
            "status": "HARVESTED"
        });
        let unit: Unit = serde_json::from_value(json).unwrap();
        assert_eq!(unit.id, UnitId::new("plant-7"));
        assert_eq!(unit.status, HarvestStatus::Harvested);
        assert_eq!(unit.oil_strength, 4.65);
    }

    #[test]
    fn test_list_envelope_carries_count() {
        let response = ApiResponse::list(vec![1, 2, 3]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 3);

        let single = serde_json::to_value(ApiResponse::ok("x")).unwrap();
        assert!(single.get("count").is_none());
    }

    #[test]
    fn test_kind_parses_case_insensitively() {
        assert_eq!("cologne".parse::<GoodKind>().unwrap(), GoodKind::Cologne);
        assert!("eau".parse::<GoodKind>().is_err());
    }
}
