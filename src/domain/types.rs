//! Shipment data model shared by the allocator and the derivation engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Name-based UUIDv5, stable for the same namespace and name
pub fn stable_uuid(namespace: &Uuid, name: &str) -> Uuid {
    Uuid::new_v5(namespace, name.as_bytes())
}

/// Shipment status shared by both tracking pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentStatus {
    Pending,
    Processing,
    InTransit,
    OutForDelivery,
    Delivered,
    Delayed,
}

impl ShipmentStatus {
    /// Order used by the opaque pipeline when mapping `suffix mod 5` to a status.
    pub const OPAQUE_BUCKETS: [ShipmentStatus; 5] = [
        ShipmentStatus::Processing,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Delayed,
    ];

    /// Wire representation (kebab-case)
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Processing => "processing",
            ShipmentStatus::InTransit => "in-transit",
            ShipmentStatus::OutForDelivery => "out-for-delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Delayed => "delayed",
        }
    }

    /// Human-readable label for UIs and CLI output
    pub fn label(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "Pending",
            ShipmentStatus::Processing => "Processing",
            ShipmentStatus::InTransit => "In Transit",
            ShipmentStatus::OutForDelivery => "Out for Delivery",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Delayed => "Delayed",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentUpdate {
    pub id: String,
    pub status: ShipmentStatus,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub completed: bool,
}

impl ShipmentUpdate {
    pub fn new(
        id: impl Into<String>,
        status: ShipmentStatus,
        location: impl Into<String>,
        timestamp: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            location: location.into(),
            timestamp,
            description: description.into(),
            completed: true,
        }
    }
}

/// Sender, recipient, or customer contact block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(rename = "type")]
    pub package_type: String,
    pub weight: String,
    pub dimensions: String,
    pub description: String,
}

/// One parcel in flight.
///
/// Shipments are never mutated by the core: an allocation builds one with a
/// single seed update, and every lookup builds a fresh projection from the
/// tracking number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    pub tracking_number: String,
    pub origin: String,
    pub destination: String,
    pub status: ShipmentStatus,
    pub estimated_delivery: DateTime<Utc>,
    #[serde(default)]
    pub actual_delivery: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_info: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_info: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_info: Option<PackageInfo>,
    #[serde(default)]
    pub updates: Vec<ShipmentUpdate>,
}

impl Shipment {
    /// Most recent update by timestamp
    pub fn latest_update(&self) -> Option<&ShipmentUpdate> {
        self.updates.iter().max_by_key(|u| u.timestamp)
    }

    /// True when updates are in ascending timestamp order
    pub fn is_chronological(&self) -> bool {
        self.updates.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
    }
}
