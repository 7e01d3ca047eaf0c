//! Static status catalog: canonical location and description per timeline step
//!
//! Both pipelines draw their event text from here. The table is read-only
//! and process-wide.

use crate::domain::types::{ContactInfo, ShipmentStatus};

/// One canonical timeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub status: ShipmentStatus,
    pub location: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    const fn new(status: ShipmentStatus, location: &'static str, description: &'static str) -> Self {
        Self { status, location, description }
    }
}

pub struct StatusCatalog {
    dated: [CatalogEntry; 4],
    opaque: [CatalogEntry; 4],
    delayed: CatalogEntry,
}

pub static STATUS_CATALOG: StatusCatalog = StatusCatalog {
    dated: [
        CatalogEntry::new(
            ShipmentStatus::Pending,
            "Origin Warehouse",
            "Shipment registered in system",
        ),
        CatalogEntry::new(
            ShipmentStatus::InTransit,
            "Departure Facility",
            "Package processed and in transit",
        ),
        CatalogEntry::new(ShipmentStatus::InTransit, "Transit Hub", "Package arrived at transit hub"),
        CatalogEntry::new(
            ShipmentStatus::Delivered,
            "Destination",
            "Package delivered to recipient",
        ),
    ],
    opaque: [
        CatalogEntry::new(
            ShipmentStatus::Processing,
            "New York Sorting Facility, NY",
            "Shipment has been processed and is ready for dispatch.",
        ),
        CatalogEntry::new(
            ShipmentStatus::InTransit,
            "Chicago Distribution Center, IL",
            "Shipment is in transit to the next facility.",
        ),
        CatalogEntry::new(
            ShipmentStatus::OutForDelivery,
            "Los Angeles Distribution Center, CA",
            "Shipment is out for delivery to the recipient.",
        ),
        CatalogEntry::new(
            ShipmentStatus::Delivered,
            "Los Angeles, CA",
            "Shipment has been delivered to the recipient.",
        ),
    ],
    delayed: CatalogEntry::new(
        ShipmentStatus::Delayed,
        "Denver Sorting Facility, CO",
        "Shipment has been delayed due to weather conditions.",
    ),
};

impl StatusCatalog {
    /// Dated pipeline steps, indexed by days since creation (0..=3)
    pub fn dated_timeline(&self) -> &[CatalogEntry] {
        &self.dated
    }

    /// Opaque pipeline canonical progression (Delayed excluded)
    pub fn opaque_progression(&self) -> &[CatalogEntry] {
        &self.opaque
    }

    /// Position of `status` in the opaque progression
    pub fn opaque_index(&self, status: ShipmentStatus) -> Option<usize> {
        self.opaque.iter().position(|e| e.status == status)
    }

    pub fn opaque_entry(&self, status: ShipmentStatus) -> Option<&CatalogEntry> {
        if status == ShipmentStatus::Delayed {
            return Some(&self.delayed);
        }
        self.opaque.iter().find(|e| e.status == status)
    }
}

/// Seed update text written at allocation time
pub const DATED_SEED_DESCRIPTION: &str = "Shipment created and pending processing";
pub const OPAQUE_SEED_DESCRIPTION: &str = "Shipment created and registered for processing";

/// Fixed parties reported by derived shipments (there is no stored record)
pub mod demo {
    use super::ContactInfo;

    pub const DATED_ORIGIN: &str = "New York, USA";
    pub const DATED_DESTINATION: &str = "London, UK";
    pub const DATED_USER_ID: &str = "system";

    pub const OPAQUE_ORIGIN: &str = "New York, NY, USA";
    pub const OPAQUE_DESTINATION: &str = "Los Angeles, CA, USA";

    pub const LISTING_ORIGIN: &str = "New York, NY";
    pub const LISTING_DESTINATION: &str = "Los Angeles, CA";

    pub fn customer() -> ContactInfo {
        ContactInfo {
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            phone: "+1 (555) 123-4567".to_string(),
            address: None,
        }
    }
}
