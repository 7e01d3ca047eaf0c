//! Domain models - shipments, tracking numbers, and the status catalog
//!
//! - `types` - `Shipment`, `ShipmentUpdate`, `ShipmentStatus`, contact/package blocks
//! - `tracking` - tracking number grammar (dated, opaque, demo constant)
//! - `calendar` - calendar dated numbers are written in
//! - `catalog` - static per-status location and description text
//! - `error` - `TrackingError` taxonomy

pub mod calendar;
pub mod catalog;
pub mod error;
pub mod tracking;
pub mod types;

// Re-export commonly used types at module level
pub use calendar::Calendar;
pub use catalog::{CatalogEntry, StatusCatalog, STATUS_CATALOG};
pub use error::TrackingError;
pub use tracking::{TrackingFormat, TrackingGrammar, TrackingKind, TrackingNumber};
pub use types::{ContactInfo, PackageInfo, Shipment, ShipmentStatus, ShipmentUpdate};
