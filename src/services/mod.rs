//! Services - allocation, derivation, and storage
//!
//! - `allocator` - Tracking number allocation and seed shipments
//! - `derivation` - Status and timeline derivation from a tracking number
//! - `repository` - Shipment repository trait and in-memory store
//! - `shipments` - Facade used by the HTTP layer

pub mod allocator;
pub mod derivation;
pub mod repository;
pub mod shipments;

// Re-export commonly used types
pub use allocator::{AllocationContext, Allocator};
pub use derivation::DerivationEngine;
pub use repository::{InMemoryShipmentRepository, ShipmentRepository};
pub use shipments::{NewShipment, ShipmentService};
