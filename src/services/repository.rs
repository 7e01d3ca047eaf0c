//! Shipment repository abstraction
//!
//! Handlers never touch a global shipment table; they receive a
//! `ShipmentRepository` through the service. The in-memory implementation
//! backs both the server and the tests.

use crate::domain::{Shipment, TrackingError};
use parking_lot::RwLock;
use std::collections::HashMap;

pub trait ShipmentRepository: Send + Sync {
    /// Look up a stored shipment by tracking number
    fn get(&self, tracking_number: &str) -> Option<Shipment>;

    /// All stored shipments, newest first
    fn list(&self) -> Vec<Shipment>;

    /// Store a new shipment. Fails with `Conflict` if the tracking number is taken.
    fn create(&self, shipment: Shipment) -> Result<Shipment, TrackingError>;

    fn contains(&self, tracking_number: &str) -> bool {
        self.get(tracking_number).is_some()
    }

    fn count(&self) -> usize {
        self.list().len()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryShipmentRepository {
    by_tracking: RwLock<HashMap<String, Shipment>>,
}

impl InMemoryShipmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_tracking.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tracking.read().is_empty()
    }
}

impl ShipmentRepository for InMemoryShipmentRepository {
    fn get(&self, tracking_number: &str) -> Option<Shipment> {
        self.by_tracking.read().get(tracking_number).cloned()
    }

    fn list(&self) -> Vec<Shipment> {
        let mut shipments: Vec<Shipment> = self.by_tracking.read().values().cloned().collect();
        shipments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.tracking_number.cmp(&b.tracking_number))
        });
        shipments
    }

    fn create(&self, shipment: Shipment) -> Result<Shipment, TrackingError> {
        let mut by_tracking = self.by_tracking.write();
        if by_tracking.contains_key(&shipment.tracking_number) {
            return Err(TrackingError::Conflict(format!(
                "Tracking number {} is already in use",
                shipment.tracking_number
            )));
        }
        by_tracking.insert(shipment.tracking_number.clone(), shipment.clone());
        Ok(shipment)
    }

    fn contains(&self, tracking_number: &str) -> bool {
        self.by_tracking.read().contains_key(tracking_number)
    }

    fn count(&self) -> usize {
        self.len()
    }
}
