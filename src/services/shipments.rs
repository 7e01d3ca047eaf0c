//! Shipment service - the facade the HTTP layer calls
//!
//! Wires the allocator, derivation engine, repository, clock, and metrics
//! together. Allocation adds a uniqueness check against the repository and
//! redraws on collision.

use crate::domain::catalog::demo;
use crate::domain::types::new_uuid_v7;
use crate::domain::{
    ContactInfo, PackageInfo, Shipment, ShipmentStatus, TrackingError, TrackingFormat,
};
use crate::infra::clock::Clock;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::infra::random::RandomSource;
use crate::services::allocator::{AllocationContext, Allocator};
use crate::services::derivation::DerivationEngine;
use crate::services::repository::ShipmentRepository;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Validated input for a full shipment creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShipment {
    pub sender: ContactInfo,
    pub recipient: ContactInfo,
    pub package: PackageInfo,
}

/// First comma-separated segment of an address ("Austin, TX 78701" -> "Austin")
fn locality(address: Option<&str>) -> &str {
    address.and_then(|a| a.split(',').next()).map(str::trim).unwrap_or_default()
}

pub struct ShipmentService {
    repository: Arc<dyn ShipmentRepository>,
    allocator: Allocator,
    engine: DerivationEngine,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
    metrics: Arc<Metrics>,
    max_allocation_attempts: u32,
}

impl ShipmentService {
    pub fn new(
        config: &Config,
        repository: Arc<dyn ShipmentRepository>,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn RandomSource>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let calendar = config.calendar();
        Self {
            repository,
            allocator: Allocator::new(config.grammar(), calendar, rng.clone()),
            engine: DerivationEngine::new(config.grammar(), calendar),
            clock,
            rng,
            metrics,
            max_allocation_attempts: config.max_allocation_attempts(),
        }
    }

    /// Lookup through either pipeline (POST /track)
    pub fn track(&self, tracking_number: &str) -> Result<Shipment, TrackingError> {
        let result = self.engine.derive(tracking_number, self.clock.now());
        self.observe_derivation(tracking_number, &result);
        result
    }

    /// Lookup restricted to opaque numbers (POST /tracking)
    pub fn track_opaque(&self, tracking_number: &str) -> Result<Shipment, TrackingError> {
        let result = self.engine.derive_opaque(tracking_number, self.clock.now());
        self.observe_derivation(tracking_number, &result);
        result
    }

    fn observe_derivation(&self, tracking_number: &str, result: &Result<Shipment, TrackingError>) {
        match result {
            Ok(shipment) => {
                self.metrics.record_derivation();
                debug!(
                    tracking_number = %tracking_number,
                    status = %shipment.status,
                    updates = %shipment.updates.len(),
                    "tracking_derived"
                );
            }
            Err(e) => {
                debug!(tracking_number = %tracking_number, error = %e, kind = e.kind(), "tracking_rejected");
            }
        }
    }

    /// Dated-format allocation for a user (POST /generate-tracking)
    pub fn generate_tracking(
        &self,
        origin: &str,
        destination: &str,
        user_id: &str,
    ) -> Result<Shipment, TrackingError> {
        let ctx = AllocationContext::new(origin, destination, TrackingFormat::Dated)
            .with_user_id(user_id);
        self.allocate_and_store(&ctx, |_| {})
    }

    /// Opaque-format allocation with full party/package details (POST /shipments)
    pub fn create_shipment(&self, new: NewShipment) -> Result<Shipment, TrackingError> {
        let ctx = AllocationContext::new(
            locality(new.sender.address.as_deref()),
            locality(new.recipient.address.as_deref()),
            TrackingFormat::Opaque,
        );
        self.allocate_and_store(&ctx, |shipment| {
            shipment.sender_info = Some(new.sender.clone());
            shipment.recipient_info = Some(new.recipient.clone());
            shipment.package_info = Some(new.package.clone());
        })
    }

    /// Every stored shipment, newest first (GET /shipments)
    pub fn list_shipments(&self) -> Vec<Shipment> {
        self.repository.list()
    }

    pub fn stored_count(&self) -> usize {
        self.repository.count()
    }

    /// Draw numbers until one is free in the repository, then store it.
    /// A number taken between the check and the insert is redrawn too.
    fn allocate_and_store(
        &self,
        ctx: &AllocationContext,
        decorate: impl Fn(&mut Shipment),
    ) -> Result<Shipment, TrackingError> {
        let now = self.clock.now();

        for attempt in 1..=self.max_allocation_attempts {
            let mut shipment = self.allocator.allocate(ctx, now)?;
            if self.repository.contains(&shipment.tracking_number) {
                self.metrics.record_allocation_collision();
                warn!(
                    tracking_number = %shipment.tracking_number,
                    attempt = %attempt,
                    "tracking_number_collision"
                );
                continue;
            }

            decorate(&mut shipment);
            let tracking_number = shipment.tracking_number.clone();
            match self.repository.create(shipment) {
                Ok(stored) => {
                    self.metrics.record_allocation();
                    info!(
                        tracking_number = %stored.tracking_number,
                        status = %stored.status,
                        origin = %stored.origin,
                        destination = %stored.destination,
                        attempt = %attempt,
                        "shipment_allocated"
                    );
                    return Ok(stored);
                }
                Err(TrackingError::Conflict(_)) => {
                    self.metrics.record_allocation_collision();
                    warn!(
                        tracking_number = %tracking_number,
                        attempt = %attempt,
                        "tracking_number_taken_concurrently"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        error!(attempts = %self.max_allocation_attempts, format = %ctx.format.as_str(), "tracking_number_space_exhausted");
        Err(TrackingError::Internal(format!(
            "no unique tracking number after {} attempts",
            self.max_allocation_attempts
        )))
    }

    /// Fill the repository with synthetic opaque shipments for the listing page.
    /// Returns the number actually stored.
    pub fn seed_demo_shipments(&self, count: usize) -> usize {
        let now = self.clock.now();
        let mut stored = 0;

        for i in 0..count {
            let offset = Duration::days(i as i64 + 1);
            let number = self.allocator.next_tracking_number(TrackingFormat::Opaque, now);
            let bucket = self.rng.next_in_range(0, ShipmentStatus::OPAQUE_BUCKETS.len() as u32 - 1);
            let status = ShipmentStatus::OPAQUE_BUCKETS[bucket as usize];

            let shipment = Shipment {
                id: new_uuid_v7(),
                tracking_number: number.into_string(),
                origin: demo::LISTING_ORIGIN.to_string(),
                destination: demo::LISTING_DESTINATION.to_string(),
                status,
                estimated_delivery: now + offset,
                actual_delivery: None,
                user_id: None,
                created_at: now - offset,
                customer: None,
                sender_info: None,
                recipient_info: None,
                package_info: None,
                updates: Vec::new(),
            };

            match self.repository.create(shipment) {
                Ok(_) => stored += 1,
                Err(e) => warn!(error = %e, "demo_seed_skipped"),
            }
        }

        info!(requested = %count, stored = %stored, "demo_shipments_seeded");
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::clock::FixedClock;
    use crate::infra::random::{FixedRandomSource, SeededRandomSource};
    use crate::services::repository::InMemoryShipmentRepository;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Accepts the first insert as if another request stored it first
    struct RacedRepository {
        inner: InMemoryShipmentRepository,
        raced: AtomicBool,
    }

    impl ShipmentRepository for RacedRepository {
        fn get(&self, tracking_number: &str) -> Option<Shipment> {
            self.inner.get(tracking_number)
        }

        fn list(&self) -> Vec<Shipment> {
            self.inner.list()
        }

        fn create(&self, shipment: Shipment) -> Result<Shipment, TrackingError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let winner = Shipment { sender_info: None, ..shipment.clone() };
                self.inner.create(winner)?;
            }
            self.inner.create(shipment)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
    }

    fn service_with(
        rng: Arc<dyn RandomSource>,
    ) -> (ShipmentService, Arc<InMemoryShipmentRepository>, Arc<FixedClock>, Arc<Metrics>) {
        let repo = Arc::new(InMemoryShipmentRepository::new());
        let clock = Arc::new(FixedClock::new(t0()));
        let metrics = Arc::new(Metrics::new());
        let config = Config::default().with_utc_offset_minutes(0);
        let service = ShipmentService::new(&config, repo.clone(), clock.clone(), rng, metrics.clone());
        (service, repo, clock, metrics)
    }

    fn party(address: &str) -> ContactInfo {
        ContactInfo {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555-0100".to_string(),
            address: Some(address.to_string()),
        }
    }

    fn package() -> PackageInfo {
        PackageInfo {
            package_type: "box".to_string(),
            weight: "2.5".to_string(),
            dimensions: "10x10x10".to_string(),
            description: "books".to_string(),
        }
    }

    #[test]
    fn test_locality() {
        assert_eq!(locality(Some("Austin, TX 78701")), "Austin");
        assert_eq!(locality(Some("Nowhere")), "Nowhere");
        assert_eq!(locality(Some(" , TX")), "");
        assert_eq!(locality(None), "");
    }

    #[test]
    fn test_generate_tracking_stores_dated_shipment() {
        let (service, repo, _, metrics) = service_with(Arc::new(FixedRandomSource::new(1)));
        let shipment = service.generate_tracking("Boston", "Paris", "user-9").unwrap();

        assert_eq!(shipment.tracking_number, "GSS-20230601-00001");
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert!(repo.contains("GSS-20230601-00001"));
        assert_eq!(metrics.snapshot().allocations_total, 1);
    }

    #[test]
    fn test_allocation_redraws_until_exhausted() {
        // A fixed RNG always draws the same number, so the second call must give up
        let (service, repo, _, metrics) = service_with(Arc::new(FixedRandomSource::new(1)));
        service.generate_tracking("Boston", "Paris", "user-9").unwrap();

        let err = service.generate_tracking("Boston", "Paris", "user-9").unwrap_err();
        assert!(matches!(err, TrackingError::Internal(_)));
        assert_eq!(repo.len(), 1);
        assert_eq!(metrics.snapshot().allocation_collisions, 8);
    }

    #[test]
    fn test_create_shipment_carries_parties() {
        let (service, _, _, _) = service_with(Arc::new(SeededRandomSource::new(3)));
        let shipment = service
            .create_shipment(NewShipment {
                sender: party("Austin, TX"),
                recipient: party("Denver, CO"),
                package: package(),
            })
            .unwrap();

        assert!(shipment.tracking_number.starts_with("SHPEX-"));
        assert_eq!(shipment.origin, "Austin");
        assert_eq!(shipment.destination, "Denver");
        assert_eq!(shipment.status, ShipmentStatus::Processing);
        assert_eq!(shipment.estimated_delivery, t0() + Duration::days(5));
        assert_eq!(shipment.package_info.unwrap().weight, "2.5");
        assert_eq!(shipment.sender_info.unwrap().address.as_deref(), Some("Austin, TX"));
    }

    #[test]
    fn test_concurrent_insert_is_redrawn() {
        let repo = Arc::new(RacedRepository {
            inner: InMemoryShipmentRepository::new(),
            raced: AtomicBool::new(false),
        });
        let metrics = Arc::new(Metrics::new());
        let config = Config::default().with_utc_offset_minutes(0);
        let service = ShipmentService::new(
            &config,
            repo.clone(),
            Arc::new(FixedClock::new(t0())),
            Arc::new(SeededRandomSource::new(5)),
            metrics.clone(),
        );

        let shipment = service
            .create_shipment(NewShipment {
                sender: party("Austin, TX"),
                recipient: party("Denver, CO"),
                package: package(),
            })
            .unwrap();

        assert_eq!(repo.count(), 2);
        assert_eq!(metrics.snapshot().allocation_collisions, 1);
        assert_eq!(metrics.snapshot().allocations_total, 1);
        let stored = repo.get(&shipment.tracking_number).unwrap();
        assert_eq!(stored.sender_info.unwrap().address.as_deref(), Some("Austin, TX"));
    }

    #[test]
    fn test_create_shipment_rejects_blank_origin() {
        let (service, repo, _, _) = service_with(Arc::new(SeededRandomSource::new(3)));
        let err = service
            .create_shipment(NewShipment {
                sender: party(", TX"),
                recipient: party("Denver"),
                package: package(),
            })
            .unwrap_err();
        assert_eq!(err, TrackingError::missing_field("origin"));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_track_advances_with_clock() {
        let (service, _, clock, metrics) = service_with(Arc::new(FixedRandomSource::new(1)));
        let shipment = service.generate_tracking("Boston", "Paris", "u").unwrap();
        let number = shipment.tracking_number;

        assert_eq!(service.track(&number).unwrap().status, ShipmentStatus::Pending);
        clock.advance(Duration::days(1));
        assert_eq!(service.track(&number).unwrap().status, ShipmentStatus::InTransit);
        clock.advance(Duration::days(2));
        assert_eq!(service.track(&number).unwrap().status, ShipmentStatus::Delivered);
        assert_eq!(metrics.snapshot().derivations_total, 3);
    }

    #[test]
    fn test_seed_demo_shipments() {
        let (service, repo, _, _) = service_with(Arc::new(SeededRandomSource::new(11)));
        assert_eq!(service.seed_demo_shipments(5), 5);
        assert_eq!(repo.len(), 5);

        let listed = service.list_shipments();
        assert_eq!(listed[0].created_at, t0() - Duration::days(1));
        assert_eq!(listed[4].created_at, t0() - Duration::days(5));
        assert!(listed.iter().all(|s| s.origin == "New York, NY" && s.updates.is_empty()));
    }
}
