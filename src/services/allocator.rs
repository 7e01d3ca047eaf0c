//! Tracking number allocator
//!
//! Produces a formatted tracking number for a new shipment and builds the
//! shipment's initial projection with exactly one seed update.
//! Randomness comes from an injected [`RandomSource`].

use crate::domain::catalog::{DATED_SEED_DESCRIPTION, OPAQUE_SEED_DESCRIPTION};
use crate::domain::tracking::{DATED_SERIAL_MAX, OPAQUE_SERIAL_MAX, OPAQUE_SERIAL_MIN};
use crate::domain::types::new_uuid_v7;
use crate::domain::{
    Calendar, Shipment, ShipmentStatus, ShipmentUpdate, TrackingError, TrackingFormat,
    TrackingGrammar, TrackingNumber,
};
use crate::infra::random::RandomSource;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

/// Days from allocation to the estimated delivery, per format
const DATED_ETA_DAYS: i64 = 7;
const OPAQUE_ETA_DAYS: i64 = 5;

/// Inputs to an allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationContext {
    pub origin: String,
    pub destination: String,
    /// Identity of the requester. `Some("")` is rejected; `None` means the
    /// endpoint does not take an identity.
    pub user_id: Option<String>,
    pub format: TrackingFormat,
}

impl AllocationContext {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        format: TrackingFormat,
    ) -> Self {
        Self { origin: origin.into(), destination: destination.into(), user_id: None, format }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    fn validate(&self) -> Result<(), TrackingError> {
        if is_blank(&self.origin) {
            return Err(TrackingError::missing_field("origin"));
        }
        if is_blank(&self.destination) {
            return Err(TrackingError::missing_field("destination"));
        }
        if self.user_id.as_deref().is_some_and(is_blank) {
            return Err(TrackingError::missing_field("userId"));
        }
        Ok(())
    }
}

#[inline]
fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub struct Allocator {
    grammar: TrackingGrammar,
    calendar: Calendar,
    rng: Arc<dyn RandomSource>,
}

impl Allocator {
    /// `calendar` decides which date a dated number carries for a given instant.
    pub fn new(
        grammar: TrackingGrammar,
        calendar: impl Into<Calendar>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self { grammar, calendar: calendar.into(), rng }
    }

    /// Draw a fresh tracking number. Uniqueness is the caller's concern.
    pub fn next_tracking_number(&self, format: TrackingFormat, now: DateTime<Utc>) -> TrackingNumber {
        match format {
            TrackingFormat::Dated => {
                let date = self.calendar.date_of(now);
                let serial = self.rng.next_in_range(0, DATED_SERIAL_MAX);
                self.grammar.format_dated(date, serial)
            }
            TrackingFormat::Opaque => {
                let serial = self.rng.next_in_range(OPAQUE_SERIAL_MIN, OPAQUE_SERIAL_MAX);
                self.grammar.format_opaque(serial)
            }
        }
    }

    /// Validate the context, draw a number, and build the seed shipment
    pub fn allocate(
        &self,
        ctx: &AllocationContext,
        now: DateTime<Utc>,
    ) -> Result<Shipment, TrackingError> {
        ctx.validate()?;
        let tracking_number = self.next_tracking_number(ctx.format, now);
        debug!(
            tracking_number = %tracking_number,
            format = %ctx.format.as_str(),
            "tracking_number_drawn"
        );
        Ok(seed_shipment(tracking_number, ctx, now))
    }
}

fn seed_shipment(tracking_number: TrackingNumber, ctx: &AllocationContext, now: DateTime<Utc>) -> Shipment {
    let (status, description, eta_days) = match ctx.format {
        TrackingFormat::Dated => (ShipmentStatus::Pending, DATED_SEED_DESCRIPTION, DATED_ETA_DAYS),
        TrackingFormat::Opaque => {
            (ShipmentStatus::Processing, OPAQUE_SEED_DESCRIPTION, OPAQUE_ETA_DAYS)
        }
    };

    Shipment {
        id: new_uuid_v7(),
        tracking_number: tracking_number.into_string(),
        origin: ctx.origin.clone(),
        destination: ctx.destination.clone(),
        status,
        estimated_delivery: now + Duration::days(eta_days),
        actual_delivery: None,
        user_id: ctx.user_id.clone(),
        created_at: now,
        customer: None,
        sender_info: None,
        recipient_info: None,
        package_info: None,
        updates: vec![ShipmentUpdate::new(new_uuid_v7(), status, &ctx.origin, now, description)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::random::FixedRandomSource;
    use chrono::{FixedOffset, TimeZone};

    fn allocator(value: u32, offset_hours: i32) -> Allocator {
        Allocator::new(
            TrackingGrammar::default(),
            FixedOffset::east_opt(offset_hours * 3600).unwrap(),
            Arc::new(FixedRandomSource::new(value)),
        )
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_dated_number_is_exact_with_fixed_rng() {
        let number = allocator(42, 0).next_tracking_number(TrackingFormat::Dated, noon());
        assert_eq!(number.as_str(), "GSS-20230601-00042");
    }

    #[test]
    fn test_dated_number_uses_calendar_offset() {
        // 02:00Z is still May 31st five hours west of UTC
        let early = Utc.with_ymd_and_hms(2023, 6, 1, 2, 0, 0).unwrap();
        let number = allocator(7, -5).next_tracking_number(TrackingFormat::Dated, early);
        assert_eq!(number.as_str(), "GSS-20230531-00007");
    }

    #[test]
    fn test_opaque_number_always_eight_digits() {
        let low = allocator(4, 0).next_tracking_number(TrackingFormat::Opaque, noon());
        assert_eq!(low.as_str(), "SHPEX-10000000");

        let high = allocator(u32::MAX, 0).next_tracking_number(TrackingFormat::Opaque, noon());
        assert_eq!(high.as_str(), "SHPEX-99999999");
    }

    #[test]
    fn test_dated_seed_shipment() {
        let ctx = AllocationContext::new("Boston, MA", "Paris, FR", TrackingFormat::Dated)
            .with_user_id("user-1");
        let shipment = allocator(1, 0).allocate(&ctx, noon()).unwrap();

        assert_eq!(shipment.tracking_number, "GSS-20230601-00001");
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert_eq!(shipment.user_id.as_deref(), Some("user-1"));
        assert_eq!(shipment.created_at, noon());
        assert_eq!(shipment.estimated_delivery, noon() + Duration::days(7));
        assert_eq!(shipment.updates.len(), 1);

        let seed = &shipment.updates[0];
        assert_eq!(seed.status, ShipmentStatus::Pending);
        assert_eq!(seed.location, "Boston, MA");
        assert_eq!(seed.timestamp, noon());
        assert_eq!(seed.description, DATED_SEED_DESCRIPTION);
        assert!(seed.completed);
    }

    #[test]
    fn test_opaque_seed_shipment() {
        let ctx = AllocationContext::new("Austin", "Denver", TrackingFormat::Opaque);
        let shipment = allocator(12_345_678, 0).allocate(&ctx, noon()).unwrap();

        assert_eq!(shipment.tracking_number, "SHPEX-12345678");
        assert_eq!(shipment.status, ShipmentStatus::Processing);
        assert_eq!(shipment.estimated_delivery, noon() + Duration::days(5));
        assert_eq!(shipment.updates[0].status, ShipmentStatus::Processing);
        assert!(shipment.user_id.is_none());
    }

    #[test]
    fn test_validation_errors() {
        let alloc = allocator(1, 0);

        let no_origin = AllocationContext::new("", "Paris", TrackingFormat::Dated);
        assert_eq!(
            alloc.allocate(&no_origin, noon()).unwrap_err(),
            TrackingError::missing_field("origin")
        );

        let blank_destination = AllocationContext::new("Boston", "   ", TrackingFormat::Opaque);
        assert_eq!(
            alloc.allocate(&blank_destination, noon()).unwrap_err(),
            TrackingError::missing_field("destination")
        );

        let empty_user =
            AllocationContext::new("Boston", "Paris", TrackingFormat::Dated).with_user_id("");
        assert_eq!(
            alloc.allocate(&empty_user, noon()).unwrap_err(),
            TrackingError::missing_field("userId")
        );
    }
}
