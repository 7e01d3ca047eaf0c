//! Status derivation engine
//!
//! Rebuilds a shipment projection from nothing but a tracking number and the
//! current instant. No state is read or written.
//!
//! - Dated numbers advance with wall-clock time: the status follows the
//!   number of whole days since the embedded creation date.
//! - Opaque numbers resolve their status from `serial mod 5` and ignore the
//!   creation time entirely; only the synthesized timestamps follow `now`.
//!
//! The two pipelines disagree on whether status depends on time. That
//! asymmetry is kept as-is.

use crate::domain::catalog::{demo, STATUS_CATALOG};
use crate::domain::types::stable_uuid;
use crate::domain::{
    Calendar, Shipment, ShipmentStatus, ShipmentUpdate, TrackingError, TrackingGrammar,
    TrackingKind, TrackingNumber,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

const SECONDS_PER_DAY: i64 = 86_400;

/// Dated numbers: estimated delivery and actual delivery offsets from creation
const DATED_ETA_DAYS: i64 = 7;
const DATED_DELIVERED_AFTER_DAYS: i64 = 6;

/// Opaque numbers: estimated delivery is always three days out
const OPAQUE_ETA_DAYS: i64 = 3;

/// Delayed branch offsets before `now`, in hours
const DELAYED_PROCESSING_AGO_HOURS: i64 = 4 * 24;
const DELAYED_IN_TRANSIT_AGO_HOURS: i64 = 2 * 24;
const DELAYED_EVENT_AGO_HOURS: i64 = 12;

/// Fixed historical timeline served for the demo constant
struct DemoStep {
    status: ShipmentStatus,
    location: &'static str,
    description: &'static str,
    /// (year, month, day, hour, minute) in UTC
    at: (i32, u32, u32, u32, u32),
}

const DEMO_CREATED_ON: (i32, u32, u32) = (2023, 6, 1);
const DEMO_STATUS: ShipmentStatus = ShipmentStatus::InTransit;
const DEMO_STEPS: [DemoStep; 3] = [
    DemoStep {
        status: ShipmentStatus::Pending,
        location: "New York Warehouse",
        description: "Package received at origin facility",
        at: (2023, 6, 1, 10, 0),
    },
    DemoStep {
        status: ShipmentStatus::InTransit,
        location: "JFK International Airport",
        description: "Package departed from origin airport",
        at: (2023, 6, 3, 14, 30),
    },
    DemoStep {
        status: ShipmentStatus::InTransit,
        location: "Heathrow Airport",
        description: "Package arrived at destination airport",
        at: (2023, 6, 4, 8, 15),
    },
];

/// Whole days between two instants, floored (not rounded, not truncated toward zero)
#[inline]
pub fn days_elapsed(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Number of dated timeline steps reached after `days` elapsed days
#[inline]
fn dated_steps_reached(days: i64) -> usize {
    match days {
        d if d < 1 => 1,
        1..=2 => 2,
        _ => 4,
    }
}

/// Status for an opaque serial: `serial mod 5` into the bucket table
#[inline]
pub fn opaque_status(serial: u32) -> ShipmentStatus {
    ShipmentStatus::OPAQUE_BUCKETS[(serial % 5) as usize]
}

pub struct DerivationEngine {
    grammar: TrackingGrammar,
    calendar: Calendar,
}

impl DerivationEngine {
    /// `calendar` is the calendar whose midnight starts a dated number's day.
    pub fn new(grammar: TrackingGrammar, calendar: impl Into<Calendar>) -> Self {
        Self { grammar, calendar: calendar.into() }
    }

    /// Route by format: opaque numbers go to the opaque pipeline, everything
    /// else must satisfy the dated grammar (NotFound otherwise).
    pub fn derive(&self, raw: &str, now: DateTime<Utc>) -> Result<Shipment, TrackingError> {
        match self.grammar.parse_opaque(raw) {
            Some(number) => self.project_opaque(&number, now),
            None => self.derive_dated(raw, now),
        }
    }

    /// Dated pipeline. Unknown formats are `NotFound`.
    pub fn derive_dated(&self, raw: &str, now: DateTime<Utc>) -> Result<Shipment, TrackingError> {
        let number = self
            .grammar
            .parse_dated(raw)
            .ok_or_else(|| TrackingError::NotFound("Invalid tracking number format".to_string()))?;

        match number.kind() {
            TrackingKind::Demo => self.project_demo(&number),
            TrackingKind::Dated { date, .. } => self.project_dated(&number, date, now),
            TrackingKind::Opaque { .. } => {
                Err(TrackingError::Internal(format!("opaque number {number} in dated pipeline")))
            }
        }
    }

    /// Opaque pipeline. Malformed numbers are `Validation` errors.
    pub fn derive_opaque(&self, raw: &str, now: DateTime<Utc>) -> Result<Shipment, TrackingError> {
        let number = self.grammar.parse_opaque(raw).ok_or_else(|| {
            TrackingError::Validation("Invalid tracking number format".to_string())
        })?;
        self.project_opaque(&number, now)
    }

    /// Local midnight of `date` in the engine's calendar
    fn creation_instant(&self, date: NaiveDate) -> Result<DateTime<Utc>, TrackingError> {
        self.calendar
            .start_of_day(date)
            .ok_or_else(|| TrackingError::Internal(format!("no calendar midnight for {date}")))
    }

    fn project_dated(
        &self,
        number: &TrackingNumber,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Shipment, TrackingError> {
        let created = self.creation_instant(date)?;
        let reached = dated_steps_reached(days_elapsed(created, now));
        let ns = shipment_namespace(number);

        let updates: Vec<ShipmentUpdate> = STATUS_CATALOG.dated_timeline()[..reached]
            .iter()
            .enumerate()
            .map(|(k, entry)| {
                ShipmentUpdate::new(
                    update_id(&ns, k),
                    entry.status,
                    entry.location,
                    created + Duration::days(k as i64),
                    entry.description,
                )
            })
            .collect();

        let status = updates.last().map(|u| u.status).unwrap_or(ShipmentStatus::Pending);
        let actual_delivery = (status == ShipmentStatus::Delivered)
            .then(|| created + Duration::days(DATED_DELIVERED_AFTER_DAYS));

        Ok(dated_shipment(number, ns, status, created, actual_delivery, updates))
    }

    fn project_demo(&self, number: &TrackingNumber) -> Result<Shipment, TrackingError> {
        let (y, m, d) = DEMO_CREATED_ON;
        let date = NaiveDate::from_ymd_opt(y, m, d)
            .ok_or_else(|| TrackingError::Internal("invalid demo creation date".to_string()))?;
        let created = self.creation_instant(date)?;
        let ns = shipment_namespace(number);

        let updates = DEMO_STEPS
            .iter()
            .enumerate()
            .map(|(k, step)| {
                let (y, mo, d, h, mi) = step.at;
                let timestamp = utc(y, mo, d, h, mi).ok_or_else(|| {
                    TrackingError::Internal(format!("invalid demo timestamp {:?}", step.at))
                })?;
                Ok(ShipmentUpdate::new(
                    update_id(&ns, k),
                    step.status,
                    step.location,
                    timestamp,
                    step.description,
                ))
            })
            .collect::<Result<Vec<_>, TrackingError>>()?;

        Ok(dated_shipment(number, ns, DEMO_STATUS, created, None, updates))
    }

    fn project_opaque(
        &self,
        number: &TrackingNumber,
        now: DateTime<Utc>,
    ) -> Result<Shipment, TrackingError> {
        let TrackingKind::Opaque { serial } = number.kind() else {
            return Err(TrackingError::Internal(format!("{number} is not an opaque number")));
        };

        let status = opaque_status(serial);
        let ns = shipment_namespace(number);
        let updates = if status == ShipmentStatus::Delayed {
            delayed_timeline(&ns, now)
        } else {
            let current = STATUS_CATALOG.opaque_index(status).ok_or_else(|| {
                TrackingError::Internal(format!("status {status} missing from catalog"))
            })?;
            STATUS_CATALOG.opaque_progression()[..=current]
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    ShipmentUpdate::new(
                        update_id(&ns, i),
                        entry.status,
                        entry.location,
                        now - Duration::days((current - i) as i64),
                        entry.description,
                    )
                })
                .collect()
        };

        // Opaque numbers carry no creation date; the first event stands in for it
        let created_at = updates.first().map(|u| u.timestamp).unwrap_or(now);

        Ok(Shipment {
            id: ns.to_string(),
            tracking_number: number.as_str().to_string(),
            origin: demo::OPAQUE_ORIGIN.to_string(),
            destination: demo::OPAQUE_DESTINATION.to_string(),
            status,
            estimated_delivery: now + Duration::days(OPAQUE_ETA_DAYS),
            actual_delivery: None,
            user_id: None,
            created_at,
            customer: Some(demo::customer()),
            sender_info: None,
            recipient_info: None,
            package_info: None,
            updates,
        })
    }
}

fn delayed_timeline(ns: &Uuid, now: DateTime<Utc>) -> Vec<ShipmentUpdate> {
    let steps = [
        (ShipmentStatus::Processing, DELAYED_PROCESSING_AGO_HOURS),
        (ShipmentStatus::InTransit, DELAYED_IN_TRANSIT_AGO_HOURS),
        (ShipmentStatus::Delayed, DELAYED_EVENT_AGO_HOURS),
    ];
    steps
        .iter()
        .enumerate()
        .filter_map(|(i, &(status, hours_ago))| {
            STATUS_CATALOG.opaque_entry(status).map(|entry| {
                ShipmentUpdate::new(
                    update_id(ns, i),
                    status,
                    entry.location,
                    now - Duration::hours(hours_ago),
                    entry.description,
                )
            })
        })
        .collect()
}

fn dated_shipment(
    number: &TrackingNumber,
    ns: Uuid,
    status: ShipmentStatus,
    created: DateTime<Utc>,
    actual_delivery: Option<DateTime<Utc>>,
    updates: Vec<ShipmentUpdate>,
) -> Shipment {
    Shipment {
        id: ns.to_string(),
        tracking_number: number.as_str().to_string(),
        origin: demo::DATED_ORIGIN.to_string(),
        destination: demo::DATED_DESTINATION.to_string(),
        status,
        estimated_delivery: created + Duration::days(DATED_ETA_DAYS),
        actual_delivery,
        user_id: Some(demo::DATED_USER_ID.to_string()),
        created_at: created,
        customer: None,
        sender_info: None,
        recipient_info: None,
        package_info: None,
        updates,
    }
}

/// Stable shipment id so repeated derivations are byte-identical
fn shipment_namespace(number: &TrackingNumber) -> Uuid {
    stable_uuid(&Uuid::NAMESPACE_URL, number.as_str())
}

fn update_id(ns: &Uuid, position: usize) -> String {
    stable_uuid(ns, &position.to_string()).to_string()
}

fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0).map(|n| n.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn engine() -> DerivationEngine {
        DerivationEngine::new(TrackingGrammar::default(), FixedOffset::east_opt(0).unwrap())
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_days_elapsed_floors() {
        let t0 = at(2023, 6, 1, 0);
        assert_eq!(days_elapsed(t0, t0), 0);
        assert_eq!(days_elapsed(t0, t0 + Duration::hours(23)), 0);
        assert_eq!(days_elapsed(t0, t0 + Duration::days(1)), 1);
        assert_eq!(days_elapsed(t0, t0 + Duration::hours(71)), 2);
        assert_eq!(days_elapsed(t0, t0 - Duration::hours(1)), -1);
    }

    #[test]
    fn test_dated_steps_reached() {
        assert_eq!(dated_steps_reached(-3), 1);
        assert_eq!(dated_steps_reached(0), 1);
        assert_eq!(dated_steps_reached(1), 2);
        assert_eq!(dated_steps_reached(2), 2);
        assert_eq!(dated_steps_reached(3), 4);
        assert_eq!(dated_steps_reached(400), 4);
    }

    #[test]
    fn test_opaque_status_table() {
        assert_eq!(opaque_status(10_000_000), ShipmentStatus::Processing);
        assert_eq!(opaque_status(10_000_001), ShipmentStatus::InTransit);
        assert_eq!(opaque_status(10_000_002), ShipmentStatus::OutForDelivery);
        assert_eq!(opaque_status(10_000_003), ShipmentStatus::Delivered);
        assert_eq!(opaque_status(4), ShipmentStatus::Delayed);
    }

    #[test]
    fn test_dated_in_transit_timeline() {
        let shipment = engine().derive("GSS-20230601-00001", at(2023, 6, 2, 9)).unwrap();

        assert_eq!(shipment.status, ShipmentStatus::InTransit);
        assert_eq!(shipment.updates.len(), 2);
        assert_eq!(shipment.updates[1].location, "Departure Facility");
        assert_eq!(shipment.updates[1].timestamp, at(2023, 6, 2, 0));
        assert_eq!(shipment.actual_delivery, None);
        assert_eq!(shipment.estimated_delivery, at(2023, 6, 8, 0));
        assert_eq!(shipment.origin, demo::DATED_ORIGIN);
        assert_eq!(shipment.user_id.as_deref(), Some("system"));
    }

    #[test]
    fn test_dated_delivered_has_actual_delivery() {
        let shipment = engine().derive("GSS-20230601-00001", at(2023, 7, 1, 0)).unwrap();

        assert_eq!(shipment.status, ShipmentStatus::Delivered);
        assert_eq!(shipment.actual_delivery, Some(at(2023, 6, 7, 0)));
        let stamps: Vec<_> = shipment.updates.iter().map(|u| u.timestamp).collect();
        assert_eq!(
            stamps,
            vec![at(2023, 6, 1, 0), at(2023, 6, 2, 0), at(2023, 6, 3, 0), at(2023, 6, 4, 0)]
        );
    }

    #[test]
    fn test_dated_creation_follows_calendar_offset() {
        // UTC+2: midnight June 1st local is 22:00Z May 31st
        let east = DerivationEngine::new(
            TrackingGrammar::default(),
            FixedOffset::east_opt(2 * 3600).unwrap(),
        );
        let shipment = east.derive("GSS-20230601-00001", at(2023, 6, 1, 22)).unwrap();
        assert_eq!(shipment.created_at, at(2023, 5, 31, 22));
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
    }

    #[test]
    fn test_future_dated_number_is_pending() {
        let shipment = engine().derive("GSS-20300101-00001", at(2023, 6, 1, 0)).unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert_eq!(shipment.updates.len(), 1);
    }

    #[test]
    fn test_demo_number_is_fixed() {
        let a = engine().derive("GSS1234567890", at(2020, 1, 1, 0)).unwrap();
        let b = engine().derive("GSS1234567890", at(2030, 1, 1, 0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.status, ShipmentStatus::InTransit);
        assert_eq!(a.created_at, at(2023, 6, 1, 0));
        assert_eq!(a.updates[2].location, "Heathrow Airport");
        assert_eq!(a.updates[1].timestamp, Utc.with_ymd_and_hms(2023, 6, 3, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_opaque_progression_timestamps() {
        let now = at(2024, 2, 10, 12);
        let shipment = engine().derive_opaque("SHPEX-00000002", now).unwrap();

        assert_eq!(shipment.status, ShipmentStatus::OutForDelivery);
        let stamps: Vec<_> = shipment.updates.iter().map(|u| u.timestamp).collect();
        assert_eq!(stamps, vec![now - Duration::days(2), now - Duration::days(1), now]);
        assert!(shipment.updates.iter().all(|u| u.completed));
        assert_eq!(shipment.estimated_delivery, now + Duration::days(3));
        assert_eq!(shipment.customer.as_ref().unwrap().name, "John Doe");
    }

    #[test]
    fn test_opaque_processing_has_single_event() {
        let now = at(2024, 2, 10, 12);
        let shipment = engine().derive_opaque("SHPEX-00000005", now).unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Processing);
        assert_eq!(shipment.updates.len(), 1);
        assert_eq!(shipment.updates[0].timestamp, now);
    }

    #[test]
    fn test_error_kinds_per_pipeline() {
        let now = at(2024, 1, 1, 0);
        assert!(matches!(
            engine().derive_dated("not-a-number", now),
            Err(TrackingError::NotFound(_))
        ));
        assert!(matches!(
            engine().derive_opaque("not-a-number", now),
            Err(TrackingError::Validation(_))
        ));
        assert!(matches!(engine().derive("not-a-number", now), Err(TrackingError::NotFound(_))));
        // The dated endpoint does not serve opaque numbers by itself
        assert!(matches!(
            engine().derive_dated("SHPEX-12345678", now),
            Err(TrackingError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_ids_are_stable_and_distinct() {
        let now = at(2024, 1, 1, 0);
        let shipment = engine().derive("SHPEX-00000003", now).unwrap();
        let mut ids: Vec<_> = shipment.updates.iter().map(|u| u.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(engine().derive("SHPEX-00000003", now).unwrap().id, shipment.id);
    }
}
