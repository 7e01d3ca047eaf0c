//! Dated numbers against the host time zone across DST changes
//!
//! Kept in its own test binary: it sets `TZ` for the whole process.

use chrono::{NaiveDate, TimeZone, Utc};
use shipment_tracker::domain::{Calendar, TrackingFormat, TrackingGrammar};
use shipment_tracker::infra::{Config, FixedRandomSource};
use shipment_tracker::services::{Allocator, DerivationEngine};
use std::sync::Arc;

/// Central European time: UTC+1, UTC+2 from the last Sunday of March to the
/// last Sunday of October
const CENTRAL_EUROPE: &str = "CET-1CEST,M3.5.0,M10.5.0/3";

#[test]
fn test_host_calendar_follows_dst() {
    std::env::set_var("TZ", CENTRAL_EUROPE);

    let calendar = Config::default().calendar();
    assert_eq!(calendar, Calendar::Local);

    // Local midnight moves with the offset in force on that date
    let winter = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
    let summer = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
    assert_eq!(
        calendar.start_of_day(winter),
        Some(Utc.with_ymd_and_hms(2026, 11, 30, 23, 0, 0).unwrap())
    );
    assert_eq!(
        calendar.start_of_day(summer),
        Some(Utc.with_ymd_and_hms(2026, 6, 30, 22, 0, 0).unwrap())
    );

    let engine = DerivationEngine::new(TrackingGrammar::default(), calendar);
    let now = Utc.with_ymd_and_hms(2026, 12, 2, 0, 0, 0).unwrap();
    let winter_shipment = engine.derive("GSS-20261201-00001", now).unwrap();
    assert_eq!(winter_shipment.created_at, Utc.with_ymd_and_hms(2026, 11, 30, 23, 0, 0).unwrap());
    let summer_shipment = engine.derive("GSS-20260701-00001", now).unwrap();
    assert_eq!(summer_shipment.created_at, Utc.with_ymd_and_hms(2026, 6, 30, 22, 0, 0).unwrap());

    // 22:30Z on the day summer time ends is 23:30 local, still October 25th
    let allocator =
        Allocator::new(TrackingGrammar::default(), calendar, Arc::new(FixedRandomSource::new(3)));
    let after_switch = Utc.with_ymd_and_hms(2026, 10, 25, 22, 30, 0).unwrap();
    let number = allocator.next_tracking_number(TrackingFormat::Dated, after_switch);
    assert_eq!(number.as_str(), "GSS-20261025-00003");

    // 22:30Z the day before is 00:30 local under summer time
    let before_switch = Utc.with_ymd_and_hms(2026, 10, 24, 22, 30, 0).unwrap();
    let number = allocator.next_tracking_number(TrackingFormat::Dated, before_switch);
    assert_eq!(number.as_str(), "GSS-20261025-00003");
}
