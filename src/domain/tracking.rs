//! Tracking number grammar
//!
//! Two formats are accepted:
//! - dated: `PREFIX-YYYYMMDD-NNNNN` (creation date + 5-digit serial)
//! - opaque: `PREFIX-NNNNNNNN` (8-digit serial, no embedded date)
//!
//! plus one whitelisted demo constant that resolves to a fixed shipment.

use chrono::NaiveDate;
use std::fmt;

/// Smallest/largest opaque serial; always exactly 8 digits when allocated.
pub const OPAQUE_SERIAL_MIN: u32 = 10_000_000;
pub const OPAQUE_SERIAL_MAX: u32 = 99_999_999;

/// Dated serials are zero-padded to 5 digits.
pub const DATED_SERIAL_MAX: u32 = 99_999;

const DATED_DIGITS: usize = 8;
const DATED_SERIAL_DIGITS: usize = 5;
const OPAQUE_DIGITS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingFormat {
    Dated,
    Opaque,
}

impl TrackingFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingFormat::Dated => "dated",
            TrackingFormat::Opaque => "opaque",
        }
    }
}

/// Parsed form of a tracking number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingKind {
    Dated { date: NaiveDate, serial: u32 },
    Opaque { serial: u32 },
    Demo,
}

/// A validated tracking number. The raw string is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingNumber {
    raw: String,
    kind: TrackingKind,
}

impl TrackingNumber {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> TrackingKind {
        self.kind
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Prefixes and the demo constant, normally taken from config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingGrammar {
    dated_prefix: String,
    opaque_prefix: String,
    demo_number: String,
}

impl Default for TrackingGrammar {
    fn default() -> Self {
        Self::new("GSS", "SHPEX", "GSS1234567890")
    }
}

impl TrackingGrammar {
    pub fn new(
        dated_prefix: impl Into<String>,
        opaque_prefix: impl Into<String>,
        demo_number: impl Into<String>,
    ) -> Self {
        Self {
            dated_prefix: dated_prefix.into(),
            opaque_prefix: opaque_prefix.into(),
            demo_number: demo_number.into(),
        }
    }

    pub fn is_demo(&self, raw: &str) -> bool {
        raw == self.demo_number
    }

    /// Match the dated grammar or the demo constant
    pub fn parse_dated(&self, raw: &str) -> Option<TrackingNumber> {
        if self.is_demo(raw) {
            return Some(TrackingNumber { raw: raw.to_string(), kind: TrackingKind::Demo });
        }

        let rest = raw.strip_prefix(self.dated_prefix.as_str())?.strip_prefix('-')?;
        let (date_part, serial_part) = rest.split_once('-')?;
        if date_part.len() != DATED_DIGITS
            || serial_part.len() != DATED_SERIAL_DIGITS
            || !all_digits(date_part)
            || !all_digits(serial_part)
        {
            return None;
        }

        // Fixed-width fields; calendar-invalid dates (e.g. month 13) are rejected
        let year: i32 = date_part[0..4].parse().ok()?;
        let month: u32 = date_part[4..6].parse().ok()?;
        let day: u32 = date_part[6..8].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let serial: u32 = serial_part.parse().ok()?;

        Some(TrackingNumber { raw: raw.to_string(), kind: TrackingKind::Dated { date, serial } })
    }

    /// Match the opaque grammar
    pub fn parse_opaque(&self, raw: &str) -> Option<TrackingNumber> {
        let digits = raw.strip_prefix(self.opaque_prefix.as_str())?.strip_prefix('-')?;
        if digits.len() != OPAQUE_DIGITS || !all_digits(digits) {
            return None;
        }
        let serial: u32 = digits.parse().ok()?;
        Some(TrackingNumber { raw: raw.to_string(), kind: TrackingKind::Opaque { serial } })
    }

    pub fn format_dated(&self, date: NaiveDate, serial: u32) -> TrackingNumber {
        let raw = format!(
            "{}-{}-{:05}",
            self.dated_prefix,
            date.format("%Y%m%d"),
            serial % (DATED_SERIAL_MAX + 1)
        );
        TrackingNumber { raw, kind: TrackingKind::Dated { date, serial } }
    }

    pub fn format_opaque(&self, serial: u32) -> TrackingNumber {
        let raw = format!("{}-{:08}", self.opaque_prefix, serial % (OPAQUE_SERIAL_MAX + 1));
        TrackingNumber { raw, kind: TrackingKind::Opaque { serial } }
    }
}

#[inline]
fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> TrackingGrammar {
        TrackingGrammar::default()
    }

    #[test]
    fn test_parse_dated() {
        let number = grammar().parse_dated("GSS-20230601-00001").unwrap();
        assert_eq!(
            number.kind(),
            TrackingKind::Dated { date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), serial: 1 }
        );
        assert_eq!(number.as_str(), "GSS-20230601-00001");
    }

    #[test]
    fn test_parse_dated_rejects_near_misses() {
        let g = grammar();
        for raw in [
            "GSS-2023061-00001",
            "GSS-20230601-0001",
            "GSS-20230601-000012",
            "GSS20230601-00001",
            "gss-20230601-00001",
            "GSS-2023O601-00001",
            "GSS-20231301-00001",
            "GSS-20230601-00001 ",
            "SHPEX-12345678",
            "",
        ] {
            assert!(g.parse_dated(raw).is_none(), "{raw} should not parse");
        }
    }

    #[test]
    fn test_parse_demo_constant() {
        let number = grammar().parse_dated("GSS1234567890").unwrap();
        assert_eq!(number.kind(), TrackingKind::Demo);
        assert!(grammar().parse_opaque("GSS1234567890").is_none());
    }

    #[test]
    fn test_parse_opaque() {
        let g = grammar();
        assert_eq!(
            g.parse_opaque("SHPEX-00000004").unwrap().kind(),
            TrackingKind::Opaque { serial: 4 }
        );
        assert!(g.parse_opaque("SHPEX-1234567").is_none());
        assert!(g.parse_opaque("SHPEX-123456789").is_none());
        assert!(g.parse_opaque("SHPEX-1234567a").is_none());
        assert!(g.parse_opaque("SHPEX-+1234567").is_none());
        assert!(g.parse_opaque("not-a-number").is_none());
    }

    #[test]
    fn test_format_pads_serials() {
        let g = grammar();
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(g.format_dated(date, 42).as_str(), "GSS-20240105-00042");
        assert_eq!(g.format_opaque(4).as_str(), "SHPEX-00000004");
        assert_eq!(g.format_opaque(OPAQUE_SERIAL_MIN).as_str(), "SHPEX-10000000");
    }

    #[test]
    fn test_custom_prefixes() {
        let g = TrackingGrammar::new("ACME", "PX", "ACME-DEMO");
        assert!(g.parse_dated("ACME-20240101-12345").is_some());
        assert!(g.parse_opaque("PX-12345678").is_some());
        assert!(g.parse_dated("GSS-20240101-12345").is_none());
        assert_eq!(g.parse_dated("ACME-DEMO").unwrap().kind(), TrackingKind::Demo);
    }
}
