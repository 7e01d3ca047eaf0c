//! Request schemas, one per endpoint
//!
//! Every field is optional at the serde level so that a missing field turns
//! into a typed `Validation` error with the field name, not a parse failure.

use crate::domain::{ContactInfo, PackageInfo, TrackingError};
use crate::services::NewShipment;
use serde::{Deserialize, Deserializer, Serialize};

/// Non-blank value of a required field, or `"<field> is required"`
fn required(value: Option<String>, field: &str) -> Result<String, TrackingError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TrackingError::missing_field(field)),
    }
}

/// Accept `"2.5"`, `2.5`, or `2` for free-form numeric form fields
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct StringOrNumberVisitor;

    impl<'de> Visitor<'de> for StringOrNumberVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

/// POST /track
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackRequest {
    pub tracking_number: Option<String>,
}

impl TrackRequest {
    pub fn validate(self) -> Result<String, TrackingError> {
        required(self.tracking_number, "trackingNumber").map_err(|_| {
            TrackingError::Validation("Missing required field: trackingNumber".to_string())
        })
    }
}

/// POST /tracking (opaque numbers only)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrackingRequest {
    pub tracking: Option<String>,
}

impl TrackingRequest {
    pub fn validate(self) -> Result<String, TrackingError> {
        required(self.tracking, "tracking")
            .map_err(|_| TrackingError::Validation("Tracking number is required".to_string()))
    }
}

/// POST /generate-tracking
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateTrackingRequest {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateTracking {
    pub origin: String,
    pub destination: String,
    pub user_id: String,
}

impl GenerateTrackingRequest {
    pub fn validate(self) -> Result<GenerateTracking, TrackingError> {
        let missing = || {
            TrackingError::Validation(
                "Missing required fields: origin, destination, and userId are required".to_string(),
            )
        };
        Ok(GenerateTracking {
            origin: required(self.origin, "origin").map_err(|_| missing())?,
            destination: required(self.destination, "destination").map_err(|_| missing())?,
            user_id: required(self.user_id, "userId").map_err(|_| missing())?,
        })
    }
}

/// POST /shipments
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub sender_phone: Option<String>,
    pub sender_address: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_address: Option<String>,
    pub package_type: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub weight: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub dimensions: Option<String>,
    pub description: Option<String>,
}

impl CreateShipmentRequest {
    /// Fields are checked in form order; the first missing one is reported
    pub fn validate(self) -> Result<NewShipment, TrackingError> {
        let sender = ContactInfo {
            name: required(self.sender_name, "senderName")?,
            email: required(self.sender_email, "senderEmail")?,
            phone: required(self.sender_phone, "senderPhone")?,
            address: Some(required(self.sender_address, "senderAddress")?),
        };
        let recipient = ContactInfo {
            name: required(self.recipient_name, "recipientName")?,
            email: required(self.recipient_email, "recipientEmail")?,
            phone: required(self.recipient_phone, "recipientPhone")?,
            address: Some(required(self.recipient_address, "recipientAddress")?),
        };
        let package = PackageInfo {
            package_type: required(self.package_type, "packageType")?,
            weight: required(self.weight, "weight")?,
            dimensions: required(self.dimensions, "dimensions")?,
            description: required(self.description, "description")?,
        };
        Ok(NewShipment { sender, recipient, package })
    }
}

/// POST /contact
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactRequest {
    pub fn validate(self) -> Result<ContactMessage, TrackingError> {
        let contact = ContactMessage {
            name: required(self.name, "name")?,
            email: required(self.email, "email")?,
            subject: required(self.subject, "subject")?,
            message: required(self.message, "message")?,
        };
        if !is_plausible_email(&contact.email) {
            return Err(TrackingError::Validation("Invalid email format".to_string()));
        }
        Ok(contact)
    }
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the domain
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// POST /profile
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
}

/// Profile echoed back after an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUser {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
}

impl ProfileRequest {
    pub fn validate(self) -> Result<ProfileUser, TrackingError> {
        let name = required(self.name, "name")
            .map_err(|_| TrackingError::Validation("Name is required".to_string()))?;
        Ok(ProfileUser {
            name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            address: self.address,
        })
    }
}
