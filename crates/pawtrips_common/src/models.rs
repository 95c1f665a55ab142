//! Domain types shared by the feature crates.
//!
//! Ids are UUID v4 strings. Money is in the smallest currency unit.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PawtripsError;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = PawtripsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(PawtripsError::ParseError(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// What a provider sells. Trips may span several days.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Experience,
    Class,
    Trip,
}

string_enum!(ProductKind {
    Experience => "experience",
    Class => "class",
    Trip => "trip",
});

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

string_enum!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

impl BookingStatus {
    /// pending -> confirmed | cancelled, confirmed -> cancelled.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    /// Whether a booking in this state holds seats on its slot.
    pub fn holds_capacity(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationStatus {
    Pending,
    Approved,
    Rejected,
}

string_enum!(CancellationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

impl CancellationStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, CancellationStatus::Pending)
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedBy {
    Customer,
    Admin,
}

string_enum!(RequestedBy {
    Customer => "customer",
    Admin => "admin",
});

/// A provider profile.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// An experience, class or trip offered by a provider.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub provider_id: String,
    pub kind: ProductKind,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_per_adult_cents: i64,
    pub price_per_dog_cents: i64,
    pub currency: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Total price for a party, `None` on overflow.
    pub fn price_for(&self, adults: i64, dogs: i64) -> Option<i64> {
        let adult_total = self.price_per_adult_cents.checked_mul(adults)?;
        let dog_total = self.price_per_dog_cents.checked_mul(dogs)?;
        adult_total.checked_add(dog_total)
    }
}

/// Bookable capacity for one product on one date.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: String,
    pub product_id: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    /// Last day for multi-day trips.
    pub end_date: Option<NaiveDate>,
    pub max_adults: i64,
    pub max_dogs: i64,
    pub booked_adults: i64,
    pub booked_dogs: i64,
}

impl AvailabilitySlot {
    pub fn remaining_adults(&self) -> i64 {
        (self.max_adults - self.booked_adults).max(0)
    }

    pub fn remaining_dogs(&self) -> i64 {
        (self.max_dogs - self.booked_dogs).max(0)
    }

    pub fn can_accommodate(&self, adults: i64, dogs: i64) -> bool {
        adults <= self.remaining_adults() && dogs <= self.remaining_dogs()
    }

    pub fn is_sold_out(&self) -> bool {
        self.remaining_adults() == 0
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub product_id: String,
    pub slot_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub adults: i64,
    pub dogs: i64,
    pub total_cents: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_reference: Option<String>,
    pub idempotency_key: Option<String>,
    /// The one checkout session opened for this booking.
    #[serde(default)]
    pub checkout_session_id: Option<String>,
    #[serde(default)]
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn email_matches(&self, email: &str) -> bool {
        self.customer_email.trim().eq_ignore_ascii_case(email.trim())
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRequest {
    pub id: String,
    pub booking_id: String,
    /// Magic-link token. Never serialized into public responses by handlers.
    pub token: String,
    pub requested_by: RequestedBy,
    pub reason: Option<String>,
    pub status: CancellationStatus,
    pub admin_note: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl CancellationRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(max_adults: i64, max_dogs: i64, booked_adults: i64, booked_dogs: i64) -> AvailabilitySlot {
        AvailabilitySlot {
            id: "s1".into(),
            product_id: "p1".into(),
            date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            start_time: None,
            end_date: None,
            max_adults,
            max_dogs,
            booked_adults,
            booked_dogs,
        }
    }

    #[test]
    fn booking_status_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn slot_capacity_checks_both_counters() {
        let s = slot(10, 4, 8, 4);
        assert_eq!(s.remaining_adults(), 2);
        assert_eq!(s.remaining_dogs(), 0);
        assert!(s.can_accommodate(2, 0));
        assert!(!s.can_accommodate(1, 1));
        assert!(!s.can_accommodate(3, 0));
    }

    #[test]
    fn remaining_never_negative() {
        let s = slot(2, 1, 5, 3);
        assert_eq!(s.remaining_adults(), 0);
        assert_eq!(s.remaining_dogs(), 0);
        assert!(s.is_sold_out());
    }

    #[test]
    fn price_overflow_is_detected() {
        let product = Product {
            id: "p".into(),
            provider_id: "v".into(),
            kind: ProductKind::Class,
            title: "Agility".into(),
            description: None,
            location: None,
            price_per_adult_cents: 4500,
            price_per_dog_cents: 1500,
            currency: "chf".into(),
            active: true,
            created_at: Utc::now(),
        };
        assert_eq!(product.price_for(2, 1), Some(10500));
        assert_eq!(product.price_for(i64::MAX, 1), None);
    }

    #[test]
    fn enums_parse_and_display() {
        assert_eq!("trip".parse::<ProductKind>().unwrap(), ProductKind::Trip);
        assert_eq!(BookingStatus::Cancelled.to_string(), "cancelled");
        assert!("approved".parse::<CancellationStatus>().unwrap().is_final());
        assert!("maybe".parse::<CancellationStatus>().is_err());
    }

    #[test]
    fn email_match_ignores_case_and_whitespace() {
        let now = Utc::now();
        let booking = Booking {
            id: "b".into(),
            product_id: "p".into(),
            slot_id: "s".into(),
            customer_name: "Mia".into(),
            customer_email: "Mia@Example.com".into(),
            customer_phone: None,
            notes: None,
            adults: 1,
            dogs: 1,
            total_cents: 100,
            currency: "chf".into(),
            status: BookingStatus::Pending,
            payment_reference: None,
            idempotency_key: None,
            checkout_session_id: None,
            checkout_url: None,
            created_at: now,
            updated_at: now,
        };
        assert!(booking.email_matches(" mia@example.com "));
        assert!(!booking.email_matches("max@example.com"));
    }
}
