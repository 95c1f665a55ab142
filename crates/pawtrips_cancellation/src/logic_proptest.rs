#[cfg(test)]
mod tests {
    use crate::logic::{check_cutoff, generate_token, slot_start_utc};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use chrono::{Duration, TimeZone, Timelike, Utc};
    use chrono_tz::Tz;
    use pawtrips_common::models::AvailabilitySlot;
    use proptest::prelude::*;

    // A slot starting `minutes_ahead` minutes after the reference instant, in `tz`.
    fn slot_ahead(tz: Tz, minutes_ahead: i64) -> (AvailabilitySlot, chrono::DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2030, 1, 15, 6, 0, 0).unwrap();
        let local_start = (now + Duration::minutes(minutes_ahead)).with_timezone(&tz);
        let slot = AvailabilitySlot {
            id: "s".into(),
            product_id: "p".into(),
            date: local_start.date_naive(),
            start_time: local_start.time().with_second(0),
            end_date: None,
            max_adults: 4,
            max_dogs: 4,
            booked_adults: 0,
            booked_dogs: 0,
        };
        (slot, now)
    }

    proptest! {
        // The cutoff is a clean threshold on the time left before the start
        #[test]
        fn cutoff_is_a_threshold(minutes_ahead in 0..(10 * 24 * 60i64), min_hours in 0..96i64) {
            for tz in [Tz::UTC, Tz::Europe__Zurich, Tz::America__New_York] {
                let (slot, now) = slot_ahead(tz, minutes_ahead);
                let left = slot_start_utc(&slot, tz) - now;
                prop_assert_eq!(left, Duration::minutes(minutes_ahead));
                prop_assert_eq!(
                    check_cutoff(&slot, tz, min_hours, now).is_ok(),
                    minutes_ahead >= min_hours * 60
                );
            }
        }

        // Tokens always decode back to 32 bytes
        #[test]
        fn tokens_decode_to_32_bytes(_round in 0..64u8) {
            let token = generate_token();
            let bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
            prop_assert_eq!(bytes.len(), 32);
            prop_assert!(!token.contains('='));
        }
    }
}
