//! Availability slots and their capacity counters.
//!
//! `booked_adults`/`booked_dogs` only ever change through [`AvailabilityRepository::reserve`]
//! and [`AvailabilityRepository::release`] (or the booking transitions that call the same
//! statements), and never leave `0..=max`.

use crate::error::DbError;
use chrono::{NaiveDate, NaiveTime};
use pawtrips_common::models::AvailabilitySlot;
use std::future::Future;

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub product_id: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub max_adults: i64,
    pub max_dogs: i64,
}

pub trait AvailabilityRepository {
    /// Fails with `NotFound` when the product does not exist.
    fn create_slot(&self, slot: NewSlot) -> impl Future<Output = Result<AvailabilitySlot, DbError>> + Send;

    fn find_slot(&self, id: &str) -> impl Future<Output = Result<Option<AvailabilitySlot>, DbError>> + Send;

    /// Slots of a product with `from <= date <= to`, ordered by date and start time.
    fn list_slots(
        &self,
        product_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<AvailabilitySlot>, DbError>> + Send;

    /// Atomically adds a party to the counters. `CapacityExceeded` when it does not fit.
    fn reserve(
        &self,
        slot_id: &str,
        adults: i64,
        dogs: i64,
    ) -> impl Future<Output = Result<AvailabilitySlot, DbError>> + Send;

    /// Removes a party from the counters, stopping at zero.
    fn release(
        &self,
        slot_id: &str,
        adults: i64,
        dogs: i64,
    ) -> impl Future<Output = Result<AvailabilitySlot, DbError>> + Send;

    /// Changes the maxima. `Conflict` when the new values are below what is already booked.
    fn update_capacity(
        &self,
        slot_id: &str,
        max_adults: i64,
        max_dogs: i64,
    ) -> impl Future<Output = Result<AvailabilitySlot, DbError>> + Send;
}
