use anyhow::anyhow;

use crate::errors::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, Identity, NewBooking, NewIdentity, NewSlot, Slot, SlotFilter};

/// Row operations available inside a single store transaction.
///
/// `reserve_slot_unit` and `release_slot_unit` are the only writers of a slot's
/// occupancy columns. Both report whether a row was changed; turning that into
/// a domain error is the ledger's job.
pub trait StoreTx {
    fn find_identity_by_contact(&mut self, email: &str, mobile: &str) -> AppResult<Option<Identity>>;

    /// Fails with `IdentityConflict` when the email or mobile is already taken.
    fn insert_identity(&mut self, identity: &NewIdentity) -> AppResult<Identity>;

    fn insert_booking(&mut self, identity_id: Option<i64>, booking: &NewBooking) -> AppResult<Booking>;

    fn get_booking(&mut self, id: i64) -> AppResult<Option<Booking>>;

    fn update_booking_status(&mut self, id: i64, status: BookingStatus) -> AppResult<Option<Booking>>;

    fn get_slot(&mut self, id: i64) -> AppResult<Option<Slot>>;

    fn insert_slot(&mut self, slot: &NewSlot) -> AppResult<Slot>;

    fn delete_slot(&mut self, id: i64) -> AppResult<bool>;

    /// Increments `booked_count` only if the slot exists, is below capacity and
    /// not flagged full; flags it full when the new count reaches capacity.
    fn reserve_slot_unit(&mut self, id: i64) -> AppResult<bool>;

    /// Decrements `booked_count` (never below zero) and clears the full flag.
    fn release_slot_unit(&mut self, id: i64) -> AppResult<bool>;
}

/// Transactional persistence for identities, slots and bookings.
pub trait Store: Send + Sync {
    /// Runs `f` atomically: every write commits if it returns `Ok`, none do otherwise.
    fn run_transaction(&self, f: &mut dyn FnMut(&mut dyn StoreTx) -> AppResult<()>) -> AppResult<()>;

    fn list_slots(&self, filter: &SlotFilter) -> AppResult<Vec<Slot>>;

    fn list_bookings(&self, status: Option<BookingStatus>, limit: i64) -> AppResult<Vec<Booking>>;
}

impl dyn Store {
    pub fn atomically<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> AppResult<T>,
    {
        let mut f = Some(f);
        let mut output = None;
        self.run_transaction(&mut |tx: &mut dyn StoreTx| {
            let f = f
                .take()
                .ok_or_else(|| AppError::Internal(anyhow!("transaction body invoked twice")))?;
            output = Some(f(tx)?);
            Ok(())
        })?;
        output.ok_or_else(|| AppError::Internal(anyhow!("transaction produced no result")))
    }
}
