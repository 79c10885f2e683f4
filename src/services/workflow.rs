//! Booking use cases. Every operation here that writes runs in one store
//! transaction, so booking rows and slot occupancy never diverge.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::db::Store;
use crate::errors::{AppError, AppResult};
use crate::models::{
    transition_effect, Booking, BookingStatus, CreateBookingRequest, NewBooking, Slot, SlotFilter,
    SlotView, TransitionEffect,
};
use crate::services::identity::IdentityResolver;
use crate::services::ledger;

pub struct BookingWorkflow {
    store: Arc<dyn Store>,
    identities: IdentityResolver,
}

impl BookingWorkflow {
    pub fn new(store: Arc<dyn Store>, identities: IdentityResolver) -> Self {
        Self { store, identities }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn create_booking(&self, request: &CreateBookingRequest) -> AppResult<Booking> {
        let booking = request.validate()?;

        let created = match self.try_create_booking(&booking) {
            // a concurrent request created the same identity; it is visible now
            Err(AppError::IdentityConflict(detail)) => {
                tracing::warn!(%detail, "identity conflict while booking, retrying once");
                self.try_create_booking(&booking)?
            }
            other => other?,
        };

        tracing::info!(
            booking_id = created.id,
            slot_id = ?created.slot_id,
            identity_id = ?created.identity_id,
            "booking created"
        );
        Ok(created)
    }

    fn try_create_booking(&self, booking: &NewBooking) -> AppResult<Booking> {
        let credential = self
            .identities
            .prepare(&self.store, &booking.email, &booking.phone)?;

        self.store.atomically(|tx| {
            let identity = self.identities.resolve(
                tx,
                &booking.email,
                &booking.phone,
                &booking.full_name,
                credential.as_deref(),
            )?;

            // an unknown slot fails here as unavailable, before the foreign key sees it
            if let Some(slot_id) = booking.slot_id {
                ledger::reserve_unit(tx, slot_id)?;
            }

            tx.insert_booking(Some(identity.id), booking)
        })
    }

    pub fn update_status(&self, booking_id: i64, new_status: BookingStatus) -> AppResult<Booking> {
        let updated = self.store.atomically(|tx| {
            let existing = tx
                .get_booking(booking_id)?
                .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

            let effect = transition_effect(existing.status, new_status, existing.slot_id.is_some());

            // reserving first is the capacity check; a full slot leaves the status as it was
            if let (TransitionEffect::Reserve, Some(slot_id)) = (effect, existing.slot_id) {
                ledger::reserve_unit(tx, slot_id)?;
            }

            let updated = tx
                .update_booking_status(booking_id, new_status)?
                .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

            if let (TransitionEffect::Release, Some(slot_id)) = (effect, existing.slot_id) {
                ledger::release_unit(tx, slot_id)?;
            }

            tracing::debug!(booking_id, from = existing.status.as_str(), ?effect, "applied transition");
            Ok(updated)
        })?;

        tracing::info!(booking_id, status = new_status.as_str(), "booking status updated");
        Ok(updated)
    }

    pub fn list_slots_with_status(
        &self,
        filter: &SlotFilter,
    ) -> AppResult<impl Iterator<Item = SlotView>> {
        let slots = self.store.list_slots(filter)?;
        let wanted = filter.status;
        let now = Utc::now().naive_utc();
        Ok(ledger::list_with_computed_status(slots, now)
            .filter(move |view| wanted.map_or(true, |status| view.status == status)))
    }

    pub fn create_slots(&self, date: NaiveDate, times: &[String], capacity: i64) -> AppResult<Vec<Slot>> {
        self.store
            .atomically(|tx| ledger::create_slots(tx, date, times, capacity))
    }

    pub fn delete_slot(&self, slot_id: i64) -> AppResult<()> {
        self.store.atomically(|tx| ledger::delete_slot(tx, slot_id))
    }

    pub fn get_booking(&self, booking_id: i64) -> AppResult<(Booking, Option<Slot>)> {
        self.store.atomically(|tx| {
            let booking = tx
                .get_booking(booking_id)?
                .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
            let slot = match booking.slot_id {
                Some(slot_id) => tx.get_slot(slot_id)?,
                None => None,
            };
            Ok((booking, slot))
        })
    }

    pub fn list_bookings(&self, status: Option<BookingStatus>, limit: i64) -> AppResult<Vec<Booking>> {
        self.store.list_bookings(status, limit)
    }
}
