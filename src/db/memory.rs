use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::anyhow;
use chrono::{NaiveDateTime, Utc};

use crate::db::store::{Store, StoreTx};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, Identity, NewBooking, NewIdentity, NewSlot, Slot, SlotFilter,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    identities: BTreeMap<i64, Identity>,
    slots: BTreeMap<i64, Slot>,
    bookings: BTreeMap<i64, Booking>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-process store. A transaction works on a copy of the tables which
/// replaces the committed state only when the body succeeds.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn run_transaction(&self, f: &mut dyn FnMut(&mut dyn StoreTx) -> AppResult<()>) -> AppResult<()> {
        let mut committed = self
            .tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow!("memory store lock poisoned")))?;

        let mut scratch = committed.clone();
        f(&mut MemoryTx {
            tables: &mut scratch,
            now: Utc::now().naive_utc(),
        })?;

        *committed = scratch;
        Ok(())
    }

    fn list_slots(&self, filter: &SlotFilter) -> AppResult<Vec<Slot>> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow!("memory store lock poisoned")))?;
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|s| filter.matches_date(s.date))
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.date, s.id));
        Ok(slots)
    }

    fn list_bookings(&self, status: Option<BookingStatus>, limit: i64) -> AppResult<Vec<Booking>> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow!("memory store lock poisoned")))?;
        Ok(tables
            .bookings
            .values()
            .rev()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

struct MemoryTx<'a> {
    tables: &'a mut Tables,
    now: NaiveDateTime,
}

impl StoreTx for MemoryTx<'_> {
    fn find_identity_by_contact(&mut self, email: &str, mobile: &str) -> AppResult<Option<Identity>> {
        let by_email = self.tables.identities.values().find(|i| i.email == email);
        let found = by_email.or_else(|| self.tables.identities.values().find(|i| i.mobile == mobile));
        Ok(found.cloned())
    }

    fn insert_identity(&mut self, identity: &NewIdentity) -> AppResult<Identity> {
        let taken = self
            .tables
            .identities
            .values()
            .any(|i| i.email == identity.email || i.mobile == identity.mobile);
        if taken {
            return Err(AppError::IdentityConflict(format!(
                "email {} or mobile {} already registered",
                identity.email, identity.mobile
            )));
        }

        let id = self.tables.next_id();
        let row = Identity {
            id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            mobile: identity.mobile.clone(),
            password_hash: identity.password_hash.clone(),
            gender: identity.gender.clone(),
            role: identity.role,
            password_setup_required: identity.password_setup_required,
            created_at: self.now,
        };
        self.tables.identities.insert(id, row.clone());
        Ok(row)
    }

    fn insert_booking(&mut self, identity_id: Option<i64>, booking: &NewBooking) -> AppResult<Booking> {
        let id = self.tables.next_id();
        let row = Booking {
            id,
            identity_id,
            slot_id: booking.slot_id,
            full_name: booking.full_name.clone(),
            email: booking.email.clone(),
            phone: booking.phone.clone(),
            shirt_type: booking.shirt_type.clone(),
            price: booking.price,
            special_requests: booking.special_requests.clone(),
            appointment_type: booking.appointment_type.clone(),
            status: booking.status,
            created_at: self.now,
            updated_at: self.now,
        };
        self.tables.bookings.insert(id, row.clone());
        Ok(row)
    }

    fn get_booking(&mut self, id: i64) -> AppResult<Option<Booking>> {
        Ok(self.tables.bookings.get(&id).cloned())
    }

    fn update_booking_status(&mut self, id: i64, status: BookingStatus) -> AppResult<Option<Booking>> {
        let now = self.now;
        Ok(self.tables.bookings.get_mut(&id).map(|b| {
            b.status = status;
            b.updated_at = now;
            b.clone()
        }))
    }

    fn get_slot(&mut self, id: i64) -> AppResult<Option<Slot>> {
        Ok(self.tables.slots.get(&id).cloned())
    }

    fn insert_slot(&mut self, slot: &NewSlot) -> AppResult<Slot> {
        let id = self.tables.next_id();
        let row = Slot {
            id,
            date: slot.date,
            time: slot.time.clone(),
            capacity: slot.capacity,
            booked_count: 0,
            is_booked: false,
            created_at: self.now,
            updated_at: self.now,
        };
        self.tables.slots.insert(id, row.clone());
        Ok(row)
    }

    fn delete_slot(&mut self, id: i64) -> AppResult<bool> {
        if self.tables.slots.remove(&id).is_none() {
            return Ok(false);
        }
        for booking in self.tables.bookings.values_mut() {
            if booking.slot_id == Some(id) {
                booking.slot_id = None;
            }
        }
        Ok(true)
    }

    fn reserve_slot_unit(&mut self, id: i64) -> AppResult<bool> {
        let now = self.now;
        match self.tables.slots.get_mut(&id) {
            Some(slot) if slot.booked_count < slot.capacity && !slot.is_booked => {
                slot.booked_count += 1;
                slot.is_booked = slot.booked_count >= slot.capacity;
                slot.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn release_slot_unit(&mut self, id: i64) -> AppResult<bool> {
        let now = self.now;
        match self.tables.slots.get_mut(&id) {
            Some(slot) => {
                slot.booked_count = (slot.booked_count - 1).max(0);
                slot.is_booked = false;
                slot.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
