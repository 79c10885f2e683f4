use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::db::store::{Store, StoreTx};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, Identity, NewBooking, NewIdentity, NewSlot, Slot, SlotFilter,
};

/// SQLite-backed store. Writes run in `IMMEDIATE` transactions so the write
/// lock is taken before the first read of a sequence.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: &str, migrations_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(super::init_db(path, migrations_dir)?))
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal(anyhow!("database connection lock poisoned")))
    }
}

impl Store for SqliteStore {
    fn run_transaction(&self, f: &mut dyn FnMut(&mut dyn StoreTx) -> AppResult<()>) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // dropping `tx` on the error path rolls it back
        f(&mut SqliteTx { conn: &tx })?;

        tx.commit()?;
        Ok(())
    }

    fn list_slots(&self, filter: &SlotFilter) -> AppResult<Vec<Slot>> {
        let conn = self.lock()?;
        queries::list_slots(&conn, filter)
    }

    fn list_bookings(&self, status: Option<BookingStatus>, limit: i64) -> AppResult<Vec<Booking>> {
        let conn = self.lock()?;
        queries::list_bookings(&conn, status, limit)
    }
}

struct SqliteTx<'a> {
    conn: &'a Connection,
}

impl StoreTx for SqliteTx<'_> {
    fn find_identity_by_contact(&mut self, email: &str, mobile: &str) -> AppResult<Option<Identity>> {
        queries::find_identity_by_contact(self.conn, email, mobile)
    }

    fn insert_identity(&mut self, identity: &NewIdentity) -> AppResult<Identity> {
        queries::insert_identity(self.conn, identity)
    }

    fn insert_booking(&mut self, identity_id: Option<i64>, booking: &NewBooking) -> AppResult<Booking> {
        queries::insert_booking(self.conn, identity_id, booking)
    }

    fn get_booking(&mut self, id: i64) -> AppResult<Option<Booking>> {
        queries::get_booking(self.conn, id)
    }

    fn update_booking_status(&mut self, id: i64, status: BookingStatus) -> AppResult<Option<Booking>> {
        queries::update_booking_status(self.conn, id, status)
    }

    fn get_slot(&mut self, id: i64) -> AppResult<Option<Slot>> {
        queries::get_slot(self.conn, id)
    }

    fn insert_slot(&mut self, slot: &NewSlot) -> AppResult<Slot> {
        queries::insert_slot(self.conn, slot)
    }

    fn delete_slot(&mut self, id: i64) -> AppResult<bool> {
        queries::delete_slot(self.conn, id)
    }

    fn reserve_slot_unit(&mut self, id: i64) -> AppResult<bool> {
        queries::reserve_slot_unit(self.conn, id)
    }

    fn release_slot_unit(&mut self, id: i64) -> AppResult<bool> {
        queries::release_slot_unit(self.conn, id)
    }
}
