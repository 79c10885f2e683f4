use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{ffi, params, Connection, OptionalExtension};

use crate::errors::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, Identity, NewBooking, NewIdentity, NewSlot, Role, Slot, SlotFilter,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn now_str() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> AppResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| anyhow::anyhow!("malformed timestamp {s:?}: {e}").into())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
}

// ── Identities ──

const IDENTITY_COLUMNS: &str =
    "id, name, email, mobile, password_hash, gender, role, password_setup_required, created_at";

pub fn find_identity_by_contact(
    conn: &Connection,
    email: &str,
    mobile: &str,
) -> AppResult<Option<Identity>> {
    // an email match wins over a mobile match on a different row
    let sql = format!(
        "SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = ?1 OR mobile = ?2
         ORDER BY CASE WHEN email = ?1 THEN 0 ELSE 1 END, id ASC LIMIT 1"
    );
    let identity = conn
        .query_row(&sql, params![email, mobile], |row| Ok(parse_identity_row(row)))
        .optional()?;
    identity.transpose()
}

pub fn insert_identity(conn: &Connection, identity: &NewIdentity) -> AppResult<Identity> {
    let result = conn.execute(
        "INSERT INTO identities (name, email, mobile, password_hash, gender, role, password_setup_required, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            identity.name,
            identity.email,
            identity.mobile,
            identity.password_hash,
            identity.gender,
            identity.role.as_str(),
            identity.password_setup_required,
            now_str(),
        ],
    );

    match result {
        Ok(_) => {}
        // only UNIQUE means another request registered the contact first
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::IdentityConflict(format!(
                "email {} or mobile {} already registered",
                identity.email, identity.mobile
            )));
        }
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = ?1");
    conn.query_row(&sql, params![id], |row| Ok(parse_identity_row(row)))?
}

fn parse_identity_row(row: &rusqlite::Row) -> AppResult<Identity> {
    let role: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    Ok(Identity {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        mobile: row.get(3)?,
        password_hash: row.get(4)?,
        gender: row.get(5)?,
        role: Role::parse(&role),
        password_setup_required: row.get(7)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

// ── Slots ──

const SLOT_COLUMNS: &str = "id, date, time, capacity, booked_count, is_booked, created_at, updated_at";

pub fn get_slot(conn: &Connection, id: i64) -> AppResult<Option<Slot>> {
    let sql = format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = ?1");
    let slot = conn.query_row(&sql, params![id], |row| Ok(parse_slot_row(row))).optional()?;
    slot.transpose()
}

pub fn insert_slot(conn: &Connection, slot: &NewSlot) -> AppResult<Slot> {
    let now = now_str();
    conn.execute(
        "INSERT INTO slots (date, time, capacity, booked_count, is_booked, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, 0, ?4, ?4)",
        params![slot.date.format(DATE_FORMAT).to_string(), slot.time, slot.capacity, now],
    )?;
    let id = conn.last_insert_rowid();
    get_slot(conn, id)?.ok_or_else(|| AppError::NotFound(format!("slot {id}")))
}

pub fn delete_slot(conn: &Connection, id: i64) -> AppResult<bool> {
    let count = conn.execute("DELETE FROM slots WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn list_slots(conn: &Connection, filter: &SlotFilter) -> AppResult<Vec<Slot>> {
    // ISO dates compare correctly as text
    let date = filter.date.map(|d| d.format(DATE_FORMAT).to_string());
    let from = filter.from.map(|d| d.format(DATE_FORMAT).to_string());
    let to = filter.to.map(|d| d.format(DATE_FORMAT).to_string());

    let sql = format!(
        "SELECT {SLOT_COLUMNS} FROM slots
         WHERE (?1 IS NULL OR date = ?1)
           AND (?2 IS NULL OR date >= ?2)
           AND (?3 IS NULL OR date <= ?3)
         ORDER BY date ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![date, from, to], |row| Ok(parse_slot_row(row)))?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

pub fn reserve_slot_unit(conn: &Connection, id: i64) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE slots SET
           booked_count = booked_count + 1,
           is_booked = CASE WHEN booked_count + 1 >= capacity THEN 1 ELSE 0 END,
           updated_at = ?2
         WHERE id = ?1 AND booked_count < capacity AND is_booked = 0",
        params![id, now_str()],
    )?;
    Ok(count > 0)
}

pub fn release_slot_unit(conn: &Connection, id: i64) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE slots SET
           booked_count = MAX(booked_count - 1, 0),
           is_booked = 0,
           updated_at = ?2
         WHERE id = ?1",
        params![id, now_str()],
    )?;
    Ok(count > 0)
}

fn parse_slot_row(row: &rusqlite::Row) -> AppResult<Slot> {
    let date_str: String = row.get(1)?;
    let created_at_str: String = row.get(6)?;
    let updated_at_str: String = row.get(7)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .map_err(|e| anyhow::anyhow!("slot has malformed date {date_str:?}: {e}"))?;

    Ok(Slot {
        id: row.get(0)?,
        date,
        time: row.get(2)?,
        capacity: row.get(3)?,
        booked_count: row.get(4)?,
        is_booked: row.get(5)?,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, identity_id, slot_id, full_name, email, phone, shirt_type, price, \
     special_requests, appointment_type, status, created_at, updated_at";

pub fn insert_booking(
    conn: &Connection,
    identity_id: Option<i64>,
    booking: &NewBooking,
) -> AppResult<Booking> {
    let now = now_str();
    conn.execute(
        "INSERT INTO bookings (identity_id, slot_id, full_name, email, phone, shirt_type, price,
                               special_requests, appointment_type, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            identity_id,
            booking.slot_id,
            booking.full_name,
            booking.email,
            booking.phone,
            booking.shirt_type,
            booking.price,
            booking.special_requests,
            booking.appointment_type,
            booking.status.as_str(),
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_booking(conn, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn get_booking(conn: &Connection, id: i64) -> AppResult<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let booking = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    booking.transpose()
}

pub fn update_booking_status(
    conn: &Connection,
    id: i64,
    status: BookingStatus,
) -> AppResult<Option<Booking>> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    if count == 0 {
        return Ok(None);
    }
    get_booking(conn, id)
}

pub fn list_bookings(
    conn: &Connection,
    status: Option<BookingStatus>,
    limit: i64,
) -> AppResult<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR status = ?1)
         ORDER BY created_at DESC, id DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![status.map(|s| s.as_str()), limit], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> AppResult<Booking> {
    let status_str: String = row.get(10)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("booking has unknown status {status_str:?}"))?;

    Ok(Booking {
        id: row.get(0)?,
        identity_id: row.get(1)?,
        slot_id: row.get(2)?,
        full_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        shirt_type: row.get(6)?,
        price: row.get(7)?,
        special_requests: row.get(8)?,
        appointment_type: row.get(9)?,
        status,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}
