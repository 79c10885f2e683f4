//! Slot occupancy: the only code that changes a slot's `booked_count` and
//! `is_booked` columns, plus the read-side status projection.

use chrono::{NaiveDate, NaiveDateTime};

use crate::db::StoreTx;
use crate::errors::{AppError, AppResult};
use crate::models::{parse_time_label, NewSlot, Slot, SlotStatus, SlotView};

/// Takes one unit of the slot's capacity.
///
/// The capacity check and the increment are one conditional update, so two
/// concurrent reservations cannot both pass the check.
pub fn reserve_unit(tx: &mut dyn StoreTx, slot_id: i64) -> AppResult<Slot> {
    if !tx.reserve_slot_unit(slot_id)? {
        tracing::info!(slot_id, "slot unavailable for reservation");
        return Err(AppError::SlotUnavailable(slot_id));
    }

    let slot = tx
        .get_slot(slot_id)?
        .ok_or(AppError::SlotUnavailable(slot_id))?;
    if slot.is_booked {
        tracing::info!(slot_id, capacity = slot.capacity, "slot is now full");
    }
    Ok(slot)
}

/// Returns one unit to the slot and reopens it.
///
/// The full flag is cleared on every release even when other units remain
/// taken; with one unit per booking a release always leaves room for one more.
pub fn release_unit(tx: &mut dyn StoreTx, slot_id: i64) -> AppResult<Slot> {
    let before = tx
        .get_slot(slot_id)?
        .ok_or_else(|| AppError::NotFound(format!("slot {slot_id}")))?;
    if before.booked_count == 0 {
        tracing::warn!(slot_id, "releasing a unit from an empty slot; count stays at zero");
    }

    if !tx.release_slot_unit(slot_id)? {
        return Err(AppError::NotFound(format!("slot {slot_id}")));
    }

    tx.get_slot(slot_id)?
        .ok_or_else(|| AppError::NotFound(format!("slot {slot_id}")))
}

pub fn slot_status(slot: &Slot, now: NaiveDateTime) -> SlotStatus {
    if slot.starts_at() < now {
        SlotStatus::Outdated
    } else if slot.is_full() {
        SlotStatus::Full
    } else {
        SlotStatus::Available
    }
}

pub fn list_with_computed_status(
    slots: Vec<Slot>,
    now: NaiveDateTime,
) -> impl Iterator<Item = SlotView> {
    slots.into_iter().map(move |slot| {
        let status = slot_status(&slot, now);
        SlotView { slot, status }
    })
}

/// Creates one slot per time label on `date`, all sharing `capacity`.
pub fn create_slots(
    tx: &mut dyn StoreTx,
    date: NaiveDate,
    times: &[String],
    capacity: i64,
) -> AppResult<Vec<Slot>> {
    if capacity <= 0 {
        return Err(AppError::Validation(format!(
            "capacity must be positive, got {capacity}"
        )));
    }
    if times.is_empty() {
        return Err(AppError::Validation("at least one time is required".to_string()));
    }

    let mut created = Vec::with_capacity(times.len());
    for time in times {
        parse_time_label(time)?;
        created.push(tx.insert_slot(&NewSlot {
            date,
            time: time.trim().to_string(),
            capacity,
        })?);
    }

    tracing::info!(%date, count = created.len(), capacity, "created slots");
    Ok(created)
}

pub fn delete_slot(tx: &mut dyn StoreTx, slot_id: i64) -> AppResult<()> {
    let slot = tx
        .get_slot(slot_id)?
        .ok_or_else(|| AppError::NotFound(format!("slot {slot_id}")))?;
    if slot.booked_count > 0 {
        return Err(AppError::SlotInUse(slot_id));
    }
    tx.delete_slot(slot_id)?;
    tracing::info!(slot_id, "deleted slot");
    Ok(())
}
