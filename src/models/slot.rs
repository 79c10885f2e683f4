use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// A bookable time unit on a given date.
///
/// `booked_count` and `is_booked` are only ever changed through the ledger's
/// reserve/release operations; nothing else writes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub capacity: i64,
    pub booked_count: i64,
    pub is_booked: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Slot {
    /// Start of the slot. A label that does not parse falls back to midnight.
    pub fn starts_at(&self) -> NaiveDateTime {
        let time = parse_time_label(&self.time).unwrap_or(NaiveTime::MIN);
        self.date.and_time(time)
    }

    pub fn is_full(&self) -> bool {
        self.is_booked || self.booked_count >= self.capacity
    }
}

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub date: NaiveDate,
    pub time: String,
    pub capacity: i64,
}

/// Serialized as `Available`, `Full` or `Outdated`; query filters also accept
/// the lower- and upper-case spellings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SlotStatus {
    #[serde(alias = "available", alias = "AVAILABLE")]
    Available,
    #[serde(alias = "full", alias = "FULL")]
    Full,
    #[serde(alias = "outdated", alias = "OUTDATED")]
    Outdated,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: Slot,
    pub status: SlotStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotFilter {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<SlotStatus>,
}

impl SlotFilter {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    /// Storage-side part of the filter; `status` is applied after projection.
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.date.map_or(true, |d| d == date)
            && self.from.map_or(true, |from| date >= from)
            && self.to.map_or(true, |to| date <= to)
    }
}

/// Parses an "H:MM AM|PM" label into a time of day.
pub fn parse_time_label(label: &str) -> AppResult<NaiveTime> {
    let invalid = || AppError::Validation(format!("invalid time label: {label:?}"));

    let (clock, meridiem) = label.trim().split_once(' ').ok_or_else(invalid)?;
    let (hour, minute) = clock.split_once(':').ok_or_else(invalid)?;
    if minute.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hour) {
        return Err(invalid());
    }

    let hour = match meridiem.trim().to_ascii_uppercase().as_str() {
        "AM" if hour == 12 => 0,
        "AM" => hour,
        "PM" if hour == 12 => 12,
        "PM" => hour + 12,
        _ => return Err(invalid()),
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}
