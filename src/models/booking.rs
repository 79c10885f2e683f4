use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub identity_id: Option<i64>,
    pub slot_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub shirt_type: String,
    pub price: f64,
    pub special_requests: Option<String>,
    pub appointment_type: Option<String>,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

/// Slot-ledger side effect required by a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    None,
    Reserve,
    Release,
}

pub fn transition_effect(old: BookingStatus, new: BookingStatus, has_slot: bool) -> TransitionEffect {
    if !has_slot {
        return TransitionEffect::None;
    }
    match (old, new) {
        (old, BookingStatus::Cancelled) if old != BookingStatus::Cancelled => TransitionEffect::Release,
        (BookingStatus::Cancelled, BookingStatus::Confirmed) => TransitionEffect::Reserve,
        _ => TransitionEffect::None,
    }
}

/// Validated booking fields ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub slot_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub shirt_type: String,
    pub price: f64,
    pub special_requests: Option<String>,
    pub appointment_type: Option<String>,
    pub status: BookingStatus,
}

/// Slot references arrive from browser forms as numbers or numeric strings.
/// Any other JSON value is kept so validation can reject it with a proper error.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawSlotId {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub shirt_type: String,
    pub price: f64,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub appointment_type: Option<String>,
    #[serde(default)]
    pub slot_id: Option<RawSlotId>,
}

impl CreateBookingRequest {
    pub fn slot_id(&self) -> AppResult<Option<i64>> {
        match &self.slot_id {
            None => Ok(None),
            Some(RawSlotId::Number(id)) => Ok(Some(*id)),
            Some(RawSlotId::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(RawSlotId::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| AppError::Validation(format!("slotId is not an integer: {s:?}"))),
            Some(RawSlotId::Other(value)) => Err(AppError::Validation(format!(
                "slotId is not an integer: {value}"
            ))),
        }
    }

    pub fn validate(&self) -> AppResult<NewBooking> {
        let slot_id = self.slot_id()?;

        for (field, value) in [
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} is required")));
            }
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::Validation(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }

        Ok(NewBooking {
            slot_id,
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            shirt_type: self.shirt_type.clone(),
            price: self.price,
            special_requests: self.special_requests.clone(),
            appointment_type: self.appointment_type.clone(),
            status: BookingStatus::Confirmed,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}
