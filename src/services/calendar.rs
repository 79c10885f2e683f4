use chrono::Duration;

use crate::models::{Booking, Slot};

pub fn generate_ics(booking: &Booking, slot: &Slot, business_name: &str, duration_minutes: i64) -> String {
    let start = slot.starts_at();
    let dtstart = start.format("%Y%m%dT%H%M%S").to_string();
    let dtend = (start + Duration::minutes(duration_minutes))
        .format("%Y%m%dT%H%M%S")
        .to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("booking-{}@slotbook", booking.id);

    let summary = format!("{} appointment with {}", booking.shirt_type, business_name);
    let description = match booking.special_requests.as_deref() {
        Some(requests) if !requests.trim().is_empty() => escape_text(requests),
        _ => "No special requests".to_string(),
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Slotbook//Appointments//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n",
        summary = escape_text(&summary),
        status = ics_status(booking),
    )
}

fn ics_status(booking: &Booking) -> &'static str {
    use crate::models::BookingStatus::*;
    match booking.status {
        Pending => "TENTATIVE",
        Confirmed | Completed => "CONFIRMED",
        Cancelled => "CANCELLED",
    }
}

// RFC 5545 TEXT escaping
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}
