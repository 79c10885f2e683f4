pub mod booking;
pub mod identity;
pub mod slot;

pub use booking::{
    transition_effect, Booking, BookingStatus, CreateBookingRequest, NewBooking, RawSlotId,
    TransitionEffect, UpdateStatusRequest,
};
pub use identity::{Identity, NewIdentity, Role};
pub use slot::{parse_time_label, NewSlot, Slot, SlotFilter, SlotStatus, SlotView};
