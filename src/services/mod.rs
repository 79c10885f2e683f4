pub mod calendar;
pub mod identity;
pub mod ledger;
pub mod workflow;
