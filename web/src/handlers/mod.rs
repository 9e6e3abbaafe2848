//! HTTP request handlers.

pub mod health;
pub mod tickets;

pub use health::health_check;
pub use tickets::{check_in, verify_ticket, CheckInRequest, VerifyTicketRequest};
