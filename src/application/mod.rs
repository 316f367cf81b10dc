//! Application layer: booking state, flow navigation and payment verification.
//!
//! `PaymentVerificationService` follows an actor pattern: one `tokio` task
//! owns every verification session and is driven through channels, so
//! callers never share mutable state with the polling loops.

pub mod booking_state;
pub mod navigator;
mod polling;
pub mod verification;
