//! Payment confirmation handlers.

mod confirm_payment;

pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult};
