//! Notification adapters.

mod confirmation_mailer;
mod logging_notifier;

pub use confirmation_mailer::{ConfirmationMailer, ORDER_CONFIRMED};
pub use logging_notifier::LoggingNotifier;
