//! Notifier that writes parcels to the log instead of sending them.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{Notifier, Parcel};

/// Used where no mail relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn deliver(&self, parcel: &Parcel) -> Result<(), DomainError> {
        tracing::info!(
            to = %parcel.to_address,
            subject = %parcel.subject,
            body_len = parcel.body.len(),
            "parcel delivered to log"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds() {
        let parcel = Parcel {
            to_address: "r@example.com".to_string(),
            to_name: None,
            subject: "hi".to_string(),
            body: String::new(),
        };
        assert!(LoggingNotifier.deliver(&parcel).await.is_ok());
    }
}
