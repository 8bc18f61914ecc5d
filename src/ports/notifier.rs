//! Notification port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub to_address: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Delivers parcels. Callers treat failures as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, parcel: &Parcel) -> Result<(), DomainError>;
}
