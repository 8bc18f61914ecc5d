//! Billing identity of a reader.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::MemberId;

/// What checkout needs to know about the person paying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAccount {
    pub member_id: MemberId,
    pub email: Option<String>,
    /// Sandbox accounts are charged a nominal amount.
    pub is_test: bool,
    pub stripe_customer_id: Option<String>,
}

impl BillingAccount {
    pub fn new(member_id: MemberId, email: Option<String>) -> Self {
        Self {
            member_id,
            email,
            is_test: false,
            stripe_customer_id: None,
        }
    }

    pub fn sandbox(mut self) -> Self {
        self.is_test = true;
        self
    }

    pub fn with_stripe_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.stripe_customer_id = Some(customer_id.into());
        self
    }
}
