//! Membership domain events.
//!
//! Written to the outbox in the same transaction as the state change they
//! describe. Named in past tense.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{domain_event, AddOnId, EventId, OrderId, SnapshotId, Timestamp};

use super::{AddOn, AddOnSource, MembershipSnapshot, SnapshotReason, Tier};

/// The previous membership was preserved before being overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshotTaken {
    pub event_id: EventId,
    pub member_key: String,
    pub snapshot_id: SnapshotId,
    pub reason: SnapshotReason,
    pub order_id: Option<OrderId>,
    pub occurred_at: Timestamp,
}

domain_event!(
    MembershipSnapshotTaken,
    event_type = "membership.snapshot_taken.v1",
    schema_version = 1,
    aggregate_id = member_key,
    aggregate_type = "Membership",
    occurred_at = occurred_at,
    event_id = event_id
);

impl MembershipSnapshotTaken {
    pub fn from_snapshot(snapshot: &MembershipSnapshot) -> Self {
        Self {
            event_id: EventId::new(),
            member_key: snapshot.membership.member_id.compound_key(),
            snapshot_id: snapshot.id,
            reason: snapshot.reason,
            order_id: snapshot.order_id.clone(),
            occurred_at: snapshot.created_at,
        }
    }
}

/// Reserved days were added to a member's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnCreated {
    pub event_id: EventId,
    pub add_on_id: AddOnId,
    pub member_key: String,
    pub tier: Tier,
    pub days: u32,
    pub source: AddOnSource,
    pub order_id: Option<OrderId>,
    pub occurred_at: Timestamp,
}

domain_event!(
    AddOnCreated,
    event_type = "add_on.created.v1",
    schema_version = 1,
    aggregate_id = member_key,
    aggregate_type = "Membership",
    occurred_at = occurred_at,
    event_id = event_id
);

impl AddOnCreated {
    pub fn from_add_on(add_on: &AddOn) -> Self {
        Self {
            event_id: EventId::new(),
            add_on_id: add_on.id,
            member_key: add_on.member_id.compound_key(),
            tier: add_on.tier,
            days: add_on.days,
            source: add_on.source,
            order_id: add_on.order_id.clone(),
            occurred_at: add_on.created_at,
        }
    }
}

/// An administrator removed a membership after snapshotting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDeleted {
    pub event_id: EventId,
    pub member_key: String,
    pub snapshot_id: SnapshotId,
    pub occurred_at: Timestamp,
}

domain_event!(
    MembershipDeleted,
    event_type = "membership.deleted.v1",
    schema_version = 1,
    aggregate_id = member_key,
    aggregate_type = "Membership",
    occurred_at = occurred_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, MemberId, SerializableDomainEvent};
    use uuid::Uuid;

    #[test]
    fn add_on_created_keys_by_member() {
        let member = MemberId::ftc(Uuid::new_v4());
        let add_on = AddOn::purchased(
            member.clone(),
            Tier::Standard,
            366,
            OrderId::new(),
            Timestamp::now(),
        );

        let event = AddOnCreated::from_add_on(&add_on);

        assert_eq!(event.aggregate_id(), member.compound_key());
        assert_eq!(event.event_type(), "add_on.created.v1");
        let envelope = event.to_envelope().unwrap();
        assert_eq!(envelope.payload["days"], 366);
        assert_eq!(envelope.payload["source"], "user_purchase");
    }
}
