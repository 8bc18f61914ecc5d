//! DeleteMembershipHandler - Command handler removing a reader's membership.
//!
//! The membership is snapshotted first so customer service can restore it.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, MemberId, SerializableDomainEvent, Timestamp,
};
use crate::domain::membership::{MembershipDeleted, MembershipSnapshot, SnapshotReason};
use crate::ports::{BillingStore, BillingTx};

#[derive(Debug, Clone)]
pub struct DeleteMembershipCommand {
    pub member: MemberId,
}

#[derive(Debug, Clone)]
pub struct DeleteMembershipResult {
    pub snapshot: MembershipSnapshot,
}

pub struct DeleteMembershipHandler {
    store: Arc<dyn BillingStore>,
}

impl DeleteMembershipHandler {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: DeleteMembershipCommand,
    ) -> Result<DeleteMembershipResult, BillingError> {
        let mut tx = self.store.begin().await?;
        match delete(tx.as_mut(), &cmd.member).await {
            Ok(snapshot) => {
                tx.commit().await?;
                tracing::info!(
                    member = %cmd.member,
                    snapshot_id = %snapshot.id,
                    "membership deleted"
                );
                Ok(DeleteMembershipResult { snapshot })
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(member = %cmd.member, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

async fn delete(tx: &mut dyn BillingTx, member: &MemberId) -> Result<MembershipSnapshot, BillingError> {
    let now = Timestamp::now();

    // 1. Lock and read
    let current = tx.load_membership_for_update(member).await?;
    let snapshot = MembershipSnapshot::capture(&current, SnapshotReason::Delete, None, now)
        .ok_or_else(|| BillingError::not_found("membership", member.compound_key()))?;

    // 2. Snapshot, then delete
    tx.save_snapshot(&snapshot).await?;
    tx.delete_membership(member).await?;

    // 3. Announce
    let event = MembershipDeleted {
        event_id: EventId::new(),
        member_key: member.compound_key(),
        snapshot_id: snapshot.id,
        occurred_at: now,
    }
    .to_envelope()
    .map_err(|e| DomainError::new(ErrorCode::SerializationError, e.to_string()))?;
    tx.write_outbox(&[event], &member.compound_key()).await?;

    Ok(snapshot)
}
