//! In-memory billing store.
//!
//! Each transaction takes one `tokio::sync::Mutex` per identity half (ftc id,
//! union id) of the member and of the stored membership it resolves to, in
//! sorted key order, and holds the owned guards until commit or drop.
//! Writes are staged on the transaction and applied in one step on commit,
//! so a dropped or rolled-back transaction leaves no trace.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::billing::Order;
use crate::domain::foundation::{
    DomainError, ErrorCode, EventEnvelope, MemberId, OrderId, Timestamp,
};
use crate::domain::membership::{AddOn, Membership, MembershipSnapshot};
use crate::ports::{BillingStore, BillingTx, OutboxEntry};

use super::InMemoryOutbox;

#[derive(Debug, Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    memberships: Vec<Membership>,
    snapshots: Vec<MembershipSnapshot>,
    add_ons: Vec<AddOn>,
}

impl State {
    fn membership_index(&self, member: &MemberId) -> Option<usize> {
        self.memberships
            .iter()
            .position(|m| same_reader(&m.member_id, member))
    }

    fn membership(&self, member: &MemberId) -> Membership {
        self.membership_index(member)
            .map(|i| self.memberships[i].clone())
            .unwrap_or_else(|| Membership::zero(member.clone()))
    }
}

/// Two ids name the same reader if any identity half matches.
fn same_reader(a: &MemberId, b: &MemberId) -> bool {
    let ftc = matches!((a.ftc_id(), b.ftc_id()), (Some(x), Some(y)) if x == y);
    let union = matches!((a.union_id(), b.union_id()), (Some(x), Some(y)) if x == y);
    ftc || union
}

fn identity_keys(member: &MemberId, keys: &mut BTreeSet<String>) {
    if let Some(ftc) = member.ftc_id() {
        keys.insert(format!("ftc:{}", ftc));
    }
    if let Some(union) = member.union_id() {
        keys.insert(format!("union:{}", union));
    }
}

/// Lock keys covering `member` and every stored membership it matches.
fn lock_keys(state: &State, member: &MemberId) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    identity_keys(member, &mut keys);
    for stored in state.memberships.iter().filter(|m| same_reader(&m.member_id, member)) {
        identity_keys(&stored.member_id, &mut keys);
    }
    keys
}

type MemberLocks = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

pub struct InMemoryBillingStore {
    state: Arc<Mutex<State>>,
    locks: Arc<MemberLocks>,
    outbox: Arc<InMemoryOutbox>,
}

impl InMemoryBillingStore {
    pub fn new(outbox: Arc<InMemoryOutbox>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            locks: Arc::new(Mutex::new(HashMap::new())),
            outbox,
        }
    }

    pub fn outbox(&self) -> Arc<InMemoryOutbox> {
        self.outbox.clone()
    }

    /// Stores a membership directly, outside any transaction.
    pub fn seed_membership(&self, membership: Membership) -> Result<(), DomainError> {
        let mut state = lock_state(&self.state)?;
        upsert_membership(&mut state, membership);
        Ok(())
    }

    /// Stores an order in whatever state it is in.
    pub fn seed_order(&self, order: Order) -> Result<(), DomainError> {
        lock_state(&self.state)?.orders.insert(order.id.clone(), order);
        Ok(())
    }

    pub fn snapshots(&self) -> Vec<MembershipSnapshot> {
        lock_state(&self.state)
            .map(|s| s.snapshots.clone())
            .unwrap_or_default()
    }

    pub fn add_ons(&self) -> Vec<AddOn> {
        lock_state(&self.state)
            .map(|s| s.add_ons.clone())
            .unwrap_or_default()
    }
}

fn lock_state(state: &Mutex<State>) -> Result<MutexGuard<'_, State>, DomainError> {
    state
        .lock()
        .map_err(|_| DomainError::new(ErrorCode::InternalError, "billing store lock poisoned"))
}

fn upsert_membership(state: &mut State, membership: Membership) {
    match state.membership_index(&membership.member_id) {
        Some(i) => state.memberships[i] = membership,
        None => state.memberships.push(membership),
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTx>, DomainError> {
        Ok(Box::new(InMemoryBillingTx {
            state: self.state.clone(),
            locks: self.locks.clone(),
            outbox: self.outbox.clone(),
            guards: Vec::new(),
            staged: Vec::new(),
        }))
    }

    async fn save_order(&self, order: &Order) -> Result<(), DomainError> {
        let mut state = lock_state(&self.state)?;
        if state.orders.contains_key(&order.id) {
            return Err(DomainError::new(
                ErrorCode::ConcurrencyConflict,
                format!("order {} already exists", order.id),
            ));
        }
        state.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(lock_state(&self.state)?.orders.get(id).cloned())
    }

    async fn find_membership(&self, member: &MemberId) -> Result<Membership, DomainError> {
        Ok(lock_state(&self.state)?.membership(member))
    }

    async fn list_unexpired_orders(
        &self,
        member: &MemberId,
        as_of: Timestamp,
    ) -> Result<Vec<Order>, DomainError> {
        let state = lock_state(&self.state)?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.is_confirmed() && same_reader(&o.member_id, member))
            .filter(|o| o.window.map_or(false, |w| w.end > as_of))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn list_add_ons(&self, member: &MemberId) -> Result<Vec<AddOn>, DomainError> {
        let state = lock_state(&self.state)?;
        let mut add_ons: Vec<AddOn> = state
            .add_ons
            .iter()
            .filter(|a| same_reader(&a.member_id, member))
            .cloned()
            .collect();
        add_ons.sort_by_key(|a| a.created_at);
        Ok(add_ons)
    }
}

enum Staged {
    ConfirmOrder(Order),
    Snapshot(MembershipSnapshot),
    Membership(Membership),
    DeleteMembership(MemberId),
    AddOn(AddOn),
    Outbox(Vec<OutboxEntry>),
}

pub struct InMemoryBillingTx {
    state: Arc<Mutex<State>>,
    locks: Arc<MemberLocks>,
    outbox: Arc<InMemoryOutbox>,
    guards: Vec<OwnedMutexGuard<()>>,
    staged: Vec<Staged>,
}

impl InMemoryBillingTx {
    fn member_lock(&self, key: String) -> Result<Arc<AsyncMutex<()>>, DomainError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "lock table poisoned"))?;
        Ok(locks.entry(key).or_default().clone())
    }
}

#[async_trait]
impl BillingTx for InMemoryBillingTx {
    async fn load_membership_for_update(
        &mut self,
        member: &MemberId,
    ) -> Result<Membership, DomainError> {
        loop {
            let wanted = {
                let state = lock_state(&self.state)?;
                lock_keys(&state, member)
            };

            let mut guards = Vec::with_capacity(wanted.len());
            for key in &wanted {
                let lock = self.member_lock(key.clone())?;
                guards.push(lock.lock_owned().await);
            }

            // A link made while waiting widens the key set; start over.
            let current = {
                let state = lock_state(&self.state)?;
                let covered = lock_keys(&state, member).is_subset(&wanted);
                covered.then(|| state.membership(member))
            };
            if let Some(membership) = current {
                self.guards.extend(guards);
                return Ok(membership);
            }
        }
    }

    async fn load_order_for_update(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(lock_state(&self.state)?.orders.get(id).cloned())
    }

    async fn confirm_order(&mut self, order: &Order) -> Result<(), DomainError> {
        let state = lock_state(&self.state)?;
        check_confirmable(&state, &order.id)?;
        drop(state);
        self.staged.push(Staged::ConfirmOrder(order.clone()));
        Ok(())
    }

    async fn save_snapshot(&mut self, snapshot: &MembershipSnapshot) -> Result<(), DomainError> {
        self.staged.push(Staged::Snapshot(snapshot.clone()));
        Ok(())
    }

    async fn save_membership(&mut self, membership: &Membership) -> Result<(), DomainError> {
        self.staged.push(Staged::Membership(membership.clone()));
        Ok(())
    }

    async fn delete_membership(&mut self, member: &MemberId) -> Result<(), DomainError> {
        self.staged.push(Staged::DeleteMembership(member.clone()));
        Ok(())
    }

    async fn save_add_on(&mut self, add_on: &AddOn) -> Result<(), DomainError> {
        self.staged.push(Staged::AddOn(add_on.clone()));
        Ok(())
    }

    async fn write_outbox(
        &mut self,
        events: &[EventEnvelope],
        partition_key: &str,
    ) -> Result<(), DomainError> {
        let entries = events
            .iter()
            .map(|e| OutboxEntry::new(e.clone(), partition_key))
            .collect();
        self.staged.push(Staged::Outbox(entries));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let this = *self;
        let mut state = lock_state(&this.state)?;
        let mut outbox_entries = this.outbox.lock()?;

        // Validate before applying anything so a conflict leaves no partial write.
        for write in &this.staged {
            if let Staged::ConfirmOrder(order) = write {
                check_confirmable(&state, &order.id)?;
            }
        }

        for write in this.staged {
            match write {
                Staged::ConfirmOrder(order) => {
                    state.orders.insert(order.id.clone(), order);
                }
                Staged::Snapshot(snapshot) => state.snapshots.push(snapshot),
                Staged::Membership(membership) => upsert_membership(&mut state, membership),
                Staged::DeleteMembership(member) => {
                    if let Some(i) = state.membership_index(&member) {
                        state.memberships.remove(i);
                    }
                }
                Staged::AddOn(add_on) => state.add_ons.push(add_on),
                Staged::Outbox(entries) => outbox_entries.extend(entries),
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}

fn check_confirmable(state: &State, id: &OrderId) -> Result<(), DomainError> {
    match state.orders.get(id) {
        None => Err(DomainError::new(
            ErrorCode::OrderNotFound,
            format!("order {} not found", id),
        )),
        Some(stored) if stored.is_confirmed() => Err(DomainError::new(
            ErrorCode::ConcurrencyConflict,
            format!("order {} is already confirmed", id),
        )),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{OrderKind, OrderStatus, PurchasedWindow};
    use crate::domain::foundation::{Currency, Money};
    use crate::domain::membership::{Edition, PaymentMethod, SnapshotReason};
    use std::time::Duration;
    use uuid::Uuid;

    fn store() -> InMemoryBillingStore {
        InMemoryBillingStore::new(Arc::new(InMemoryOutbox::new()))
    }

    fn order(member: &MemberId) -> Order {
        Order {
            id: OrderId::new(),
            member_id: member.clone(),
            edition: Edition::STANDARD_YEAR,
            kind: OrderKind::Create,
            payment_method: PaymentMethod::Alipay,
            price_id: "price_std_year".to_string(),
            discount_id: None,
            charge: Money::new(29800, Currency::Cny).unwrap(),
            cycle_count: 1,
            status: OrderStatus::Unconfirmed,
            window: None,
            transaction_id: None,
            created_at: Timestamp::now(),
            confirmed_at: None,
        }
    }

    fn confirm(o: &Order) -> Order {
        let now = Timestamp::now();
        let window = PurchasedWindow::new(now, now.add_years(1)).unwrap();
        o.confirmed(OrderKind::Create, Some(window), "txn-1", now)
            .unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Store
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_member_reads_as_zero() {
        let member = MemberId::ftc(Uuid::new_v4());
        let m = store().find_membership(&member).await.unwrap();
        assert!(m.is_zero());
        assert_eq!(m.member_id, member);
    }

    #[tokio::test]
    async fn linked_member_matches_either_half() {
        let s = store();
        let ftc = Uuid::new_v4();
        let linked = MemberId::linked(ftc, "union-1").unwrap();
        let m = Membership::one_time(
            linked,
            Edition::STANDARD_YEAR,
            Timestamp::now().add_days(30),
            PaymentMethod::Wechat,
        );
        s.seed_membership(m.clone()).unwrap();

        let by_union = s
            .find_membership(&MemberId::wechat("union-1").unwrap())
            .await
            .unwrap();
        let by_ftc = s.find_membership(&MemberId::ftc(ftc)).await.unwrap();

        assert_eq!(by_union, m);
        assert_eq!(by_ftc, m);
    }

    #[tokio::test]
    async fn save_order_rejects_duplicate_id() {
        let s = store();
        let o = order(&MemberId::ftc(Uuid::new_v4()));
        s.save_order(&o).await.unwrap();
        assert!(s.save_order(&o).await.is_err());
    }

    #[tokio::test]
    async fn unexpired_orders_exclude_unconfirmed_and_lapsed() {
        let s = store();
        let member = MemberId::ftc(Uuid::new_v4());
        let pending = order(&member);
        let live = confirm(&order(&member));
        s.seed_order(pending).unwrap();
        s.seed_order(live.clone()).unwrap();

        let now = Timestamp::now();
        let orders = s.list_unexpired_orders(&member, now).await.unwrap();
        assert_eq!(orders, vec![live]);

        let later = now.add_years(2);
        assert!(s.list_unexpired_orders(&member, later).await.unwrap().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Transactions
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn commit_applies_all_staged_writes() {
        let s = store();
        let member = MemberId::ftc(Uuid::new_v4());
        let o = order(&member);
        s.save_order(&o).await.unwrap();
        let existing = Membership::one_time(
            member.clone(),
            Edition::STANDARD_YEAR,
            Timestamp::now().add_days(10),
            PaymentMethod::Alipay,
        );
        s.seed_membership(existing.clone()).unwrap();

        let mut tx = s.begin().await.unwrap();
        let current = tx.load_membership_for_update(&member).await.unwrap();
        let snap = MembershipSnapshot::capture(
            &current,
            SnapshotReason::Renew,
            Some(o.id.clone()),
            Timestamp::now(),
        )
        .unwrap();
        tx.save_snapshot(&snap).await.unwrap();
        tx.confirm_order(&confirm(&o)).await.unwrap();
        tx.write_outbox(&[EventEnvelope::test_fixture()], &member.compound_key())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(s.find_order(&o.id).await.unwrap().unwrap().is_confirmed());
        assert_eq!(s.snapshots().len(), 1);
        assert_eq!(s.outbox().entries().len(), 1);
    }

    #[tokio::test]
    async fn dropped_tx_writes_nothing() {
        let s = store();
        let member = MemberId::ftc(Uuid::new_v4());
        let o = order(&member);
        s.save_order(&o).await.unwrap();

        {
            let mut tx = s.begin().await.unwrap();
            tx.load_membership_for_update(&member).await.unwrap();
            tx.confirm_order(&confirm(&o)).await.unwrap();
            tx.write_outbox(&[EventEnvelope::test_fixture()], "k")
                .await
                .unwrap();
        }

        assert!(!s.find_order(&o.id).await.unwrap().unwrap().is_confirmed());
        assert!(s.outbox().entries().is_empty());
    }

    #[tokio::test]
    async fn confirming_twice_conflicts() {
        let s = store();
        let member = MemberId::ftc(Uuid::new_v4());
        let o = order(&member);
        s.seed_order(confirm(&o)).unwrap();

        let mut tx = s.begin().await.unwrap();
        let err = tx.confirm_order(&confirm(&o)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ConcurrencyConflict);
    }

    #[tokio::test]
    async fn member_lock_serializes_transactions() {
        let s = Arc::new(store());
        let member = MemberId::ftc(Uuid::new_v4());

        let mut first = s.begin().await.unwrap();
        first.load_membership_for_update(&member).await.unwrap();

        let s2 = s.clone();
        let m2 = member.clone();
        let waiter = tokio::spawn(async move {
            let mut second = s2.begin().await.unwrap();
            second.load_membership_for_update(&m2).await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.rollback().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn either_identity_half_takes_the_same_lock() {
        let s = Arc::new(store());
        let ftc = Uuid::new_v4();
        s.seed_membership(Membership::one_time(
            MemberId::linked(ftc, "union-1").unwrap(),
            Edition::STANDARD_YEAR,
            Timestamp::now().add_days(100),
            PaymentMethod::Wechat,
        ))
        .unwrap();

        let mut first = s.begin().await.unwrap();
        first
            .load_membership_for_update(&MemberId::ftc(ftc))
            .await
            .unwrap();

        let s2 = s.clone();
        let waiter = tokio::spawn(async move {
            let mut second = s2.begin().await.unwrap();
            second
                .load_membership_for_update(&MemberId::wechat("union-1").unwrap())
                .await
                .unwrap();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.rollback().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn commit_with_unusable_outbox_applies_nothing() {
        let s = store();
        let member = MemberId::ftc(Uuid::new_v4());
        let o = order(&member);
        s.save_order(&o).await.unwrap();

        let outbox = s.outbox();
        let _ = std::thread::spawn(move || {
            let _held = outbox.lock().unwrap();
            panic!("poison outbox");
        })
        .join();

        let mut tx = s.begin().await.unwrap();
        tx.load_membership_for_update(&member).await.unwrap();
        tx.confirm_order(&confirm(&o)).await.unwrap();
        tx.write_outbox(&[EventEnvelope::test_fixture()], "k")
            .await
            .unwrap();

        assert!(tx.commit().await.is_err());
        assert!(!s.find_order(&o.id).await.unwrap().unwrap().is_confirmed());
    }

    #[tokio::test]
    async fn delete_membership_on_commit() {
        let s = store();
        let member = MemberId::ftc(Uuid::new_v4());
        s.seed_membership(Membership::one_time(
            member.clone(),
            Edition::PREMIUM_YEAR,
            Timestamp::now().add_days(5),
            PaymentMethod::Alipay,
        ))
        .unwrap();

        let mut tx = s.begin().await.unwrap();
        tx.load_membership_for_update(&member).await.unwrap();
        tx.delete_membership(&member).await.unwrap();
        tx.commit().await.unwrap();

        assert!(s.find_membership(&member).await.unwrap().is_zero());
    }
}
