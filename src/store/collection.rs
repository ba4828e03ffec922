//! Synchronized Collection
//!
//! The merge authority for one entity type. All writes (realtime change
//! events and the initial bulk seed) go through a single mutex-guarded merge
//! path; readers only ever see whole [`Snapshot`]s published over a watch
//! channel, so no reader observes a half-applied event.
//!
//! Merge rules:
//! - **Insert**: no-op when the identity is already held; otherwise append.
//! - **Update**: replace in place; an unknown identity is inserted (logged)
//!   without a "new entity" notice.
//! - **Delete**: remove by identity; no-op when absent.
//!
//! Entities the policy reports as expired are pruned whenever a change is
//! merged.
//!
//! Events may arrive before, during, or after the bulk seed. Seeding never
//! duplicates a realtime insert and never resurrects a row deleted while the
//! load was in flight.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};

use super::policy::MergePolicy;
use crate::model::{Clock, Entity, IdentityKey, SystemClock};
use crate::realtime::{ChangeEvent, ChangeHandler};

const NOTICE_CAPACITY: usize = 64;

/// Progress of the initial bulk load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }
}

/// Immutable view of a collection at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot<E> {
    /// Held entities in insertion order
    pub items: Vec<E>,
    pub load_state: LoadState,
    /// Incremented on every published change
    pub version: u64,
}

impl<E: Entity> Snapshot<E> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            load_state: LoadState::Idle,
            version: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an entity by raw or normalized identity
    pub fn get(&self, identity: &str) -> Option<&E> {
        let key = IdentityKey::new(identity);
        self.items.iter().find(|e| e.identity_key() == key)
    }
}

/// Side effects broadcast to observers
#[derive(Debug, Clone)]
pub enum StoreNotice<E> {
    /// An identity was inserted for the first time
    Added(E),
}

/// Result of merging one change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    Removed,
    Unchanged,
    /// Dropped by the entity policy
    Rejected,
    /// The collection was disposed
    Disposed,
}

struct CollectionState<E> {
    items: Vec<E>,
    index: HashMap<IdentityKey, usize>,
    /// Identities that have ever been held (only when notices are raised)
    seen: HashSet<IdentityKey>,
    track_seen: bool,
    /// Identities deleted before the seed landed
    tombstones: HashSet<IdentityKey>,
    seeded: bool,
    load_state: LoadState,
    version: u64,
}

impl<E: Entity> CollectionState<E> {
    fn new(track_seen: bool) -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            seen: HashSet::new(),
            track_seen,
            tombstones: HashSet::new(),
            seeded: false,
            load_state: LoadState::Idle,
            version: 0,
        }
    }

    fn push(&mut self, key: IdentityKey, entity: E) {
        self.index.insert(key.clone(), self.items.len());
        self.items.push(entity);
        if self.track_seen {
            self.seen.insert(key);
        }
    }

    fn remove(&mut self, key: &IdentityKey) -> bool {
        let Some(pos) = self.index.remove(key) else {
            return false;
        };
        self.items.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        true
    }

    /// Keep only entities matching `keep`; returns how many were dropped
    fn retain(&mut self, mut keep: impl FnMut(&E) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|e| keep(e));
        let dropped = before - self.items.len();
        if dropped > 0 {
            self.index = self
                .items
                .iter()
                .enumerate()
                .map(|(pos, e)| (e.identity_key(), pos))
                .collect();
        }
        dropped
    }

    fn snapshot(&self) -> Snapshot<E> {
        Snapshot {
            items: self.items.clone(),
            load_state: self.load_state.clone(),
            version: self.version,
        }
    }
}

/// Live, deduplicated collection of one entity type
pub struct SyncedCollection<E: Entity> {
    state: Mutex<CollectionState<E>>,
    policy: Box<dyn MergePolicy<E>>,
    clock: Arc<dyn Clock>,
    snapshots: watch::Sender<Arc<Snapshot<E>>>,
    notices: broadcast::Sender<StoreNotice<E>>,
    alive: AtomicBool,
}

impl<E: Entity> SyncedCollection<E> {
    pub fn new(policy: impl MergePolicy<E> + 'static) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a collection whose retention checks use `clock`
    pub fn with_clock(policy: impl MergePolicy<E> + 'static, clock: Arc<dyn Clock>) -> Self {
        let (snapshots, _) = watch::channel(Arc::new(Snapshot::empty()));
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            state: Mutex::new(CollectionState::new(policy.announces_new())),
            policy: Box::new(policy),
            clock,
            snapshots,
            notices,
            alive: AtomicBool::new(true),
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot<E>> {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified whenever a new snapshot is published
    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot<E>>> {
        self.snapshots.subscribe()
    }

    /// Receiver for "new entity" notices
    pub fn notices(&self) -> broadcast::Receiver<StoreNotice<E>> {
        self.notices.subscribe()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop accepting merges; later events are ignored
    pub fn dispose(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            tracing::debug!(table = E::TABLE, "Collection disposed");
        }
    }

    /// Merge one change event
    pub async fn apply(&self, event: ChangeEvent<E>) -> MergeOutcome {
        if !self.is_alive() {
            tracing::debug!(table = E::TABLE, "Ignoring change for disposed collection");
            return MergeOutcome::Disposed;
        }

        let mut state = self.state.lock().await;
        let outcome = match event {
            ChangeEvent::Insert(entity) => self.merge_insert(&mut state, entity, true),
            ChangeEvent::Update(entity) => self.merge_update(&mut state, entity),
            ChangeEvent::Delete(key) => self.merge_delete(&mut state, key),
        };
        let pruned = self.prune_locked(&mut state);

        if pruned > 0
            || matches!(
                outcome,
                MergeOutcome::Inserted | MergeOutcome::Replaced | MergeOutcome::Removed
            )
        {
            self.publish(&mut state);
        }
        outcome
    }

    /// Drop entities the policy reports as expired
    ///
    /// Returns the number removed. Also runs on every merged change.
    pub async fn prune_expired(&self) -> usize {
        if !self.is_alive() {
            return 0;
        }
        let mut state = self.state.lock().await;
        let pruned = self.prune_locked(&mut state);
        if pruned > 0 {
            self.publish(&mut state);
        }
        pruned
    }

    fn prune_locked(&self, state: &mut CollectionState<E>) -> usize {
        let now = self.clock.now();
        let pruned = state.retain(|e| !self.policy.expired(e, now));
        if pruned > 0 {
            tracing::debug!(table = E::TABLE, pruned, "Pruned expired entities");
        }
        pruned
    }

    fn merge_insert(
        &self,
        state: &mut CollectionState<E>,
        entity: E,
        announce: bool,
    ) -> MergeOutcome {
        let key = entity.identity_key();
        if state.index.contains_key(&key) {
            return MergeOutcome::Unchanged;
        }
        if !self.policy.is_live(&entity) || !self.policy.admit(&entity, self.clock.now()) {
            tracing::debug!(table = E::TABLE, key = %key, "Insert rejected by policy");
            return MergeOutcome::Rejected;
        }

        let first_time = !state.seen.contains(&key);
        state.tombstones.remove(&key);
        state.push(key, entity.clone());

        if announce && first_time && self.policy.announces_new() {
            // No receivers is fine
            let _ = self.notices.send(StoreNotice::Added(entity));
        }
        MergeOutcome::Inserted
    }

    fn merge_update(&self, state: &mut CollectionState<E>, entity: E) -> MergeOutcome {
        let key = entity.identity_key();
        let Some(&pos) = state.index.get(&key) else {
            tracing::info!(table = E::TABLE, key = %key, "Update for unknown identity, inserting");
            return self.merge_insert(state, entity, false);
        };

        if self.policy.is_live(&entity) {
            state.items[pos] = entity;
            MergeOutcome::Replaced
        } else {
            state.remove(&key);
            tracing::debug!(table = E::TABLE, key = %key, "Entity no longer live, removed");
            MergeOutcome::Removed
        }
    }

    fn merge_delete(&self, state: &mut CollectionState<E>, key: IdentityKey) -> MergeOutcome {
        if !state.seeded {
            state.tombstones.insert(key.clone());
        }
        if state.remove(&key) {
            MergeOutcome::Removed
        } else {
            MergeOutcome::Unchanged
        }
    }

    /// Merge the initial bulk snapshot and mark the collection ready
    ///
    /// Records already held, repeated within `records`, deleted while the
    /// load was in flight, or not live per the policy are skipped. Seeded
    /// records never raise notices. Returns the number of records added.
    pub async fn seed(&self, records: Vec<E>) -> usize {
        if !self.is_alive() {
            return 0;
        }

        let mut state = self.state.lock().await;
        let total = records.len();
        let mut added = 0;
        for entity in records {
            let key = entity.identity_key();
            if key.is_empty()
                || state.index.contains_key(&key)
                || state.tombstones.contains(&key)
                || !self.policy.is_live(&entity)
            {
                continue;
            }
            state.push(key, entity);
            added += 1;
        }

        state.seeded = true;
        state.tombstones.clear();
        state.load_state = LoadState::Ready;
        self.publish(&mut state);

        tracing::info!(table = E::TABLE, received = total, added, "Collection seeded");
        added
    }

    /// Record load progress without touching the held entities
    pub async fn set_load_state(&self, load_state: LoadState) {
        let mut state = self.state.lock().await;
        if state.load_state != load_state {
            state.load_state = load_state;
            self.publish(&mut state);
        }
    }

    fn publish(&self, state: &mut CollectionState<E>) {
        state.version += 1;
        self.snapshots.send_replace(Arc::new(state.snapshot()));
    }
}

#[async_trait]
impl<E: Entity> ChangeHandler<E> for SyncedCollection<E> {
    async fn on_change(&self, event: ChangeEvent<E>) {
        let kind = event.kind();
        let outcome = self.apply(event).await;
        tracing::trace!(table = E::TABLE, kind = %kind, outcome = ?outcome, "Merged change");
    }
}
