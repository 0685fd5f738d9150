//! Live query subscriptions over the crime table.
//!
//! # Responsibility
//! - Hand out `LiveQuery` handles that receive fresh snapshots after writes.
//! - Track active subscriptions on the worker side and prune dead ones.
//!
//! # Invariants
//! - The first notification is the initial snapshot, delivered after
//!   `subscribe` has returned.
//! - Each subscription holds at most one pending snapshot; a newer one
//!   replaces an unread older one.
//! - A cancelled or dropped `LiveQuery` never receives another notification.
//! - Read errors are delivered as `Err` notifications; the subscription stays
//!   open.

use crate::model::crime::{Crime, CrimeId};
use crate::repo::crime_dao::{CrimeDao, RepoError, RepoResult};
use log::debug;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Unique handle ID for one subscription.
pub type SubscriptionId = u64;

/// Identifies which query a subscription re-runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKey {
    AllCrimes,
    Crime(CrimeId),
}

struct SlotState<T> {
    pending: Option<RepoResult<T>>,
    closed: bool,
}

impl<T> SlotState<T> {
    /// Takes the pending snapshot, or reports a closed slot.
    fn take_snapshot(&mut self) -> Option<RepoResult<T>> {
        match self.pending.take() {
            Some(snapshot) => Some(snapshot),
            None if self.closed => Some(Err(RepoError::WorkerUnavailable)),
            None => None,
        }
    }
}

/// Latest-value mailbox shared by both halves of a subscription.
struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                pending: None,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: RepoResult<T>) {
        self.lock().pending = Some(snapshot);
        self.ready.notify_all();
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    fn wait(&self, deadline: Option<Instant>) -> Option<RepoResult<T>> {
        let mut state = self.lock();
        loop {
            if let Some(snapshot) = state.take_snapshot() {
                return Some(snapshot);
            }
            state = match deadline {
                None => self
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let remaining = deadline.checked_duration_since(Instant::now())?;
                    self.ready
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

/// Subscriber-side handle of a live query.
///
/// Snapshots are conflated: a reader that falls behind sees only the newest
/// one. Dropping the handle unsubscribes it.
pub struct LiveQuery<T> {
    id: SubscriptionId,
    key: QueryKey,
    slot: Arc<Slot<T>>,
    cancelled: Arc<AtomicBool>,
}

impl<T> LiveQuery<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn key(&self) -> QueryKey {
        self.key
    }

    /// Blocks until the next snapshot arrives.
    ///
    /// Returns `RepoError::WorkerUnavailable` once the repository is gone.
    pub fn recv(&self) -> RepoResult<T> {
        self.slot
            .wait(None)
            .unwrap_or(Err(RepoError::WorkerUnavailable))
    }

    /// Waits up to `timeout` for the next snapshot. `None` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RepoResult<T>> {
        self.slot.wait(Some(Instant::now() + timeout))
    }

    /// Returns the pending snapshot without blocking.
    pub fn try_recv(&self) -> Option<RepoResult<T>> {
        self.slot.lock().take_snapshot()
    }

    /// Newest pending snapshot, if any. Same as [`LiveQuery::try_recv`],
    /// since older snapshots are never queued.
    pub fn latest(&self) -> Option<RepoResult<T>> {
        self.try_recv()
    }

    /// Waits until a successful snapshot satisfies `accept`.
    ///
    /// Error notifications are skipped. Returns `None` when `timeout` elapses
    /// or the repository shuts down first.
    pub fn wait_until(&self, timeout: Duration, mut accept: impl FnMut(&T) -> bool) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.slot.wait(Some(deadline))? {
                Ok(value) if accept(&value) => return Some(value),
                Ok(_) => continue,
                Err(RepoError::WorkerUnavailable) => return None,
                Err(_) => continue,
            }
        }
    }

    /// Stops notifications for this subscription.
    pub fn cancel(self) {}
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Worker-side publishing half. Dropping it closes the subscription.
pub(crate) struct Publisher<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Publisher<T> {
    fn publish(&self, snapshot: RepoResult<T>) {
        self.slot.publish(snapshot);
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        self.slot.close();
    }
}

/// Worker-side half of a subscription, sent with the subscribe request.
pub(crate) enum Subscriber {
    AllCrimes(Publisher<Vec<Crime>>),
    Crime(CrimeId, Publisher<Option<Crime>>),
}

pub(crate) struct Registration {
    pub(crate) id: SubscriptionId,
    pub(crate) subscriber: Subscriber,
    cancelled: Arc<AtomicBool>,
}

/// Creates the two halves of an all-crimes subscription.
pub(crate) fn all_crimes_channel(id: SubscriptionId) -> (LiveQuery<Vec<Crime>>, Registration) {
    let slot = Arc::new(Slot::new());
    let publisher = Publisher {
        slot: Arc::clone(&slot),
    };
    pair(id, QueryKey::AllCrimes, slot, Subscriber::AllCrimes(publisher))
}

/// Creates the two halves of a single-crime subscription.
pub(crate) fn crime_channel(
    id: SubscriptionId,
    crime_id: CrimeId,
) -> (LiveQuery<Option<Crime>>, Registration) {
    let slot = Arc::new(Slot::new());
    let publisher = Publisher {
        slot: Arc::clone(&slot),
    };
    pair(
        id,
        QueryKey::Crime(crime_id),
        slot,
        Subscriber::Crime(crime_id, publisher),
    )
}

fn pair<T>(
    id: SubscriptionId,
    key: QueryKey,
    slot: Arc<Slot<T>>,
    subscriber: Subscriber,
) -> (LiveQuery<T>, Registration) {
    let cancelled = Arc::new(AtomicBool::new(false));
    let query = LiveQuery {
        id,
        key,
        slot,
        cancelled: Arc::clone(&cancelled),
    };
    let registration = Registration {
        id,
        subscriber,
        cancelled,
    };
    (query, registration)
}

/// Active subscriptions, owned by the write worker.
#[derive(Default)]
pub(crate) struct LiveRegistry {
    entries: BTreeMap<SubscriptionId, Registration>,
}

impl LiveRegistry {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Registers a subscription and delivers its initial snapshot.
    pub(crate) fn register(&mut self, registration: Registration, dao: &dyn CrimeDao) {
        let mut cache = None;
        if deliver(&registration, dao, &mut cache) {
            debug!(
                "event=live_subscribe module=live status=ok subscription_id={}",
                registration.id
            );
            self.entries.insert(registration.id, registration);
        }
    }

    /// Re-runs every active query and pushes the results.
    pub(crate) fn refresh_all(&mut self, dao: &dyn CrimeDao) {
        let mut cache = None;
        let before = self.entries.len();
        self.entries
            .retain(|_, registration| deliver(registration, dao, &mut cache));

        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(
                "event=live_prune module=live status=ok pruned={} active={}",
                pruned,
                self.entries.len()
            );
        }
    }
}

/// Publishes a fresh snapshot; returns `false` when the subscriber is gone.
fn deliver(
    registration: &Registration,
    dao: &dyn CrimeDao,
    all_crimes_cache: &mut Option<Vec<Crime>>,
) -> bool {
    if registration.cancelled.load(Ordering::Acquire) {
        return false;
    }

    match &registration.subscriber {
        Subscriber::AllCrimes(publisher) => {
            let snapshot = match all_crimes_cache {
                Some(cached) => Ok(cached.clone()),
                None => {
                    let result = dao.list_all();
                    if let Ok(crimes) = &result {
                        *all_crimes_cache = Some(crimes.clone());
                    }
                    result
                }
            };
            publisher.publish(snapshot);
        }
        Subscriber::Crime(crime_id, publisher) => publisher.publish(dao.find(*crime_id)),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{all_crimes_channel, crime_channel, LiveRegistry};
    use crate::db::open_db_in_memory;
    use crate::model::crime::Crime;
    use crate::repo::crime_dao::{CrimeDao, RepoError, SqliteCrimeDao};
    use std::time::Duration;

    #[test]
    fn register_delivers_initial_snapshot() {
        let conn = open_db_in_memory().unwrap();
        let dao = SqliteCrimeDao::new(&conn);
        let crime = Crime::new();
        dao.insert(&crime).unwrap();

        let mut registry = LiveRegistry::default();
        let (query, registration) = all_crimes_channel(1);
        registry.register(registration, &dao);

        let snapshot = query.try_recv().unwrap().unwrap();
        assert_eq!(snapshot, vec![crime]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn refresh_prunes_cancelled_subscriptions() {
        let conn = open_db_in_memory().unwrap();
        let dao = SqliteCrimeDao::new(&conn);
        let crime = Crime::new();

        let mut registry = LiveRegistry::default();
        let (kept, kept_registration) = crime_channel(1, crime.id());
        let (dropped, dropped_registration) = all_crimes_channel(2);
        registry.register(kept_registration, &dao);
        registry.register(dropped_registration, &dao);
        assert_eq!(registry.len(), 2);

        dropped.cancel();
        dao.insert(&crime).unwrap();
        registry.refresh_all(&dao);

        assert_eq!(registry.len(), 1);
        assert_eq!(kept.latest().unwrap().unwrap(), Some(crime));
    }

    #[test]
    fn unread_snapshots_are_replaced_by_newer_ones() {
        let conn = open_db_in_memory().unwrap();
        let dao = SqliteCrimeDao::new(&conn);

        let mut registry = LiveRegistry::default();
        let (query, registration) = all_crimes_channel(1);
        registry.register(registration, &dao);
        for _ in 0..50 {
            dao.insert(&Crime::new()).unwrap();
            registry.refresh_all(&dao);
        }

        assert_eq!(query.try_recv().unwrap().unwrap().len(), 50);
        assert!(query.try_recv().is_none());
    }

    #[test]
    fn dropped_registration_reports_worker_unavailable() {
        let (query, registration) = all_crimes_channel(1);
        drop(registration);
        assert!(matches!(query.recv(), Err(RepoError::WorkerUnavailable)));
    }

    #[test]
    fn wait_until_times_out_without_matching_snapshot() {
        let (query, _registration) = crime_channel(1, Crime::new().id());
        let found = query.wait_until(Duration::from_millis(20), |value| value.is_some());
        assert!(found.is_none());
    }
}
