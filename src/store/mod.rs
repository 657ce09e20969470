//! Bounded in-memory capture store.
//!
//! Holds sanitized records keyed by id, with two eviction mechanisms layered
//! on top of each other:
//!
//! - **Capacity (FIFO)**: admission beyond the configured capacity evicts
//!   exactly one record, the oldest by insertion order. Normal operation,
//!   not an error.
//! - **TTL**: every entry expires a fixed interval after admission. Expiry
//!   is enforced lazily on every read and mutation path, plus a periodic
//!   background sweep so idle stores do not pin memory for dead entries.
//!
//! All operations take a single short critical section under one lock, so
//! an admission at capacity can never evict more than one record and
//! concurrent admissions cannot overshoot the bound.

pub mod types;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{LimitSettings, StoreSettings};
use crate::metrics;
use crate::sanitize::sanitize;
use crate::store::types::{Admission, RawRecord, Record, StoreEntry, StoreStats};

/// Current wall-clock time as epoch milliseconds.
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Store Service
// =============================================================================

/// Thread-safe handle to the capture store. Cheap to clone; all clones share
/// the same state.
#[derive(Clone)]
pub struct CaptureStore {
    inner: Arc<CaptureStoreInner>,
}

struct CaptureStoreInner {
    state: RwLock<StoreState>,
    store_config: StoreSettings,
    limits: LimitSettings,
    /// Present while the sweeper task is running; taken on teardown.
    sweeper_stop: Mutex<Option<oneshot::Sender<()>>>,
}

/// Mutable state guarded by the store lock. `records` and `order` always
/// hold exactly the same set of ids.
struct StoreState {
    records: HashMap<String, StoreEntry>,
    /// Insertion order, oldest at the front. Drives capacity eviction.
    order: VecDeque<String>,
    /// Monotonic admission counter, used to break list-ordering ties.
    next_seq: u64,
}

impl StoreState {
    /// Drops every expired entry, returning how many were removed.
    fn purge_expired(&mut self, now_ms: i64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, entry| !entry.is_expired(now_ms));
        let removed = before - self.records.len();
        if removed > 0 {
            let records = &self.records;
            self.order.retain(|id| records.contains_key(id));
        }
        removed
    }

    /// Removes the single oldest entry by insertion order.
    fn evict_oldest(&mut self) -> Option<String> {
        let id = self.order.pop_front()?;
        self.records.remove(&id);
        Some(id)
    }
}

impl CaptureStore {
    pub fn new(store_config: StoreSettings, limits: LimitSettings) -> Self {
        Self {
            inner: Arc::new(CaptureStoreInner {
                state: RwLock::new(StoreState {
                    records: HashMap::new(),
                    order: VecDeque::new(),
                    next_seq: 0,
                }),
                store_config,
                limits,
                sweeper_stop: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &StoreSettings {
        &self.inner.store_config
    }

    pub fn limits(&self) -> &LimitSettings {
        &self.inner.limits
    }

    // =========================================================================
    // Admission
    // =========================================================================

    /// Sanitizes and admits a raw submission.
    ///
    /// Invalid records are rejected without touching stored state. At
    /// capacity, exactly one record (the oldest by insertion order) is
    /// evicted to make room. Re-submitting an existing id replaces that
    /// record in place and resets its position and TTL.
    pub fn admit(&self, raw: &RawRecord) -> Admission {
        let record = match sanitize(raw, &self.inner.limits) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "rejected record submission");
                metrics::record_rejected();
                return Admission::Rejected(err);
            },
        };

        let now = now_ms();
        let expires_at = now + self.inner.store_config.ttl_ms;
        let id = record.id.clone();

        let mut state = self.inner.state.write();
        let expired = state.purge_expired(now);

        // replacement never triggers an eviction
        if state.records.remove(&id).is_some() {
            state.order.retain(|queued| queued != &id);
        }

        let evicted = if state.records.len() >= self.inner.store_config.capacity {
            state.evict_oldest()
        } else {
            None
        };

        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.push_back(id.clone());
        state.records.insert(
            id.clone(),
            StoreEntry {
                record: record.clone(),
                expires_at,
                seq,
            },
        );
        let count = state.records.len();
        drop(state);

        if expired > 0 {
            metrics::record_expired(expired as u64);
        }
        metrics::record_admitted();
        if let Some(evicted_id) = &evicted {
            debug!(admitted = %id, evicted = %evicted_id, "capacity eviction");
            metrics::record_evicted();
        }
        metrics::set_store_records(count);

        Admission::Admitted { record, evicted }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetches a record by id. Expired entries are treated as absent and
    /// dropped on touch.
    pub fn get(&self, id: &str) -> Option<Record> {
        let now = now_ms();
        let mut state = self.inner.state.write();

        match state.records.get(id) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.record.clone()),
            Some(_) => {},
            None => return None,
        }

        state.records.remove(id);
        state.order.retain(|queued| queued != id);
        let count = state.records.len();
        drop(state);

        metrics::record_expired(1);
        metrics::set_store_records(count);
        None
    }

    /// All live records, newest capture first. Records with the same
    /// `capturedAt` order by most recent admission first.
    pub fn list(&self) -> Vec<Record> {
        let now = now_ms();
        let mut state = self.inner.state.write();
        let expired = state.purge_expired(now);
        let mut entries: Vec<(i64, u64, Record)> = state
            .records
            .values()
            .map(|entry| (entry.record.captured_at, entry.seq, entry.record.clone()))
            .collect();
        let count = state.records.len();
        drop(state);

        if expired > 0 {
            metrics::record_expired(expired as u64);
            metrics::set_store_records(count);
        }

        entries.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        entries.into_iter().map(|(_, _, record)| record).collect()
    }

    /// Case-insensitive substring search over label, excerpt, body, and
    /// source reference. Results keep the [`list`](Self::list) ordering.
    pub fn search(&self, query: &str) -> Vec<Record> {
        let needle = query.to_lowercase();
        self.list()
            .into_iter()
            .filter(|record| {
                record.label.to_lowercase().contains(&needle)
                    || record.excerpt.to_lowercase().contains(&needle)
                    || record.body.to_lowercase().contains(&needle)
                    || record.source_ref.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Live count, configured bounds, and capture-time range. The range
    /// bounds are `None` when the store is empty.
    pub fn stats(&self) -> StoreStats {
        let now = now_ms();
        let mut state = self.inner.state.write();
        let expired = state.purge_expired(now);
        let count = state.records.len();
        let oldest = state
            .records
            .values()
            .map(|entry| entry.record.captured_at)
            .min();
        let newest = state
            .records
            .values()
            .map(|entry| entry.record.captured_at)
            .max();
        drop(state);

        if expired > 0 {
            metrics::record_expired(expired as u64);
            metrics::set_store_records(count);
        }

        StoreStats {
            count,
            capacity: self.inner.store_config.capacity,
            ttl_ms: self.inner.store_config.ttl_ms,
            oldest_captured_at: oldest,
            newest_captured_at: newest,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Removes a record by id. Returns `false` for ids that are absent or
    /// already expired.
    pub fn remove(&self, id: &str) -> bool {
        let now = now_ms();
        let mut state = self.inner.state.write();

        let Some(entry) = state.records.get(id) else {
            return false;
        };
        let was_expired = entry.is_expired(now);

        state.records.remove(id);
        state.order.retain(|queued| queued != id);
        let count = state.records.len();
        drop(state);

        metrics::set_store_records(count);
        if was_expired {
            metrics::record_expired(1);
            return false;
        }
        true
    }

    /// Drops every record, returning how many live ones were cleared.
    pub fn clear(&self) -> usize {
        let now = now_ms();
        let mut state = self.inner.state.write();
        let expired = state.purge_expired(now);
        let cleared = state.records.len();
        state.records.clear();
        state.order.clear();
        drop(state);

        if expired > 0 {
            metrics::record_expired(expired as u64);
        }
        metrics::set_store_records(0);
        debug!(cleared, "store cleared");
        cleared
    }

    // =========================================================================
    // Expiry Sweep
    // =========================================================================

    /// Removes every expired entry immediately. Returns how many were
    /// dropped.
    pub fn sweep(&self) -> usize {
        let now = now_ms();
        let mut state = self.inner.state.write();
        let expired = state.purge_expired(now);
        let count = state.records.len();
        drop(state);

        if expired > 0 {
            info!(expired, remaining = count, "expiry sweep removed records");
            metrics::record_expired(expired as u64);
            metrics::set_store_records(count);
        }
        expired
    }

    /// Spawns the periodic expiry sweep task. Calling this while a sweeper
    /// is already running is a no-op, so overlapping sweeps cannot happen.
    pub fn start_sweeper(&self) {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        {
            let mut slot = self.inner.sweeper_stop.lock();
            if slot.is_some() {
                debug!("expiry sweeper already running");
                return;
            }
            *slot = Some(stop_tx);
        }

        let interval_ms = self.inner.store_config.sweep_interval_ms;
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval fires immediately; the first real sweep waits one period
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        store.sweep();
                    },
                    _ = &mut stop_rx => break,
                }
            }
            debug!("expiry sweeper stopped");
        });
        info!(interval_ms, "expiry sweeper started");
    }

    /// Stops the sweeper and drops every record. Safe to call repeatedly;
    /// later calls are no-ops.
    pub fn teardown(&self) {
        let stop = self.inner.sweeper_stop.lock().take();
        let had_sweeper = stop.is_some();
        if let Some(stop_tx) = stop {
            let _ = stop_tx.send(());
        }

        let mut state = self.inner.state.write();
        let dropped = state.records.len();
        state.records.clear();
        state.order.clear();
        drop(state);

        metrics::set_store_records(0);
        if had_sweeper || dropped > 0 {
            info!(dropped, "capture store torn down");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
