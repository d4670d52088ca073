//! In-process collaborators: video transport, telemetry sink, settings store.

use park_common::link::{FrameTransport, SensorSnapshot, SettingsStore, StoreError, TelemetrySink};
use park_common::settings::Settings;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

// ─── Video transport ────────────────────────────────────────────────

/// Transport that counts what would have gone out on the wire.
#[derive(Debug)]
pub struct SimTransport {
    subscribers: AtomicUsize,
    writable: AtomicBool,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl SimTransport {
    /// Writable transport with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: AtomicUsize::new(0),
            writable: AtomicBool::new(true),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    /// Set the connected subscriber count.
    pub fn set_subscribers(&self, n: usize) {
        self.subscribers.store(n, Ordering::SeqCst);
    }

    /// Simulate back-pressure (`false`) or a drained socket (`true`).
    pub fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }

    /// Frames broadcast so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::SeqCst)
    }

    /// Payload bytes broadcast so far.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::SeqCst)
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTransport for SimTransport {
    fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }

    fn is_writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    fn broadcast_binary(&self, data: &[u8]) {
        self.frames_sent.fetch_add(1, Ordering::SeqCst);
        self.bytes_sent.fetch_add(data.len() as u64, Ordering::SeqCst);
    }
}

// ─── Telemetry ──────────────────────────────────────────────────────

/// Sink that logs each snapshot as JSON at debug level.
#[derive(Debug, Default)]
pub struct LogTelemetrySink {
    clients: AtomicUsize,
    published: AtomicU64,
    last: Mutex<Option<SensorSnapshot>>,
}

impl LogTelemetrySink {
    /// Sink with no clients.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connected dashboard client count.
    pub fn set_clients(&self, n: usize) {
        self.clients.store(n, Ordering::SeqCst);
    }

    /// Snapshots published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }

    /// Most recent snapshot.
    pub fn last(&self) -> Option<SensorSnapshot> {
        *self.last.lock()
    }
}

impl TelemetrySink for LogTelemetrySink {
    fn client_count(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }

    fn publish(&self, snapshot: &SensorSnapshot) {
        if let Ok(json) = serde_json::to_string(snapshot) {
            debug!(target: "telemetry", "{json}");
        }
        *self.last.lock() = Some(*snapshot);
        self.published.fetch_add(1, Ordering::SeqCst);
    }
}

// ─── Settings store ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StoreState {
    record: Option<Settings>,
    saves: u64,
    fail_saves: bool,
    corrupt: bool,
}

/// Volatile settings store. Clones share the same record, so a test can keep
/// one handle while the runtime owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<Mutex<StoreState>>);

impl MemoryStore {
    /// Empty store: the first `load()` returns `Ok(None)`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `settings`.
    pub fn with_record(settings: Settings) -> Self {
        let store = Self::default();
        store.0.lock().record = Some(settings);
        store
    }

    /// Last saved (or seeded) record.
    pub fn record(&self) -> Option<Settings> {
        self.0.lock().record.clone()
    }

    /// Successful `save()` calls.
    pub fn saves(&self) -> u64 {
        self.0.lock().saves
    }

    /// Make `save()` fail with an I/O error while `fail` is set.
    pub fn set_fail_saves(&self, fail: bool) {
        self.0.lock().fail_saves = fail;
    }

    /// Make `load()` report a corrupt record.
    pub fn set_corrupt(&self, corrupt: bool) {
        self.0.lock().corrupt = corrupt;
    }
}

impl SettingsStore for MemoryStore {
    fn load(&mut self) -> Result<Option<Settings>, StoreError> {
        let state = self.0.lock();
        if state.corrupt {
            return Err(StoreError::Corrupt("checksum mismatch".into()));
        }
        Ok(state.record.clone())
    }

    fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        let mut state = self.0.lock();
        if state.fail_saves {
            return Err(StoreError::Io("flash write failed".into()));
        }
        state.record = Some(settings.clone());
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_clones_share_record() {
        let observer = MemoryStore::new();
        let mut owner = observer.clone();
        assert!(owner.load().unwrap().is_none());

        let mut settings = Settings::default();
        settings.audio.volume = 40;
        owner.save(&settings).unwrap();
        assert_eq!(observer.saves(), 1);
        assert_eq!(observer.record().map(|s| s.audio.volume), Some(40));
    }

    #[test]
    fn store_failure_injection() {
        let mut store = MemoryStore::new();
        store.set_fail_saves(true);
        assert!(store.save(&Settings::default()).is_err());
        store.set_corrupt(true);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn transport_counts_bytes() {
        let t = SimTransport::new();
        t.broadcast_binary(&[1, 2, 3]);
        t.broadcast_binary(&[4]);
        assert_eq!(t.frames_sent(), 2);
        assert_eq!(t.bytes_sent(), 4);
    }

    #[test]
    fn telemetry_keeps_last_snapshot() {
        let sink = LogTelemetrySink::new();
        let snap = SensorSnapshot {
            sensors: [10.0, 20.0, 30.0],
            active: true,
            muted: false,
        };
        sink.publish(&snap);
        assert_eq!(sink.last(), Some(snap));
        assert_eq!(sink.published(), 1);
    }
}
