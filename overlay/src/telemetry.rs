//! Hand-off of player telemetry from the game-state listener to the render
//! thread
//!
//! The writer replaces an `Arc` snapshot under a write lock that is held only
//! for the pointer swap. The reader keeps the last snapshot it saw, checks a
//! version counter each frame and only then tries the read lock; if the
//! writer happens to hold it, the frame is drawn from the previous snapshot.
//! The render thread therefore never blocks on telemetry, and every frame
//! shows one coherent snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, TryLockError};

use gsi_hud_types::{PlayerUpdate, TelemetrySnapshot};

struct Shared {
    current: RwLock<Arc<TelemetrySnapshot>>,
    version: AtomicU64,
}

/// Single-writer side of the telemetry hand-off
pub struct TelemetryStore {
    shared: Arc<Shared>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                current: RwLock::new(Arc::new(TelemetrySnapshot::default())),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Create a reader for the render thread
    pub fn reader(&self) -> TelemetryReader {
        let (cached, seen_version) = self.load();
        TelemetryReader {
            shared: Arc::clone(&self.shared),
            cached,
            seen_version,
        }
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: TelemetrySnapshot) {
        let next = Arc::new(snapshot);
        let previous = {
            let mut current = self
                .shared
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next)
        };
        self.shared.version.fetch_add(1, Ordering::Release);
        // The old snapshot is freed outside the lock
        drop(previous);
    }

    /// Merge a partial update into the current snapshot and publish the result
    pub fn apply(&self, update: &PlayerUpdate) -> TelemetrySnapshot {
        let next = self.snapshot().merged(update);
        self.publish(next);
        tracing::trace!(?next, "Telemetry updated");
        next
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        *self.load().0
    }

    fn load(&self) -> (Arc<TelemetrySnapshot>, u64) {
        let version = self.shared.version.load(Ordering::Acquire);
        let current = self
            .shared
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        (Arc::clone(&current), version)
    }
}

/// Render-thread side of the telemetry hand-off
#[derive(Clone)]
pub struct TelemetryReader {
    shared: Arc<Shared>,
    cached: Arc<TelemetrySnapshot>,
    seen_version: u64,
}

impl TelemetryReader {
    /// The newest snapshot that could be read without blocking
    pub fn latest(&mut self) -> &TelemetrySnapshot {
        let version = self.shared.version.load(Ordering::Acquire);
        if version != self.seen_version {
            let current = match self.shared.current.try_read() {
                Ok(guard) => Some(Arc::clone(&guard)),
                Err(TryLockError::Poisoned(poisoned)) => Some(Arc::clone(&poisoned.into_inner())),
                Err(TryLockError::WouldBlock) => None,
            };
            if let Some(current) = current {
                self.cached = current;
                self.seen_version = version;
            }
        }
        &self.cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsi_hud_types::WeaponAmmo;

    #[test]
    fn reader_sees_published_snapshot() {
        let store = TelemetryStore::new();
        let mut reader = store.reader();
        assert_eq!(*reader.latest(), TelemetrySnapshot::default());

        store.publish(TelemetrySnapshot {
            health: 87,
            ..Default::default()
        });
        assert_eq!(reader.latest().health, 87);
    }

    #[test]
    fn apply_merges_into_current_snapshot() {
        let store = TelemetryStore::new();
        store.apply(&PlayerUpdate {
            health: Some(100),
            armor: Some(100),
            active_weapon: Some(WeaponAmmo {
                clip: 30,
                reserve: 90,
            }),
            ..Default::default()
        });
        let next = store.apply(&PlayerUpdate {
            health: Some(42),
            ..Default::default()
        });

        assert_eq!(next.health, 42);
        assert_eq!(next.armor, 100);
        assert_eq!((next.ammo_clip, next.ammo_reserve), (30, 90));
        assert_eq!(store.snapshot(), next);
    }

    #[test]
    fn held_write_lock_serves_previous_snapshot() {
        let store = TelemetryStore::new();
        let mut reader = store.reader();
        store.publish(TelemetrySnapshot {
            armor: 50,
            ..Default::default()
        });

        {
            let _writer = store.shared.current.write().unwrap();
            store.shared.version.fetch_add(1, Ordering::Release);
            // Lock is busy: the reader falls back to what it already had
            assert_eq!(reader.latest().armor, 0);
        }

        assert_eq!(reader.latest().armor, 50);
    }

    #[test]
    fn concurrent_writer_never_tears_a_frame() {
        let store = TelemetryStore::new();
        let mut reader = store.reader();

        let writer = std::thread::spawn(move || {
            for i in 0..5_000 {
                // Every field carries the same value, so a mixed snapshot is detectable
                store.publish(TelemetrySnapshot {
                    money: i,
                    health: i,
                    armor: i,
                    has_helmet: i % 2 == 0,
                    round_kills: i,
                    ammo_clip: i,
                    ammo_reserve: i,
                });
            }
        });

        let mut last = 0;
        for _ in 0..10_000 {
            let s = *reader.latest();
            assert!(s.health == s.armor && s.armor == s.ammo_clip && s.ammo_clip == s.money);
            assert!(s.health >= last, "snapshots must not go back in time");
            last = s.health;
        }
        writer.join().unwrap();
    }
}
