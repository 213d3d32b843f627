//! Scripted telemetry feed for running the HUD without a game
//!
//! Plays an endless loop of rounds (shooting, reloading, taking damage,
//! dying, respawning) and pushes partial updates into the telemetry store at
//! irregular intervals, the way game-state pushes arrive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use gsi_hud_overlay::TelemetryStore;
use gsi_hud_types::{PlayerUpdate, WeaponAmmo};

const MAGAZINE: i32 = 30;
const SPARE_AMMO: i32 = 90;
const RESPAWN_TICKS: u32 = 3;

/// Deterministic round script
#[derive(Debug)]
pub struct DemoScript {
    tick: u32,
    health: i32,
    armor: i32,
    clip: i32,
    reserve: i32,
    money: i32,
    kills: i32,
    dead_for: Option<u32>,
}

impl Default for DemoScript {
    fn default() -> Self {
        Self {
            tick: 0,
            health: 100,
            armor: 100,
            clip: MAGAZINE,
            reserve: SPARE_AMMO,
            money: 800,
            kills: 0,
            dead_for: None,
        }
    }
}

impl DemoScript {
    /// Next push and how long to wait before sending the one after it
    pub fn next_update(&mut self) -> (PlayerUpdate, Duration) {
        self.tick += 1;
        // 150..360 ms, never in step with the frame pump
        let delay = Duration::from_millis(150 + u64::from(self.tick % 4) * 70);

        if let Some(ticks) = self.dead_for {
            if ticks < RESPAWN_TICKS {
                self.dead_for = Some(ticks + 1);
                return (PlayerUpdate::default(), delay);
            }
            return (self.respawn(), delay);
        }

        let mut update = PlayerUpdate::default();

        let shots = (self.tick % 3 + 1) as i32;
        self.clip = (self.clip - shots).max(0);
        if self.clip == 0 && self.reserve > 0 {
            let loaded = MAGAZINE.min(self.reserve);
            self.reserve -= loaded;
            self.clip = loaded;
        }
        update.active_weapon = Some(WeaponAmmo {
            clip: self.clip,
            reserve: self.reserve,
        });

        if self.tick % 7 == 0 {
            self.kills += 1;
            self.money += 300;
            update.round_kills = Some(self.kills);
            update.money = Some(self.money);
        }

        if self.tick % 5 == 0 {
            self.armor = (self.armor - 12).max(0);
            self.health = (self.health - 27).max(0);
            update.armor = Some(self.armor);
            update.health = Some(self.health);
            if self.armor == 0 {
                update.has_helmet = Some(false);
            }
            if self.health == 0 {
                // Dead players have no active weapon
                update.active_weapon = None;
                self.dead_for = Some(0);
            }
        }

        (update, delay)
    }

    fn respawn(&mut self) -> PlayerUpdate {
        self.dead_for = None;
        self.health = 100;
        self.armor = 100;
        self.clip = MAGAZINE;
        self.reserve = SPARE_AMMO;
        self.kills = 0;
        PlayerUpdate {
            health: Some(self.health),
            armor: Some(self.armor),
            has_helmet: Some(true),
            round_kills: Some(0),
            active_weapon: Some(WeaponAmmo {
                clip: self.clip,
                reserve: self.reserve,
            }),
            ..Default::default()
        }
    }
}

/// Background thread playing a [`DemoScript`] into a store
pub struct DemoFeed {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DemoFeed {
    pub fn spawn(store: TelemetryStore) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("gsi-hud-demo-feed".to_string())
            .spawn(move || {
                let mut script = DemoScript::default();
                while !thread_stop.load(Ordering::Relaxed) {
                    let (update, delay) = script.next_update();
                    store.apply(&update);
                    thread::sleep(delay);
                }
                tracing::debug!("Demo feed stopped");
            })?;

        tracing::info!("Demo telemetry feed started");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DemoFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsi_hud_types::TelemetrySnapshot;

    fn play(ticks: usize) -> Vec<PlayerUpdate> {
        let mut script = DemoScript::default();
        (0..ticks).map(|_| script.next_update().0).collect()
    }

    #[test]
    fn player_dies_then_respawns_with_full_kit() {
        let updates = play(60);
        let death = updates
            .iter()
            .position(|u| u.health == Some(0))
            .expect("script never kills the player");

        assert_eq!(updates[death].active_weapon, None);
        // Nothing is pushed while waiting to respawn
        for update in &updates[death + 1..=death + RESPAWN_TICKS as usize] {
            assert_eq!(*update, PlayerUpdate::default());
        }
        let respawn = &updates[death + RESPAWN_TICKS as usize + 1];
        assert_eq!(respawn.health, Some(100));
        assert_eq!(
            respawn.active_weapon,
            Some(WeaponAmmo {
                clip: MAGAZINE,
                reserve: SPARE_AMMO
            })
        );
    }

    #[test]
    fn ammo_never_goes_negative() {
        let mut snapshot = TelemetrySnapshot::default();
        for update in play(500) {
            snapshot = snapshot.merged(&update);
            assert!(snapshot.ammo_clip >= 0 && snapshot.ammo_reserve >= 0);
            assert!(snapshot.health >= 0 && snapshot.armor >= 0);
        }
    }

    #[test]
    fn delays_vary_between_pushes() {
        let mut script = DemoScript::default();
        let delays: Vec<Duration> = (0..4).map(|_| script.next_update().1).collect();
        assert!(delays.windows(2).all(|w| w[0] != w[1]));
    }
}
