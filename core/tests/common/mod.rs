//! Shared test collaborators.

#![allow(dead_code)]

use parksim_core::{
    action::{GameAction, QueuedAction},
    config::SimConfig,
    engine::SimEngine,
    network::{AuthStatus, NetworkMode, NetworkSession, NetworkStatus, SessionIo},
    types::{PlayerId, Tick},
    world::StateChecksum,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Calls observed by a `ScriptedSession`.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub updates:         u32,
    pub process_pending: u32,
    pub flushes:         u32,
    pub ticks_sent:      Vec<Tick>,
    pub snapshot_requests: Vec<Tick>,
    pub requested_actions: Vec<(PlayerId, GameAction)>,
}

/// A network session whose role and server tick are set by the test.
pub struct ScriptedSession {
    pub mode:        NetworkMode,
    pub server_tick: Tick,
    pub players:     u32,
    pub connected:   bool,
    pub desync:      bool,
    /// Time spent in each inbound `update`.
    pub update_delay: Duration,
    pub log:         Arc<Mutex<SessionLog>>,
}

impl ScriptedSession {
    pub fn new(mode: NetworkMode) -> (Self, Arc<Mutex<SessionLog>>) {
        let log = Arc::new(Mutex::new(SessionLog::default()));
        let session = Self {
            mode,
            server_tick: 0,
            players: 2,
            connected: true,
            desync: false,
            update_delay: Duration::ZERO,
            log: Arc::clone(&log),
        };
        (session, log)
    }

    pub fn client(server_tick: Tick) -> (Self, Arc<Mutex<SessionLog>>) {
        let (mut session, log) = Self::new(NetworkMode::Client);
        session.server_tick = server_tick;
        (session, log)
    }
}

impl NetworkSession for ScriptedSession {
    fn mode(&self) -> NetworkMode {
        self.mode
    }

    fn status(&self) -> NetworkStatus {
        if self.connected {
            NetworkStatus::Connected
        } else {
            NetworkStatus::Disconnected
        }
    }

    fn auth_status(&self) -> AuthStatus {
        AuthStatus::Ok
    }

    fn server_tick(&self) -> Tick {
        self.server_tick
    }

    fn num_players(&self) -> u32 {
        self.players
    }

    fn update(&mut self, _io: SessionIo<'_>) {
        if !self.update_delay.is_zero() {
            std::thread::sleep(self.update_delay);
        }
        self.log.lock().unwrap().updates += 1;
    }

    fn process_pending(&mut self, _io: SessionIo<'_>) {
        self.log.lock().unwrap().process_pending += 1;
    }

    fn flush(&mut self) {
        self.log.lock().unwrap().flushes += 1;
    }

    fn send_tick(&mut self, checksum: &StateChecksum) {
        self.log.lock().unwrap().ticks_sent.push(checksum.tick);
    }

    fn check_desynchronisation(&mut self, _local: &StateChecksum) -> bool {
        std::mem::take(&mut self.desync)
    }

    fn request_snapshot(&mut self, tick: Tick) {
        self.log.lock().unwrap().snapshot_requests.push(tick);
    }

    fn send_action(&mut self, _queued: &QueuedAction) {}

    fn request_action(&mut self, player: PlayerId, action: &GameAction) {
        self.log.lock().unwrap().requested_actions.push((player, action.clone()));
    }
}

pub fn test_engine() -> SimEngine {
    SimEngine::build(SimConfig::default_test())
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
