//! Network collaborator seam.
//!
//! The engine never touches sockets. It talks to a `NetworkSession`, which
//! owns role, tick authority and desync detection. Every call is a
//! non-blocking poll or drain; transport failures are absorbed inside the
//! session and surface only as a changed `status()`.

pub mod loopback;

use crate::{
    action::{ActionQueue, GameAction, QueuedAction},
    snapshot::{SnapshotStore, StateSnapshot},
    types::{PlayerId, Tick},
    world::StateChecksum,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    None,
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    None,
    Requested,
    Ok,
    Verified,
    Failed,
}

impl AuthStatus {
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Ok | Self::Verified)
    }
}

/// Engine state a session may touch while draining inbound messages.
pub struct SessionIo<'a> {
    /// Next tick the local engine will execute.
    pub tick:      Tick,
    pub actions:   &'a mut ActionQueue,
    pub snapshots: &'a dyn SnapshotStore,
}

pub trait NetworkSession {
    fn mode(&self) -> NetworkMode;
    fn status(&self) -> NetworkStatus;
    fn auth_status(&self) -> AuthStatus;
    /// Latest tick announced by the authority.
    fn server_tick(&self) -> Tick;
    /// Participants including this one.
    fn num_players(&self) -> u32;

    /// Inbound sync at the start of a tick.
    fn update(&mut self, io: SessionIo<'_>);
    /// Inbound drain outside tick execution (paused frames).
    fn process_pending(&mut self, io: SessionIo<'_>);
    fn flush(&mut self);

    /// Server: announce the tick about to run, with its pre-update checksum.
    fn send_tick(&mut self, checksum: &StateChecksum);
    /// Client: true the first time local state diverges from the server's
    /// announced checksum for the same tick.
    fn check_desynchronisation(&mut self, local: &StateChecksum) -> bool;
    fn request_snapshot(&mut self, tick: Tick);

    /// Authority: broadcast an action it has sequenced.
    fn send_action(&mut self, queued: &QueuedAction);
    /// Client: ask the authority to sequence an action.
    fn request_action(&mut self, player: PlayerId, action: &GameAction);

    /// Server snapshot received in answer to `request_snapshot`.
    fn take_received_snapshot(&mut self) -> Option<StateSnapshot> {
        None
    }

    fn is_connected_and_authenticated(&self) -> bool {
        self.status() == NetworkStatus::Connected && self.auth_status().is_authenticated()
    }
}

/// Mode `None`: every call is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSession;

impl NetworkSession for OfflineSession {
    fn mode(&self) -> NetworkMode {
        NetworkMode::None
    }

    fn status(&self) -> NetworkStatus {
        NetworkStatus::Disconnected
    }

    fn auth_status(&self) -> AuthStatus {
        AuthStatus::None
    }

    fn server_tick(&self) -> Tick {
        0
    }

    fn num_players(&self) -> u32 {
        1
    }

    fn update(&mut self, _io: SessionIo<'_>) {}
    fn process_pending(&mut self, _io: SessionIo<'_>) {}
    fn flush(&mut self) {}
    fn send_tick(&mut self, _checksum: &StateChecksum) {}

    fn check_desynchronisation(&mut self, _local: &StateChecksum) -> bool {
        false
    }

    fn request_snapshot(&mut self, _tick: Tick) {}
    fn send_action(&mut self, _queued: &QueuedAction) {}
    fn request_action(&mut self, _player: PlayerId, _action: &GameAction) {}
}
