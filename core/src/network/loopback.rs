//! In-process server/client pair over channels.
//!
//! Both ends start connected and authenticated. Packets queue in an outbox
//! and only leave on `flush`, so ordering matches a real transport that
//! batches per frame.

use super::{AuthStatus, NetworkMode, NetworkSession, NetworkStatus, SessionIo};
use crate::{
    action::{GameAction, QueuedAction},
    snapshot::StateSnapshot,
    types::{PlayerId, Tick},
    world::StateChecksum,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

pub const SERVER_PLAYER: PlayerId = 0;
pub const CLIENT_PLAYER: PlayerId = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "packet", rename_all = "snake_case")]
pub enum Packet {
    Tick { checksum: StateChecksum },
    Action { queued: QueuedAction },
    ActionRequest { player: PlayerId, action: GameAction },
    SnapshotRequest { tick: Tick },
    Snapshot { snapshot: StateSnapshot },
}

struct Link {
    tx:        Sender<Packet>,
    rx:        Receiver<Packet>,
    outbox:    Vec<Packet>,
    connected: bool,
}

impl Link {
    fn drain(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(packet) => packets.push(packet),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.connected {
                        warn!("loopback peer disconnected");
                    }
                    self.connected = false;
                    break;
                }
            }
        }
        packets
    }

    fn flush(&mut self) {
        for packet in self.outbox.drain(..) {
            if self.connected && self.tx.send(packet).is_err() {
                warn!("loopback send failed; peer gone");
                self.connected = false;
            }
        }
    }
}

/// Connected server and client sessions.
pub fn pair() -> (LoopbackServer, LoopbackClient) {
    let (to_client, from_server) = channel();
    let (to_server, from_client) = channel();
    let server = LoopbackServer {
        link: Link { tx: to_client, rx: from_client, outbox: Vec::new(), connected: true },
        last_sent: 0,
    };
    let client = LoopbackClient {
        link: Link { tx: to_server, rx: from_server, outbox: Vec::new(), connected: true },
        server_tick: 0,
        checksums: BTreeMap::new(),
        desynchronized: false,
        received: None,
    };
    (server, client)
}

pub struct LoopbackServer {
    link:      Link,
    last_sent: Tick,
}

impl LoopbackServer {
    pub fn client_connected(&self) -> bool {
        self.link.connected
    }

    fn receive(&mut self, io: SessionIo<'_>) {
        for packet in self.link.drain() {
            match packet {
                Packet::ActionRequest { player, action } => {
                    let queued = io.actions.enqueue(io.tick, player, action);
                    debug!(
                        "server sequenced {} #{} from player {player} for tick {}",
                        queued.action.name(),
                        queued.sequence,
                        queued.tick
                    );
                    self.link.outbox.push(Packet::Action { queued });
                }
                Packet::SnapshotRequest { tick } => match io.snapshots.find(tick) {
                    Ok(Some(snapshot)) => self.link.outbox.push(Packet::Snapshot { snapshot }),
                    Ok(None) => warn!("snapshot for tick {tick} requested but not retained"),
                    Err(e) => warn!("snapshot lookup for tick {tick} failed: {e}"),
                },
                other => warn!("server ignoring unexpected packet {other:?}"),
            }
        }
    }
}

impl NetworkSession for LoopbackServer {
    fn mode(&self) -> NetworkMode {
        NetworkMode::Server
    }

    fn status(&self) -> NetworkStatus {
        NetworkStatus::Connected
    }

    fn auth_status(&self) -> AuthStatus {
        AuthStatus::Ok
    }

    fn server_tick(&self) -> Tick {
        self.last_sent
    }

    fn num_players(&self) -> u32 {
        1 + u32::from(self.link.connected)
    }

    fn update(&mut self, io: SessionIo<'_>) {
        self.receive(io);
    }

    fn process_pending(&mut self, io: SessionIo<'_>) {
        self.receive(io);
    }

    fn flush(&mut self) {
        self.link.flush();
    }

    fn send_tick(&mut self, checksum: &StateChecksum) {
        self.last_sent = checksum.tick;
        self.link.outbox.push(Packet::Tick { checksum: checksum.clone() });
    }

    fn check_desynchronisation(&mut self, _local: &StateChecksum) -> bool {
        false
    }

    fn request_snapshot(&mut self, _tick: Tick) {}

    fn send_action(&mut self, queued: &QueuedAction) {
        self.link.outbox.push(Packet::Action { queued: queued.clone() });
    }

    fn request_action(&mut self, _player: PlayerId, _action: &GameAction) {}
}

pub struct LoopbackClient {
    link:           Link,
    server_tick:    Tick,
    checksums:      BTreeMap<Tick, StateChecksum>,
    desynchronized: bool,
    received:       Option<StateSnapshot>,
}

impl LoopbackClient {
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    fn receive(&mut self, io: SessionIo<'_>) {
        for packet in self.link.drain() {
            match packet {
                Packet::Tick { checksum } => {
                    self.server_tick = self.server_tick.max(checksum.tick);
                    self.checksums.insert(checksum.tick, checksum);
                }
                Packet::Action { queued } => {
                    let (tick, sequence) = (queued.tick, queued.sequence);
                    if tick < io.tick {
                        warn!("action #{sequence} for tick {tick} arrived after that tick ran");
                    }
                    if !io.actions.insert(queued) {
                        warn!("duplicate action #{sequence} for tick {tick}");
                    }
                }
                Packet::Snapshot { snapshot } => self.received = Some(snapshot),
                other => warn!("client ignoring unexpected packet {other:?}"),
            }
        }
        // Ticks already behind us can no longer be checked.
        self.checksums = self.checksums.split_off(&io.tick);
    }
}

impl NetworkSession for LoopbackClient {
    fn mode(&self) -> NetworkMode {
        NetworkMode::Client
    }

    fn status(&self) -> NetworkStatus {
        if self.link.connected {
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
        if self.link.connected { 2 } else { 1 }
    }

    fn update(&mut self, io: SessionIo<'_>) {
        self.receive(io);
    }

    fn process_pending(&mut self, io: SessionIo<'_>) {
        self.receive(io);
    }

    fn flush(&mut self) {
        self.link.flush();
    }

    fn send_tick(&mut self, _checksum: &StateChecksum) {}

    fn check_desynchronisation(&mut self, local: &StateChecksum) -> bool {
        if self.desynchronized {
            return false;
        }
        match self.checksums.get(&local.tick) {
            Some(remote) if remote.seed != local.seed || remote.hash != local.hash => {
                warn!(
                    "desync at tick {}: server seed {:#x} hash {}, local seed {:#x} hash {}",
                    local.tick, remote.seed, remote.hash, local.seed, local.hash
                );
                self.desynchronized = true;
                true
            }
            _ => false,
        }
    }

    fn request_snapshot(&mut self, tick: Tick) {
        self.link.outbox.push(Packet::SnapshotRequest { tick });
    }

    fn send_action(&mut self, _queued: &QueuedAction) {}

    fn request_action(&mut self, player: PlayerId, action: &GameAction) {
        self.link.outbox.push(Packet::ActionRequest { player, action: action.clone() });
    }

    fn take_received_snapshot(&mut self) -> Option<StateSnapshot> {
        self.received.take()
    }
}
