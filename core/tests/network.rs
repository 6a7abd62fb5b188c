//! Server and client over the in-process loopback transport.

mod common;

use parksim_core::{
    action::GameAction,
    config::SimConfig,
    driver::FrameDriver,
    engine::SimEngine,
    event::SimEvent,
    network::{
        loopback::{self, CLIENT_PLAYER, SERVER_PLAYER},
        NetworkMode,
    },
    ride_subsystem::RideStatus,
    snapshot::DesyncReport,
    types::TileCoord,
};

struct Session {
    server:        SimEngine,
    client:        SimEngine,
    server_driver: FrameDriver,
    client_driver: FrameDriver,
    client_events: Vec<SimEvent>,
    reports:       Vec<DesyncReport>,
}

impl Session {
    fn start() -> Self {
        common::init_logging();
        let config = SimConfig::default_test();
        let (server_session, client_session) = loopback::pair();
        let server = SimEngine::build(config.clone()).with_network(server_session);
        let client = SimEngine::build(config).with_network(client_session);
        Self {
            server_driver: FrameDriver::for_engine(&server),
            client_driver: FrameDriver::for_engine(&client),
            server,
            client,
            client_events: Vec::new(),
            reports: Vec::new(),
        }
    }

    fn frame(&mut self) {
        self.server_driver.run_frame(&mut self.server).expect("server frame");
        let report = self.client_driver.run_frame(&mut self.client).expect("client frame");
        self.client_events.extend(report.events);
        self.reports.extend(self.client.take_desync_reports());
    }

    /// Hold the server and let the client reach its tick.
    fn settle(&mut self) {
        self.server.pause.pause();
        self.server_driver.run_frame(&mut self.server).expect("paused server frame");
        for _ in 0..4 {
            let report = self.client_driver.run_frame(&mut self.client).expect("client frame");
            self.client_events.extend(report.events);
        }
    }
}

fn server_action(frame: u64) -> Option<GameAction> {
    match frame % 17 {
        3 => Some(GameAction::PlacePath { at: TileCoord::new((frame % 9) as u16, 2), provisional: false }),
        7 => Some(GameAction::SetRidePrice { ride: 0, price: (frame * 10) as i64 }),
        11 => Some(GameAction::Chat { message: format!("server {frame}") }),
        _ => None,
    }
}

fn client_action(frame: u64) -> Option<GameAction> {
    match frame % 13 {
        2 => Some(GameAction::PlacePath { at: TileCoord::new((frame % 9) as u16, 2), provisional: true }),
        5 => Some(GameAction::SetParkEntranceFee { fee: (frame * 5) as i64 }),
        8 => Some(GameAction::SetRideStatus {
            ride: 2,
            status: if frame % 2 == 0 { RideStatus::Closed } else { RideStatus::Open },
        }),
        _ => None,
    }
}

#[test]
fn loopback_pair_starts_connected() {
    let session = Session::start();
    assert_eq!(session.server.network().mode(), NetworkMode::Server);
    assert_eq!(session.client.network().mode(), NetworkMode::Client);
    assert!(session.client.network().is_connected_and_authenticated());
    assert_eq!(session.server.network().num_players(), 2);
}

#[test]
fn client_trails_server_by_one_tick() {
    let mut session = Session::start();
    session.frame();
    assert_eq!(session.server.clock.current_tick, 1);
    assert_eq!(session.client.clock.current_tick, 0, "nothing announced beyond tick 0 yet");
    for _ in 0..9 {
        session.frame();
    }
    assert_eq!(session.server.clock.current_tick, 10);
    assert_eq!(session.client.clock.current_tick, 9);
    assert_eq!(session.client.network().server_tick(), 9);
}

#[test]
fn actions_from_both_sides_keep_worlds_in_sync() {
    const FRAMES: u64 = 200;
    const QUIET: u64 = 5;
    let mut session = Session::start();

    for frame in 0..FRAMES {
        if frame < FRAMES - QUIET {
            if let Some(action) = server_action(frame) {
                session.server.submit_action(SERVER_PLAYER, action);
            }
            if let Some(action) = client_action(frame) {
                session.client.submit_action(CLIENT_PLAYER, action);
            }
        }
        session.frame();
    }
    session.settle();

    assert_eq!(session.client.clock.current_tick, session.server.clock.current_tick);
    assert_eq!(
        session.client.state_checksum().expect("client hash"),
        session.server.state_checksum().expect("server hash"),
        "loopback participants diverged"
    );
    assert!(session.reports.is_empty(), "unexpected desync: {:?}", session.reports);
    assert!(!session
        .client_events
        .iter()
        .any(|e| matches!(e, SimEvent::DesyncDetected { .. })));

    let client_chats = session
        .client_events
        .iter()
        .filter(|e| matches!(e, SimEvent::ChatMessage { player: SERVER_PLAYER, .. }))
        .count();
    assert!(client_chats > 0, "server chat must reach the client through the queue");
    assert!(session.client.actions.is_empty());
}

#[test]
fn diverged_client_reports_the_differing_field() {
    let mut session = Session::start();
    for _ in 0..20 {
        session.frame();
    }
    session.client.world.park.cash += 7;
    for _ in 0..3 {
        session.frame();
    }

    let detected = session
        .client_events
        .iter()
        .filter(|e| matches!(e, SimEvent::DesyncDetected { .. }))
        .count();
    assert_eq!(detected, 1, "desync is reported once per session");

    assert_eq!(session.reports.len(), 1);
    let report = &session.reports[0];
    assert_eq!(report.total, 1);
    assert_eq!(report.differences[0].path, ".park.cash");
    assert_ne!(report.local.hash, report.remote.hash);
    assert_eq!(report.local.seed, report.remote.seed);
    assert!(session
        .client_events
        .iter()
        .any(|e| matches!(e, SimEvent::SnapshotsCompared { differences: 1, .. })));
}
