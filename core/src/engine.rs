//! The simulation engine: one logical tick at a time.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Network inbound sync, then server snapshot + tick announcement
//!      or client catch-up guard + desync check
//!   2-18. World pipeline (date .. sounds), see pipeline.rs
//!   19. Action queue drain
//!   20. Network pending + flush
//!   21. Clock advance, RNG advance
//!   22. Script hooks (tick, then day if the day changed)
//!
//! RULES:
//!   - All simulation state lives in `World`; the engine owns the rest
//!     (clock, pause, queue, collaborators). No globals.
//!   - Only step 21 moves the tick counter. `restore` is the one exception.
//!   - Subsystem errors are fatal and propagate. Network and hook failures
//!     are absorbed and logged.

use crate::{
    action::{ActionQueue, GameAction},
    clock::{LogicalClock, PauseState},
    config::SimConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    hooks::{HookType, NoHooks, ScriptHooks},
    network::{NetworkMode, NetworkSession, NetworkStatus, OfflineSession, SessionIo},
    pipeline::Pipeline,
    snapshot::{compare_snapshots, DesyncReport, MemorySnapshotStore, SnapshotStore, StateSnapshot},
    timing::{LogicPhase, LogicTimings},
    types::{PlayerId, Tick},
    world::{StateChecksum, World},
};
use log::{debug, info, warn};
use std::time::Instant;

/// Result of one `update_logic` call.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// The tick that ran, or None when a client had to wait for the server.
    pub tick:        Option<Tick>,
    pub day_changed: bool,
    pub events:      Vec<SimEvent>,
}

impl TickOutcome {
    pub fn completed(&self) -> bool {
        self.tick.is_some()
    }
}

pub struct SimEngine {
    pub clock:   LogicalClock,
    pub pause:   PauseState,
    pub world:   World,
    pub actions: ActionQueue,
    config:      SimConfig,
    pipeline:    Pipeline,
    network:     Box<dyn NetworkSession>,
    snapshots:   Box<dyn SnapshotStore>,
    hooks:       Box<dyn ScriptHooks>,
    desyncs:     Vec<DesyncReport>,
}

impl SimEngine {
    /// Offline engine around an existing world with the standard pipeline.
    pub fn new(config: SimConfig, world: World) -> Self {
        Self {
            clock:     LogicalClock::new(),
            pause:     PauseState::default(),
            world,
            actions:   ActionQueue::new(),
            snapshots: Box::new(MemorySnapshotStore::new(config.snapshot_history)),
            config,
            pipeline:  Pipeline::standard(),
            network:   Box::new(OfflineSession),
            hooks:     Box::new(NoHooks),
            desyncs:   Vec::new(),
        }
    }

    /// Generate the world from config and wire the standard pipeline.
    pub fn build(config: SimConfig) -> Self {
        let world = World::generate(&config.world, config.seed);
        info!(
            "built world {}x{} seed={:#x}: {} rides, {} peeps",
            world.map.width,
            world.map.height,
            config.seed,
            world.rides.len(),
            world.peeps.len()
        );
        Self::new(config, world)
    }

    pub fn with_network(mut self, network: impl NetworkSession + 'static) -> Self {
        self.network = Box::new(network);
        self
    }

    pub fn with_snapshot_store(mut self, store: impl SnapshotStore + 'static) -> Self {
        self.snapshots = Box::new(store);
        self
    }

    pub fn with_hooks(mut self, hooks: impl ScriptHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn network(&self) -> &dyn NetworkSession {
        self.network.as_ref()
    }

    pub fn snapshots(&self) -> &dyn SnapshotStore {
        self.snapshots.as_ref()
    }

    pub fn desync_reports(&self) -> &[DesyncReport] {
        &self.desyncs
    }

    pub fn take_desync_reports(&mut self) -> Vec<DesyncReport> {
        std::mem::take(&mut self.desyncs)
    }

    /// The observable contract between participants: tick, seed, state hash.
    pub fn state_checksum(&self) -> SimResult<StateChecksum> {
        self.world.checksum(self.clock.current_tick)
    }

    /// Queue a player action. Clients forward it to the authority, which
    /// sequences it and broadcasts it back.
    pub fn submit_action(&mut self, player: PlayerId, action: GameAction) {
        if self.network.mode() == NetworkMode::Client {
            self.network.request_action(player, &action);
            return;
        }
        let queued = self.actions.enqueue(self.clock.current_tick, player, action);
        debug!(
            "tick={} queued {} #{} for player {player}",
            queued.tick,
            queued.action.name(),
            queued.sequence
        );
        self.network.send_action(&queued);
    }

    /// Full re-initialisation from a snapshot, snapshot history included.
    /// The tick counter may go back.
    pub fn restore(&mut self, snapshot: &StateSnapshot) -> SimResult<()> {
        let world = snapshot.world()?;
        if world.rng.seed() != snapshot.seed {
            return Err(SimError::invariant(
                snapshot.tick,
                format!(
                    "snapshot seed {:#x} does not match decoded world seed {:#x}",
                    snapshot.seed,
                    world.rng.seed()
                ),
            ));
        }
        info!("restoring world at tick {} (was {})", snapshot.tick, self.clock.current_tick);
        // History linked past the restored tick would block every new link.
        self.snapshots.clear()?;
        self.world = world;
        self.clock = LogicalClock::starting_at(snapshot.tick);
        Ok(())
    }

    /// Execute one logical tick. Timings, when supplied, receive elapsed
    /// time since the start of the call after every phase.
    pub fn update_logic(&mut self, mut timings: Option<&mut LogicTimings>) -> SimResult<TickOutcome> {
        let started = Instant::now();
        let tick = self.clock.current_tick;
        let mut outcome = TickOutcome::default();

        self.network.update(SessionIo {
            tick,
            actions: &mut self.actions,
            snapshots: self.snapshots.as_ref(),
        });
        record(&mut timings, LogicPhase::NetworkUpdate, started);
        outcome.events.extend(self.compare_received_snapshot()?);

        match self.network.mode() {
            NetworkMode::Server => {
                if self.config.snapshots_enabled {
                    outcome.events.push(self.capture_snapshot(tick)?);
                }
                let checksum = self.world.checksum(tick)?;
                self.network.send_tick(&checksum);
            }
            NetworkMode::Client => {
                // Never run ahead of the authority.
                if self.network.server_tick() <= tick {
                    return Ok(outcome);
                }
                let checksum = self.world.checksum(tick)?;
                if self.network.check_desynchronisation(&checksum) {
                    warn!("tick={tick} local state diverged from server (hash {})", checksum.hash);
                    outcome.events.push(SimEvent::DesyncDetected {
                        tick,
                        local_hash: checksum.hash.clone(),
                    });
                    if self.config.snapshots_enabled
                        && self.network.status() == NetworkStatus::Connected
                    {
                        outcome.events.push(self.capture_snapshot(tick)?);
                        self.network.request_snapshot(tick);
                    }
                }
            }
            NetworkMode::None => {}
        }

        let day_before = self.world.date.day();

        let world_events = self
            .pipeline
            .run(tick, &mut self.world, started, timings.as_deref_mut())
            .inspect_err(|e| log::error!("tick={tick} pipeline failed: {e}"))?;
        outcome.events.extend(world_events);

        outcome
            .events
            .extend(self.actions.process_queue(tick, &mut self.world, &mut self.pause));
        record(&mut timings, LogicPhase::GameActions, started);

        // Requests arriving now are sequenced for the next tick.
        self.network.process_pending(SessionIo {
            tick: tick.wrapping_add(1),
            actions: &mut self.actions,
            snapshots: self.snapshots.as_ref(),
        });
        self.network.flush();
        record(&mut timings, LogicPhase::NetworkFlush, started);

        self.clock.advance();
        self.world.rng.advance();
        record(&mut timings, LogicPhase::Clock, started);

        outcome.events.push(SimEvent::TickCompleted { tick });
        let day = self.world.date.day();
        outcome.day_changed = day != day_before;
        if outcome.day_changed {
            outcome.events.push(SimEvent::DayElapsed { tick, day });
        }
        self.call_hook(tick, HookType::IntervalTick);
        if outcome.day_changed {
            self.call_hook(tick, HookType::IntervalDay);
        }
        record(&mut timings, LogicPhase::Scripts, started);

        if let Some(t) = timings {
            t.rotate_slot();
        }
        outcome.tick = Some(tick);
        Ok(outcome)
    }

    /// Run `n` ticks back to back. Stops early if a client has to wait.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        for _ in 0..n {
            let outcome = self.update_logic(None)?;
            let waiting = !outcome.completed();
            events.extend(outcome.events);
            if waiting {
                break;
            }
        }
        Ok(events)
    }

    // ── Frame driver plumbing ──────────────────────────────────

    /// Frame-start inbound sync.
    pub fn poll_network(&mut self) -> SimResult<Vec<SimEvent>> {
        self.network.update(SessionIo {
            tick: self.clock.current_tick,
            actions: &mut self.actions,
            snapshots: self.snapshots.as_ref(),
        });
        Ok(self.compare_received_snapshot()?.into_iter().collect())
    }

    pub fn process_pending_network(&mut self) -> SimResult<Vec<SimEvent>> {
        self.network.process_pending(SessionIo {
            tick: self.clock.current_tick,
            actions: &mut self.actions,
            snapshots: self.snapshots.as_ref(),
        });
        Ok(self.compare_received_snapshot()?.into_iter().collect())
    }

    /// Drain actions due at the current tick without running one.
    pub fn drain_actions(&mut self) -> Vec<SimEvent> {
        self.actions
            .process_queue(self.clock.current_tick, &mut self.world, &mut self.pause)
    }

    /// Server: re-announce the current tick while paused so clients catch up.
    pub fn send_tick(&mut self) -> SimResult<()> {
        if self.network.mode() == NetworkMode::Server {
            let checksum = self.state_checksum()?;
            self.network.send_tick(&checksum);
        }
        Ok(())
    }

    pub fn flush_network(&mut self) {
        self.network.flush();
    }

    pub fn invalidate_map_animation(&mut self) {
        self.world.invalidate_map_animation();
    }

    // ── Internals ──────────────────────────────────────────────

    fn capture_snapshot(&mut self, tick: Tick) -> SimResult<SimEvent> {
        let seed = self.world.rng.seed();
        let handle = self.snapshots.create_snapshot();
        self.snapshots.capture(handle, &self.world)?;
        self.snapshots.link_snapshot(handle, tick, seed)?;
        Ok(SimEvent::SnapshotCaptured { tick, seed })
    }

    /// Compare a snapshot the server sent back against our own for that tick.
    fn compare_received_snapshot(&mut self) -> SimResult<Option<SimEvent>> {
        let Some(remote) = self.network.take_received_snapshot() else {
            return Ok(None);
        };
        let Some(local) = self.snapshots.find(remote.tick)? else {
            warn!("received server snapshot for tick {} but have no local copy", remote.tick);
            return Ok(None);
        };
        let diff = compare_snapshots(&local, &remote)?;
        warn!(
            "snapshot comparison at tick {}: {} differing field(s)",
            diff.tick, diff.total
        );
        for d in diff.differences.iter().take(8) {
            warn!("  {}: local {} server {}", d.path, d.local, d.remote);
        }
        let event = SimEvent::SnapshotsCompared { tick: diff.tick, differences: diff.total };
        self.desyncs.push(DesyncReport::from_diff(&local, &remote, diff));
        Ok(Some(event))
    }

    fn call_hook(&mut self, tick: Tick, hook: HookType) {
        if let Err(e) = self.hooks.call(hook, true) {
            warn!("tick={tick} script hook {hook:?} failed: {e:#}");
        }
    }
}

fn record(timings: &mut Option<&mut LogicTimings>, phase: LogicPhase, started: Instant) {
    if let Some(t) = timings.as_deref_mut() {
        t.record_phase(phase, started.elapsed());
    }
}
