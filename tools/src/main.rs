//! sim-runner: headless frame-driven runner for the park simulation.
//!
//! Usage:
//!   sim-runner --seed 12345 --frames 2000 --speed 2
//!   sim-runner --config park.json --network loopback --db run.db --json

use anyhow::{bail, Result};
use parksim_core::{
    config::SimConfig,
    driver::FrameDriver,
    engine::SimEngine,
    event::{EventLogEntry, SimEvent},
    network::loopback,
    snapshot::StateSnapshot,
    store::{SimStore, SqliteSnapshotStore},
    timing::LogicPhase,
    types::{new_run_id, Tick},
};
use serde::Serialize;
use std::env;

#[derive(Serialize)]
struct EngineSummary {
    tick:        Tick,
    year:        u32,
    month:       u32,
    day:         u32,
    guests:      u32,
    cash:        i64,
    park_rating: u16,
    hash:        String,
}

impl EngineSummary {
    fn of(engine: &SimEngine) -> Result<Self> {
        let checksum = engine.state_checksum()?;
        let world = &engine.world;
        Ok(Self {
            tick:        checksum.tick,
            year:        world.date.year(),
            month:       world.date.month(),
            day:         world.date.day(),
            guests:      world.guest_count(),
            cash:        world.park.cash,
            park_rating: world.park.rating,
            hash:        checksum.hash,
        })
    }
}

#[derive(Serialize)]
struct RunSummary {
    run_id:    String,
    network:   String,
    frames:    u64,
    autosaves: u32,
    server:    EngineSummary,
    client:    Option<EngineSummary>,
    in_sync:   Option<bool>,
    desyncs:   usize,
}

struct Persistence {
    store:  SimStore,
    run_id: String,
}

impl Persistence {
    fn events(&self, events: &[SimEvent]) -> Result<()> {
        for event in events {
            self.store.append_event(&EventLogEntry::from_event(&self.run_id, event)?)?;
        }
        Ok(())
    }

    fn autosave(&self, engine: &mut SimEngine) -> Result<()> {
        let snapshot = StateSnapshot::of_world(&engine.world, engine.clock.current_tick)?;
        self.store.save_snapshot(&self.run_id, &snapshot)?;
        engine.clock.mark_saved();
        log::info!("autosaved tick {}", snapshot.tick);
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match string_arg(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.headless = true;
    config.validate()?;
    let frames = parse_arg(&args, "--frames", 1000u64);
    let speed = parse_arg(&args, "--speed", 1u8);
    let network = string_arg(&args, "--network").unwrap_or("none");
    let db = string_arg(&args, "--db");
    let json = args.iter().any(|a| a == "--json");

    let run_id = new_run_id();
    if !json {
        println!("parksim: sim-runner");
        println!("  run_id:   {run_id}");
        println!("  seed:     {:#x}", config.seed);
        println!("  frames:   {frames}");
        println!("  speed:    {speed}");
        println!("  network:  {network}");
        println!("  db:       {}", db.unwrap_or("(none)"));
        println!();
    }

    let persistence = match db {
        Some(path) => {
            let store = SimStore::open(path)?;
            store.migrate()?;
            store.insert_run(&run_id, config.seed, env!("CARGO_PKG_VERSION"))?;
            let persistence = Persistence { store, run_id: run_id.clone() };
            persistence.events(&[SimEvent::RunInitialized { run_id: run_id.clone(), seed: config.seed }])?;
            Some(persistence)
        }
        None => None,
    };

    let summary = match network {
        "none" => run_offline(config, frames, speed, &run_id, persistence.as_ref())?,
        "loopback" => run_loopback(config, frames, speed, &run_id, db, persistence.as_ref())?,
        other => bail!("unknown --network mode '{other}' (expected none or loopback)"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    if summary.in_sync == Some(false) {
        bail!("server and client diverged");
    }
    Ok(())
}

fn run_offline(
    config: SimConfig,
    frames: u64,
    speed: u8,
    run_id: &str,
    persistence: Option<&Persistence>,
) -> Result<RunSummary> {
    let mut engine = SimEngine::build(config);
    engine.pause.set_speed(speed);
    let mut driver = FrameDriver::for_engine(&engine).with_timings();
    let mut autosaves = 0;

    for _ in 0..frames {
        let report = driver.run_frame(&mut engine)?;
        if let Some(p) = persistence {
            p.events(&report.events)?;
            if report.autosave_due {
                p.autosave(&mut engine)?;
                autosaves += 1;
            }
        }
    }

    if let Some(timings) = driver.timings() {
        log::info!(
            "average tick {:?} (pipeline through clock)",
            timings.average(LogicPhase::Scripts)
        );
    }

    Ok(RunSummary {
        run_id: run_id.to_string(),
        network: "none".to_string(),
        frames,
        autosaves,
        server: EngineSummary::of(&engine)?,
        client: None,
        in_sync: None,
        desyncs: 0,
    })
}

fn run_loopback(
    config: SimConfig,
    frames: u64,
    speed: u8,
    run_id: &str,
    db: Option<&str>,
    persistence: Option<&Persistence>,
) -> Result<RunSummary> {
    let (server_session, client_session) = loopback::pair();
    let mut server = SimEngine::build(config.clone()).with_network(server_session);
    if let Some(path) = db {
        let snapshots =
            SqliteSnapshotStore::new(SimStore::open(path)?, run_id, config.snapshot_history);
        server = server.with_snapshot_store(snapshots);
    }
    let mut client = SimEngine::build(config).with_network(client_session);
    server.pause.set_speed(speed);

    let mut server_driver = FrameDriver::for_engine(&server).with_timings();
    let mut client_driver = FrameDriver::new(0);
    let mut autosaves = 0;
    let mut desyncs = 0;

    for _ in 0..frames {
        let server_report = server_driver.run_frame(&mut server)?;
        client_driver.run_frame(&mut client)?;

        let reports = client.take_desync_reports();
        desyncs += reports.len();
        if let Some(p) = persistence {
            p.events(&server_report.events)?;
            for report in &reports {
                p.store.insert_desync_report(&p.run_id, report)?;
            }
            if server_report.autosave_due {
                p.autosave(&mut server)?;
                autosaves += 1;
            }
        }
    }

    // Hold the server and let the client reach the same tick.
    server.pause.pause();
    server_driver.run_frame(&mut server)?;
    for _ in 0..catchup_frame_budget(&server) {
        if client.clock.current_tick >= server.clock.current_tick {
            break;
        }
        client_driver.run_frame(&mut client)?;
    }

    let server_summary = EngineSummary::of(&server)?;
    let client_summary = EngineSummary::of(&client)?;
    let in_sync =
        server_summary.tick == client_summary.tick && server_summary.hash == client_summary.hash;

    Ok(RunSummary {
        run_id: run_id.to_string(),
        network: "loopback".to_string(),
        frames,
        autosaves,
        server: server_summary,
        client: Some(client_summary),
        in_sync: Some(in_sync),
        desyncs,
    })
}

/// Frames a lagging client may need to close the gap after the loop.
fn catchup_frame_budget(server: &SimEngine) -> u64 {
    let per_frame = u64::from(server.config().max_catchup_ticks.max(1));
    server.clock.current_tick / per_frame + 2
}

fn print_summary(summary: &RunSummary) {
    let print_engine = |label: &str, e: &EngineSummary| {
        println!("  {label}:");
        println!("    tick:        {}", e.tick);
        println!("    date:        year {} month {} day {}", e.year, e.month + 1, e.day + 1);
        println!("    guests:      {}", e.guests);
        println!("    cash:        {}", e.cash);
        println!("    park rating: {}", e.park_rating);
        println!("    state hash:  {}", e.hash);
    };

    println!("=== RUN SUMMARY ===");
    println!("  run_id:    {}", summary.run_id);
    println!("  network:   {}", summary.network);
    println!("  frames:    {}", summary.frames);
    println!("  autosaves: {}", summary.autosaves);
    print_engine("server", &summary.server);
    if let Some(client) = &summary.client {
        print_engine("client", client);
    }
    if let Some(in_sync) = summary.in_sync {
        println!("  in sync:   {in_sync}");
        println!("  desyncs:   {}", summary.desyncs);
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
