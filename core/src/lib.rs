//! parksim-core: deterministic tick engine for a networked park simulation.

pub mod action;
pub mod climate_subsystem;
pub mod clock;
pub mod config;
pub mod date_subsystem;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod hooks;
pub mod map_subsystem;
pub mod misc_subsystem;
pub mod network;
pub mod news_subsystem;
pub mod park_subsystem;
pub mod peep_subsystem;
pub mod pipeline;
pub mod research_subsystem;
pub mod ride_subsystem;
pub mod rng;
pub mod scenario_subsystem;
pub mod snapshot;
pub mod sound_subsystem;
pub mod store;
pub mod subsystem;
pub mod timing;
pub mod types;
pub mod vehicle_subsystem;
pub mod world;
