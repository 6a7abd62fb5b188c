//! Frame driver: decides how many logical ticks a rendered frame runs.
//!
//! The decision itself is a pure function (`plan_updates`) so it can be
//! tested without an engine. `FrameDriver::run_frame` applies the plan.

use crate::{
    clock::MAX_GAME_SPEED,
    engine::SimEngine,
    error::SimResult,
    event::SimEvent,
    network::NetworkMode,
    timing::{LogicTimings, LOGIC_UPDATE_MEASUREMENTS},
    types::Tick,
};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, trace};

/// Everything the tick-count decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInputs {
    pub mode:                        NetworkMode,
    pub connected_and_authenticated: bool,
    pub server_tick:                 Tick,
    pub local_tick:                  Tick,
    /// Explicit pause or server-enforced pause.
    pub paused:                      bool,
    pub single_step_requested:       bool,
    pub speed:                       u8,
    pub max_catchup:                 u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Paused,
    SingleStep,
    /// Network client following the server.
    CatchUp,
    /// Speed multiplier above 1.
    Speed,
    Normal,
}

impl UpdateMode {
    /// Only plain 1x play gives way to user input mid-batch.
    pub fn allows_early_exit(self) -> bool {
        self == Self::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePlan {
    pub num_updates: u32,
    pub mode:        UpdateMode,
}

pub fn plan_updates(inputs: &FrameInputs) -> UpdatePlan {
    if inputs.paused {
        return if inputs.single_step_requested && inputs.mode == NetworkMode::None {
            UpdatePlan { num_updates: 1, mode: UpdateMode::SingleStep }
        } else {
            UpdatePlan { num_updates: 0, mode: UpdateMode::Paused }
        };
    }
    if inputs.mode == NetworkMode::Client && inputs.connected_and_authenticated {
        let behind = inputs.server_tick.saturating_sub(inputs.local_tick);
        let num_updates = behind.min(u64::from(inputs.max_catchup)) as u32;
        return UpdatePlan { num_updates, mode: UpdateMode::CatchUp };
    }
    let speed = inputs.speed.clamp(1, MAX_GAME_SPEED);
    if speed > 1 {
        UpdatePlan { num_updates: 1 << (speed - 1), mode: UpdateMode::Speed }
    } else {
        UpdatePlan { num_updates: 1, mode: UpdateMode::Normal }
    }
}

/// Early-exit check after tick `index` of a batch.
///
/// Only a multi-tick Normal plan can stop early. `plan_updates` currently
/// gives Normal plans exactly one tick, so in practice the check is dormant;
/// it keeps the rule in one place should Normal batches ever grow.
pub fn leaves_frame_early(plan: &UpdatePlan, index: u32, input: &dyn InputProbe) -> bool {
    plan.mode.allows_early_exit() && index + 1 < plan.num_updates && !input.is_idle()
}

/// Reports whether user input is idle between ticks of one frame.
pub trait InputProbe {
    fn is_idle(&self) -> bool;
}

/// Headless: input is always idle.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleInput;

impl InputProbe for IdleInput {
    fn is_idle(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenMode {
    #[default]
    Playing,
    ScenarioEditor,
    TitleDemo,
    TrackDesigner,
    TrackManager,
}

impl ScreenMode {
    pub fn allows_autosave(self) -> bool {
        matches!(self, Self::Playing | Self::ScenarioEditor)
    }

    /// The screen is the source of truth for the world's editor flag.
    pub fn is_editor(self) -> bool {
        self == Self::ScenarioEditor
    }
}

/// Wall-clock autosave eligibility. Never feeds simulation state.
#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    interval:  Option<Duration>,
    last_save: DateTime<Utc>,
}

impl AutosaveTimer {
    /// Zero minutes disables autosave.
    pub fn new(interval_minutes: u32, now: DateTime<Utc>) -> Self {
        let interval = (interval_minutes > 0).then(|| Duration::minutes(i64::from(interval_minutes)));
        Self { interval, last_save: now }
    }

    /// True once per elapsed interval.
    pub fn check(&mut self, now: DateTime<Utc>) -> bool {
        match self.interval {
            Some(interval) if now - self.last_save >= interval => {
                self.last_save = now;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub plan:         UpdatePlan,
    /// Ticks that actually ran (clients may wait on the server).
    pub executed:     u32,
    pub early_exit:   bool,
    pub autosave_due: bool,
    pub events:       Vec<SimEvent>,
}

pub struct FrameDriver {
    pub screen: ScreenMode,
    input:      Box<dyn InputProbe>,
    autosave:   AutosaveTimer,
    timings:    Option<LogicTimings>,
}

impl FrameDriver {
    pub fn new(autosave_interval_minutes: u32) -> Self {
        Self {
            screen:   ScreenMode::Playing,
            input:    Box::new(IdleInput),
            autosave: AutosaveTimer::new(autosave_interval_minutes, Utc::now()),
            timings:  None,
        }
    }

    pub fn for_engine(engine: &SimEngine) -> Self {
        Self::new(engine.config().autosave_interval_minutes)
    }

    pub fn with_input(mut self, input: impl InputProbe + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn with_screen(mut self, screen: ScreenMode) -> Self {
        self.screen = screen;
        self
    }

    /// Record per-phase timings into a ring of the standard size.
    pub fn with_timings(mut self) -> Self {
        self.timings = Some(LogicTimings::with_capacity(LOGIC_UPDATE_MEASUREMENTS));
        self
    }

    pub fn timings(&self) -> Option<&LogicTimings> {
        self.timings.as_ref()
    }

    /// Pause forced on a headless server nobody has joined.
    fn server_enforced_pause(engine: &SimEngine) -> bool {
        let config = engine.config();
        config.pause_server_if_no_clients
            && config.headless
            && engine.network().mode() == NetworkMode::Server
            && engine.network().num_players() == 1
    }

    pub fn inputs(engine: &SimEngine) -> FrameInputs {
        let network = engine.network();
        FrameInputs {
            mode:                        network.mode(),
            connected_and_authenticated: network.is_connected_and_authenticated(),
            server_tick:                 network.server_tick(),
            local_tick:                  engine.clock.current_tick,
            paused:                      engine.pause.paused || Self::server_enforced_pause(engine),
            single_step_requested:       engine.pause.single_step_requested,
            speed:                       engine.pause.speed(),
            max_catchup:                 engine.config().max_catchup_ticks,
        }
    }

    /// Called once per rendered frame.
    pub fn run_frame(&mut self, engine: &mut SimEngine) -> SimResult<FrameReport> {
        let editor = self.screen.is_editor();
        if engine.world.editor_mode != editor {
            debug!("editor mode {} at tick {}", if editor { "on" } else { "off" }, engine.clock.current_tick);
            engine.world.editor_mode = editor;
        }

        let mut events = engine.poll_network()?;

        let plan = plan_updates(&Self::inputs(engine));
        let mut executed = 0;
        let mut early_exit = false;

        if plan.mode == UpdateMode::SingleStep {
            debug!("single step at tick {}", engine.clock.current_tick);
            engine.pause.toggle();
        }

        if plan.mode == UpdateMode::Paused {
            // Paused frames keep the queue and the network moving.
            engine.send_tick()?;
            engine.invalidate_map_animation();
            events.extend(engine.process_pending_network()?);
            events.extend(engine.drain_actions());
        } else {
            for i in 0..plan.num_updates {
                let outcome = engine.update_logic(self.timings.as_mut())?;
                if outcome.completed() {
                    executed += 1;
                }
                events.extend(outcome.events);
                if leaves_frame_early(&plan, i, self.input.as_ref()) {
                    debug!("input became active; leaving frame after {executed} tick(s)");
                    early_exit = true;
                    break;
                }
            }
        }

        // A PauseToggle drained during the step may have re-paused already.
        if plan.mode == UpdateMode::SingleStep
            && !engine.pause.paused
            && self.screen != ScreenMode::TitleDemo
        {
            engine.pause.toggle();
        }

        engine.flush_network();

        let autosave_due = self.screen.allows_autosave() && self.autosave.check(Utc::now());
        if autosave_due {
            info!("autosave due at tick {}", engine.clock.current_tick);
        }

        engine.pause.single_step_requested = false;

        trace!(
            "frame: {:?} x{} executed={executed} tick={}",
            plan.mode,
            plan.num_updates,
            engine.clock.current_tick
        );
        Ok(FrameReport { plan, executed, early_exit, autosave_due, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> FrameInputs {
        FrameInputs {
            mode: NetworkMode::None,
            connected_and_authenticated: false,
            server_tick: 0,
            local_tick: 100,
            paused: false,
            single_step_requested: false,
            speed: 1,
            max_catchup: 10,
        }
    }

    #[test]
    fn normal_speed_runs_one_tick() {
        assert_eq!(
            plan_updates(&inputs()),
            UpdatePlan { num_updates: 1, mode: UpdateMode::Normal }
        );
    }

    #[test]
    fn speed_levels_double_the_tick_count() {
        for speed in 2..=MAX_GAME_SPEED {
            let plan = plan_updates(&FrameInputs { speed, ..inputs() });
            assert_eq!(plan.num_updates, 1 << (speed - 1), "speed {speed}");
            assert_eq!(plan.mode, UpdateMode::Speed);
        }
    }

    #[test]
    fn client_catch_up_is_clamped() {
        let client = FrameInputs {
            mode: NetworkMode::Client,
            connected_and_authenticated: true,
            local_tick: 50,
            speed: 4,
            ..inputs()
        };
        for (server_tick, expected) in [(50, 0), (57, 7), (60, 10), (65, 10), (40, 0)] {
            let plan = plan_updates(&FrameInputs { server_tick, ..client });
            assert_eq!(plan.num_updates, expected, "server tick {server_tick}");
            assert_eq!(plan.mode, UpdateMode::CatchUp);
        }
    }

    #[test]
    fn disconnected_client_falls_back_to_speed() {
        let plan = plan_updates(&FrameInputs {
            mode: NetworkMode::Client,
            connected_and_authenticated: false,
            server_tick: 90,
            speed: 2,
            ..inputs()
        });
        assert_eq!(plan, UpdatePlan { num_updates: 2, mode: UpdateMode::Speed });
    }

    #[test]
    fn pause_wins_and_single_step_needs_offline() {
        let paused = FrameInputs { paused: true, speed: 3, ..inputs() };
        assert_eq!(plan_updates(&paused).num_updates, 0);

        let step = FrameInputs { single_step_requested: true, ..paused };
        assert_eq!(
            plan_updates(&step),
            UpdatePlan { num_updates: 1, mode: UpdateMode::SingleStep }
        );

        let networked = FrameInputs { mode: NetworkMode::Server, ..step };
        assert_eq!(plan_updates(&networked).mode, UpdateMode::Paused);
    }

    struct Busy;

    impl InputProbe for Busy {
        fn is_idle(&self) -> bool {
            false
        }
    }

    #[test]
    fn early_exit_only_at_normal_speed() {
        assert!(UpdateMode::Normal.allows_early_exit());
        assert!(!UpdateMode::CatchUp.allows_early_exit());
        assert!(!UpdateMode::Speed.allows_early_exit());
    }

    #[test]
    fn early_exit_needs_busy_input_and_remaining_ticks() {
        let batch = UpdatePlan { num_updates: 3, mode: UpdateMode::Normal };
        assert!(leaves_frame_early(&batch, 0, &Busy));
        assert!(!leaves_frame_early(&batch, 2, &Busy), "last tick has nothing left to skip");
        assert!(!leaves_frame_early(&batch, 0, &IdleInput));

        let catch_up = UpdatePlan { num_updates: 3, mode: UpdateMode::CatchUp };
        assert!(!leaves_frame_early(&catch_up, 0, &Busy));

        // Plans produced today never batch at 1x.
        let single = plan_updates(&inputs());
        assert!(!leaves_frame_early(&single, 0, &Busy));
    }

    #[test]
    fn autosave_fires_once_per_interval() {
        let start = Utc::now();
        let mut timer = AutosaveTimer::new(5, start);
        assert!(!timer.check(start + Duration::minutes(4)));
        assert!(timer.check(start + Duration::minutes(5)));
        assert!(!timer.check(start + Duration::minutes(6)));
        assert!(timer.check(start + Duration::minutes(11)));

        let mut disabled = AutosaveTimer::new(0, start);
        assert!(!disabled.check(start + Duration::days(1)));
        assert!(!ScreenMode::TitleDemo.allows_autosave());
        assert!(ScreenMode::ScenarioEditor.allows_autosave());
    }
}
