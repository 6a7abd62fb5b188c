//! Script hooks fired at tick and day boundaries.
//!
//! Hook failures never stop the simulation: the engine logs them and moves on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    IntervalTick,
    IntervalDay,
}

pub trait ScriptHooks {
    fn call(&mut self, hook: HookType, is_tick_boundary: bool) -> anyhow::Result<()>;
}

/// No scripting attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl ScriptHooks for NoHooks {
    fn call(&mut self, _hook: HookType, _is_tick_boundary: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Records every call. Handy for tools and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingHooks {
    pub calls: Vec<HookType>,
}

impl RecordingHooks {
    pub fn count(&self, hook: HookType) -> usize {
        self.calls.iter().filter(|h| **h == hook).count()
    }
}

impl ScriptHooks for RecordingHooks {
    fn call(&mut self, hook: HookType, _is_tick_boundary: bool) -> anyhow::Result<()> {
        self.calls.push(hook);
        Ok(())
    }
}

impl<T: ScriptHooks + ?Sized> ScriptHooks for std::sync::Arc<std::sync::Mutex<T>> {
    fn call(&mut self, hook: HookType, is_tick_boundary: bool) -> anyhow::Result<()> {
        let mut inner = self
            .lock()
            .map_err(|_| anyhow::anyhow!("script hook state poisoned"))?;
        inner.call(hook, is_tick_boundary)
    }
}
