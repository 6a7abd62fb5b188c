use crate::{
    research_subsystem::ResearchFunding,
    scenario_subsystem::ScenarioObjective,
    types::Money,
};
use serde::{Deserialize, Serialize};

/// Starting park layout and economy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub map_width:        u16,
    pub map_height:       u16,
    pub initial_guests:   u32,
    pub handymen:         u32,
    /// Capped by the number of ride plots on the generated map (6).
    pub rides:            u16,
    pub ride_price:       Money,
    pub starting_cash:    Money,
    pub entrance_fee:     Money,
    pub max_guests:       u32,
    pub research_funding: ResearchFunding,
    pub objective:        ScenarioObjective,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map_width:        32,
            map_height:       24,
            initial_guests:   20,
            handymen:         2,
            rides:            4,
            ride_price:       200,
            starting_cash:    1_000_000,
            entrance_fee:     1_000,
            max_guests:       500,
            research_funding: ResearchFunding::Normal,
            objective: ScenarioObjective {
                guests:          300,
                min_park_rating: 600,
                deadline_year:   3,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    /// Capture a state snapshot each server tick and on client desync.
    pub snapshots_enabled: bool,
    /// Snapshots kept before the oldest is evicted.
    pub snapshot_history: usize,
    /// Upper bound on client catch-up ticks per frame.
    pub max_catchup_ticks: u32,
    pub pause_server_if_no_clients: bool,
    /// Running without a window (dedicated server, CI).
    pub headless: bool,
    /// 0 disables autosave.
    pub autosave_interval_minutes: u32,
    pub world: WorldConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_0F_9A2C,
            snapshots_enabled: false,
            snapshot_history: 32,
            max_catchup_ticks: 10,
            pause_server_if_no_clients: false,
            headless: false,
            autosave_interval_minutes: 5,
            world: WorldConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Small, fast world for tests: snapshots on, autosave off.
    pub fn default_test() -> Self {
        Self {
            seed: 42,
            snapshots_enabled: true,
            snapshot_history: 8,
            autosave_interval_minutes: 0,
            headless: true,
            world: WorldConfig {
                initial_guests: 8,
                rides: 3,
                ..WorldConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.snapshot_history == 0 {
            anyhow::bail!("snapshot_history must be at least 1");
        }
        if self.max_catchup_ticks == 0 {
            anyhow::bail!("max_catchup_ticks must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "seed": 7, "world": { "rides": 2 } }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.world.rides, 2);
        assert_eq!(config.world.map_width, WorldConfig::default().map_width);
        assert_eq!(config.max_catchup_ticks, 10);
        assert_eq!(config.snapshot_history, 32);
    }

    #[test]
    fn zero_history_is_rejected() {
        let config = SimConfig { snapshot_history: 0, ..SimConfig::default() };
        assert!(config.validate().is_err());
    }
}
