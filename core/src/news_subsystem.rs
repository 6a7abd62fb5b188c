use crate::{
    error::SimResult,
    event::SimEvent,
    rng::{SubsystemRng, SubsystemSlot},
    subsystem::SimSubsystem,
    timing::LogicPhase,
    types::Tick,
    world::World,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Ticks a headline stays as the current item.
pub const NEWS_DISPLAY_TICKS: u16 = 320;
pub const NEWS_PENDING_LIMIT: usize = 10;
pub const NEWS_ARCHIVE_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub tick:        Tick,
    pub headline:    String,
    pub ticks_shown: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsQueue {
    /// Front is the item currently on display.
    pub pending: VecDeque<NewsItem>,
    pub archive: VecDeque<NewsItem>,
}

impl NewsQueue {
    pub fn push(&mut self, tick: Tick, headline: impl Into<String>) {
        self.pending.push_back(NewsItem { tick, headline: headline.into(), ticks_shown: 0 });
        while self.pending.len() > NEWS_PENDING_LIMIT {
            if let Some(oldest) = self.pending.pop_front() {
                self.archive_item(oldest);
            }
        }
    }

    pub fn current(&self) -> Option<&NewsItem> {
        self.pending.front()
    }

    fn archive_item(&mut self, item: NewsItem) {
        self.archive.push_back(item);
        while self.archive.len() > NEWS_ARCHIVE_LIMIT {
            self.archive.pop_front();
        }
    }
}

pub struct NewsSubsystem;

impl SimSubsystem for NewsSubsystem {
    fn name(&self) -> &'static str { "news" }
    fn phase(&self) -> LogicPhase { LogicPhase::News }
    fn slot(&self) -> SubsystemSlot { SubsystemSlot::News }

    fn update(
        &mut self,
        _tick: Tick,
        world: &mut World,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let news = &mut world.news;
        let expired = match news.pending.front_mut() {
            Some(item) => {
                item.ticks_shown += 1;
                item.ticks_shown >= NEWS_DISPLAY_TICKS
            }
            None => false,
        };
        if expired {
            if let Some(item) = news.pending.pop_front() {
                news.archive_item(item);
            }
        }
        Ok(vec![])
    }
}
