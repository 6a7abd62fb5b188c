//! Game actions and the deterministic action queue.
//!
//! RULE: The action queue is the only way anything outside the pipeline
//! mutates the world. Every participant drains the same entries in the
//! same order: ascending (target tick, sequence). The authority assigns
//! sequence numbers; clients take them verbatim from the server.

use crate::{
    clock::PauseState,
    event::SimEvent,
    map_subsystem::PathElement,
    research_subsystem::ResearchFunding,
    ride_subsystem::RideStatus,
    types::{Money, PlayerId, RideId, Tick, TileCoord},
    world::World,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// All player-issued actions.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GameAction {
    PauseToggle,
    PlacePath { at: TileCoord, provisional: bool },
    RemovePath { at: TileCoord },
    SetRidePrice { ride: RideId, price: Money },
    SetRideStatus { ride: RideId, status: RideStatus },
    SetParkEntranceFee { fee: Money },
    SetResearchFunding { funding: ResearchFunding },
    /// Not a simulation command; carried through the queue so that
    /// every participant sees chat in the same order.
    Chat { message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("tile {0:?} is outside the map")]
    OutOfBounds(TileCoord),
    #[error("tile {0:?} is occupied by a ride")]
    TileOccupied(TileCoord),
    #[error("tile {0:?} already has a path")]
    PathExists(TileCoord),
    #[error("tile {0:?} has no path")]
    NoPath(TileCoord),
    #[error("ride {0} does not exist")]
    UnknownRide(RideId),
    #[error("ride {0} is broken down")]
    RideBroken(RideId),
    #[error("amount {0} is negative")]
    NegativeAmount(Money),
}

impl GameAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PauseToggle             => "pause_toggle",
            Self::PlacePath { .. }        => "place_path",
            Self::RemovePath { .. }       => "remove_path",
            Self::SetRidePrice { .. }     => "set_ride_price",
            Self::SetRideStatus { .. }    => "set_ride_status",
            Self::SetParkEntranceFee { .. } => "set_park_entrance_fee",
            Self::SetResearchFunding { .. } => "set_research_funding",
            Self::Chat { .. }             => "chat",
        }
    }

    /// Validate and apply. A rejected action leaves the world untouched.
    pub fn execute(&self, world: &mut World, pause: &mut PauseState) -> Result<(), ActionError> {
        match self {
            Self::PauseToggle => pause.toggle(),
            Self::PlacePath { at, provisional } => {
                let tile = world.map.tile_mut(*at).ok_or(ActionError::OutOfBounds(*at))?;
                if tile.ride.is_some() {
                    return Err(ActionError::TileOccupied(*at));
                }
                // A committed path may replace its own preview.
                match tile.path {
                    Some(existing) if !existing.provisional || *provisional => {
                        return Err(ActionError::PathExists(*at));
                    }
                    _ => {}
                }
                tile.path = Some(if *provisional {
                    PathElement::provisional()
                } else {
                    PathElement::permanent()
                });
            }
            Self::RemovePath { at } => {
                let tile = world.map.tile_mut(*at).ok_or(ActionError::OutOfBounds(*at))?;
                if tile.path.take().is_none() {
                    return Err(ActionError::NoPath(*at));
                }
            }
            Self::SetRidePrice { ride, price } => {
                if *price < 0 {
                    return Err(ActionError::NegativeAmount(*price));
                }
                let r = world.rides.get_mut(*ride as usize).ok_or(ActionError::UnknownRide(*ride))?;
                r.price = *price;
            }
            Self::SetRideStatus { ride, status } => {
                let r = world.rides.get_mut(*ride as usize).ok_or(ActionError::UnknownRide(*ride))?;
                if r.status == RideStatus::BrokenDown || *status == RideStatus::BrokenDown {
                    return Err(ActionError::RideBroken(*ride));
                }
                r.status = *status;
                if *status == RideStatus::Closed {
                    r.boarding_slots = 0;
                }
            }
            Self::SetParkEntranceFee { fee } => {
                if *fee < 0 {
                    return Err(ActionError::NegativeAmount(*fee));
                }
                world.park.entrance_fee = *fee;
            }
            Self::SetResearchFunding { funding } => world.research.funding = *funding,
            Self::Chat { .. } => {}
        }
        Ok(())
    }
}

/// A queued action with its execution tick and total-order sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedAction {
    pub tick:     Tick,
    pub sequence: u64,
    pub player:   PlayerId,
    pub action:   GameAction,
}

#[derive(Debug, Default)]
pub struct ActionQueue {
    entries:       BTreeMap<(Tick, u64), QueuedAction>,
    next_sequence: u64,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Authority-side enqueue: assigns the next sequence number.
    pub fn enqueue(&mut self, tick: Tick, player: PlayerId, action: GameAction) -> QueuedAction {
        let queued = QueuedAction { tick, sequence: self.next_sequence, player, action };
        self.next_sequence += 1;
        self.entries.insert((tick, queued.sequence), queued.clone());
        queued
    }

    /// Insert an entry already sequenced by the authority.
    /// Returns false if that (tick, sequence) slot is taken.
    pub fn insert(&mut self, queued: QueuedAction) -> bool {
        let key = (queued.tick, queued.sequence);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.next_sequence = self.next_sequence.max(queued.sequence + 1);
        self.entries.insert(key, queued);
        true
    }

    /// Entries due at or before `tick`, in drain order, without removing them.
    pub fn due(&self, tick: Tick) -> impl Iterator<Item = &QueuedAction> {
        self.entries.range(..=(tick, u64::MAX)).map(|(_, q)| q)
    }

    /// Drain and execute every entry due at or before `tick`.
    pub fn process_queue(
        &mut self,
        tick: Tick,
        world: &mut World,
        pause: &mut PauseState,
    ) -> Vec<SimEvent> {
        let later = match tick.checked_add(1) {
            Some(next) => self.entries.split_off(&(next, 0)),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.entries, later);

        let mut events = Vec::with_capacity(due.len());
        for queued in due.into_values() {
            let QueuedAction { sequence, player, action, .. } = queued;
            match action.execute(world, pause) {
                Ok(()) => {
                    if let GameAction::Chat { message } = action {
                        events.push(SimEvent::ChatMessage { tick, player, message });
                    } else {
                        events.push(SimEvent::ActionExecuted {
                            tick,
                            sequence,
                            player,
                            action: action.name().to_string(),
                        });
                    }
                }
                Err(e) => {
                    log::debug!("tick={tick} action {sequence} from player {player} rejected: {e}");
                    events.push(SimEvent::ActionRejected {
                        tick,
                        sequence,
                        player,
                        reason: e.to_string(),
                    });
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    fn world() -> World {
        World::generate(&WorldConfig::default(), 3)
    }

    #[test]
    fn drains_in_tick_then_sequence_order() {
        let mut queue = ActionQueue::new();
        queue.insert(QueuedAction { tick: 5, sequence: 9, player: 1, action: GameAction::Chat { message: "c".into() } });
        queue.insert(QueuedAction { tick: 4, sequence: 10, player: 2, action: GameAction::Chat { message: "a".into() } });
        queue.insert(QueuedAction { tick: 5, sequence: 3, player: 3, action: GameAction::Chat { message: "b".into() } });
        queue.insert(QueuedAction { tick: 6, sequence: 1, player: 4, action: GameAction::Chat { message: "later".into() } });

        let mut w = world();
        let mut pause = PauseState::default();
        let events = queue.process_queue(5, &mut w, &mut pause);
        let messages: Vec<_> = events
            .iter()
            .map(|e| match e {
                SimEvent::ChatMessage { message, .. } => message.as_str(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(messages, ["a", "b", "c"]);
        assert_eq!(queue.len(), 1, "tick 6 entry must stay queued");
    }

    #[test]
    fn insert_rejects_duplicate_slot_and_bumps_sequence() {
        let mut queue = ActionQueue::new();
        let entry = QueuedAction { tick: 1, sequence: 41, player: 0, action: GameAction::PauseToggle };
        assert!(queue.insert(entry.clone()));
        assert!(!queue.insert(entry));
        assert_eq!(queue.enqueue(1, 0, GameAction::PauseToggle).sequence, 42);
    }

    #[test]
    fn rejected_action_leaves_world_untouched() {
        let mut w = world();
        let before = w.state_hash().unwrap();
        let mut pause = PauseState::default();
        let err = GameAction::SetRidePrice { ride: 99, price: 10 }
            .execute(&mut w, &mut pause)
            .unwrap_err();
        assert_eq!(err, ActionError::UnknownRide(99));
        assert_eq!(w.state_hash().unwrap(), before);
    }

    #[test]
    fn committed_path_replaces_preview() {
        let mut w = world();
        let mut pause = PauseState::default();
        let at = TileCoord::new(3, 2);
        GameAction::PlacePath { at, provisional: true }.execute(&mut w, &mut pause).unwrap();
        assert!(!w.map.is_walkable(at));
        GameAction::PlacePath { at, provisional: false }.execute(&mut w, &mut pause).unwrap();
        assert!(w.map.is_walkable(at));
        assert_eq!(
            GameAction::PlacePath { at, provisional: true }.execute(&mut w, &mut pause),
            Err(ActionError::PathExists(at))
        );
    }
}
