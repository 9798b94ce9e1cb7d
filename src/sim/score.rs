/// Score tracker: the coin count for the current life.
///
/// `increment` is the per-coin path (cue + notification); `add_bonus`
/// is the lump-sum path used at the end of a stage (notification only).

use super::event::{Cue, CueKind, GameEvent};

/// Volume of the per-coin cue.
const COIN_CUE_VOLUME: f32 = 0.1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScoreTracker {
    count: u32,
}

impl ScoreTracker {
    pub fn new() -> Self {
        ScoreTracker::default()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Add one coin.
    pub fn increment(&mut self, events: &mut Vec<GameEvent>) {
        self.count = self.count.saturating_add(1);
        events.push(GameEvent::Cue(Cue::with_volume(CueKind::Coin, COIN_CUE_VOLUME)));
        events.push(GameEvent::ScoreChanged(self.count));
    }

    /// Add a lump sum without per-coin side effects.
    pub fn add_bonus(&mut self, amount: u32, events: &mut Vec<GameEvent>) {
        self.count = self.count.saturating_add(amount);
        events.push(GameEvent::ScoreChanged(self.count));
    }

    /// Back to zero for a new session.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
