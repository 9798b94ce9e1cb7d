/// HUD model: the values shown over the playfield, kept current from the
/// events the simulation emits rather than read back from the world.

use crate::sim::event::GameEvent;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hud {
    pub score: u32,
    pub speed: u32,
    pub level: u32,
    /// Visible countdown digit while the stage is starting.
    pub countdown: Option<u8>,
    /// Bonus on display between `BonusShown` and `BonusAwarded`.
    pub bonus: Option<u32>,
    pub paused: bool,
}

impl Hud {
    pub fn new() -> Self {
        Hud { level: 1, ..Hud::default() }
    }

    pub fn apply(&mut self, event: &GameEvent) {
        match event {
            GameEvent::ScoreChanged(score) => self.score = *score,
            GameEvent::SpeedChanged(speed) => self.speed = *speed,
            GameEvent::StageStarted { level, speed } => {
                self.level = *level;
                self.speed = *speed;
                self.bonus = None;
            }
            GameEvent::Countdown(0) => self.countdown = None,
            GameEvent::Countdown(n) => self.countdown = Some(*n),
            GameEvent::BonusShown(bonus) => self.bonus = Some(*bonus),
            GameEvent::BonusAwarded(_) => self.bonus = None,
            GameEvent::GameOver { .. } => self.countdown = None,
            GameEvent::Suspended => self.paused = true,
            GameEvent::Resumed => self.paused = false,
            _ => {}
        }
    }

    pub fn apply_all(&mut self, events: &[GameEvent]) {
        for event in events {
            self.apply(event);
        }
    }

    // ── Display strings ──

    pub fn score_label(&self) -> String {
        format!("{} points", self.score)
    }

    pub fn stage_label(&self) -> String {
        format!("stage {}", self.level)
    }

    pub fn speed_label(&self) -> String {
        format!("speed : {}", self.speed)
    }

    pub fn countdown_labels(&self) -> Option<(String, String)> {
        self.countdown.map(|n| {
            (
                format!("stage : {} speed : {}", self.level, self.speed),
                format!("start in {n}"),
            )
        })
    }

    pub fn bonus_label(&self) -> Option<String> {
        self.bonus.map(|b| format!("bonus +{b}"))
    }
}
