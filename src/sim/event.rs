/// Events emitted during a simulation step.
/// The presentation layer consumes these for the HUD, sound and logging.

/// Named sound cues.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CueKind {
    Jump,
    Coin,
    Explosion,
    Go,
    Victory,
    GameOver,
}

/// A cue with playback settings.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Cue {
    pub kind: CueKind,
    pub volume: f32,
    pub rate: f32,
}

impl Cue {
    pub fn new(kind: CueKind) -> Self {
        Cue { kind, volume: 1.0, rate: 1.0 }
    }

    pub fn with_volume(kind: CueKind, volume: f32) -> Self {
        Cue { kind, volume, rate: 1.0 }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MusicCommand {
    Play,
    Stop,
    Pause,
    Resume,
}

#[derive(Clone, PartialEq, Debug)]
pub enum GameEvent {
    ScoreChanged(u32),
    SpeedChanged(u32),
    CoinCollected,
    /// Visible countdown value (4, 3, 2, 1); 0 means "go".
    Countdown(u8),
    StageStarted { level: u32, speed: u32 },
    StageCleared { level: u32 },
    BonusShown(u32),
    BonusAwarded(u32),
    PlayerKilled,
    GameOver { score: u32 },
    Cue(Cue),
    Music(MusicCommand),
    Suspended,
    Resumed,
}
