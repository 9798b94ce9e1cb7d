/// Input state tracker.
///
/// Tracks which keys are currently held down and since when, enabling:
///   - A held jump with a measurable press duration
///   - Edge-triggered menu actions (only fire on initial press)
///   - Pointer presses (left mouse button) as a second jump source
///   - Terminal focus changes, forwarded to the pause coordinator
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEventKind,
};

use crate::domain::entity::FrameInput;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Keys that jump.
pub const JUMP_KEYS: [KeyCode; 4] = [
    KeyCode::Up,
    KeyCode::Char(' '),
    KeyCode::Char('w'),
    KeyCode::Char('k'),
];

/// A terminal focus change.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FocusChange {
    Gained,
    Lost,
}

/// Press bookkeeping for one key: when the current hold began, and the
/// last time the terminal reported it.
#[derive(Clone, Copy, Debug)]
struct KeyHold {
    since: Instant,
    last_seen: Instant,
}

pub struct InputState {
    holds: HashMap<KeyCode, KeyHold>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Left mouse button held since, if down.
    pointer_since: Option<Instant>,
    pointer_pressed: bool,

    /// Focus changes in arrival order.
    pub focus_changes: Vec<FocusChange>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            holds: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            pointer_since: None,
            pointer_pressed: false,
            focus_changes: Vec::with_capacity(2),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.focus_changes.clear();
        self.pointer_pressed = false;

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(ev) => self.apply(ev, Instant::now()),
                Err(_) => break,
            }
        }

        self.expire(Instant::now());
    }

    /// Record one terminal event observed at `now`.
    fn apply(&mut self, ev: Event, now: Instant) {
        match ev {
            Event::Key(key) => {
                self.raw_events.push(key);
                match key.kind {
                    KeyEventKind::Release if self.honor_release => {
                        self.holds.remove(&key.code);
                    }
                    KeyEventKind::Release => {
                        // Ignore release when enhancement not confirmed;
                        // rely on timeout-based expiry instead
                    }
                    _ => {
                        match self.holds.get_mut(&key.code) {
                            Some(hold) if now.duration_since(hold.last_seen) < HOLD_TIMEOUT => {
                                hold.last_seen = now;
                            }
                            _ => {
                                self.holds.insert(key.code, KeyHold { since: now, last_seen: now });
                                self.fresh_presses.push(key.code);
                            }
                        }
                    }
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    self.pointer_since = Some(now);
                    self.pointer_pressed = true;
                }
                MouseEventKind::Up(MouseButton::Left) => {
                    self.pointer_since = None;
                }
                _ => {}
            },
            Event::FocusGained => self.focus_changes.push(FocusChange::Gained),
            Event::FocusLost => self.focus_changes.push(FocusChange::Lost),
            _ => {}
        }
    }

    /// Expire keys that have timed out (fallback for terminals without Release)
    fn expire(&mut self, now: Instant) {
        if !self.honor_release {
            self.holds.retain(|_, h| now.duration_since(h.last_seen) < HOLD_TIMEOUT);
        }
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Was the pointer pressed this frame?
    pub fn pointer_pressed(&self) -> bool {
        self.pointer_pressed
    }

    /// Earliest start of any current jump hold (keys or pointer).
    pub fn jump_held_since(&self) -> Option<Instant> {
        JUMP_KEYS
            .iter()
            .filter_map(|code| self.holds.get(code).map(|h| h.since))
            .chain(self.pointer_since)
            .min()
    }

    /// Was a jump source freshly pressed this frame?
    pub fn jump_pressed(&self) -> bool {
        self.any_pressed(&JUMP_KEYS) || self.pointer_pressed
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        use crossterm::event::KeyModifiers;
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

/// Merge jump holds from several sources into the player's frame input.
/// The earliest hold wins, so a long keyboard hold is not refreshed by a
/// later gamepad press.
pub fn frame_input(sources: &[Option<Instant>], now: Instant) -> FrameInput {
    match sources.iter().flatten().min() {
        Some(since) => FrameInput {
            jump_held: true,
            jump_held_ms: now.saturating_duration_since(*since).as_millis().min(u32::MAX as u128) as u32,
        },
        None => FrameInput::default(),
    }
}
