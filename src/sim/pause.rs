/// Pause coordinator: process-wide suspend/resume.
///
/// Suspend sets the world's single `paused` flag, which the step function
/// checks before doing anything, then freezes the phase timer, the effects
/// and the entities. Resume undoes the same things in the same order.
/// Both are idempotent, so duplicate focus signals are harmless.
///
/// Audio reacts to `Suspended`/`Resumed` on its own, separately from the
/// music commands the director issues.
///
/// The focus source is registered once per process. `register` reports
/// whether this call was the one that registered it.

use tracing::debug;

use super::event::GameEvent;
use super::world::WorldState;

#[derive(Debug, Default)]
pub struct PauseCoordinator {
    registered: bool,
}

impl PauseCoordinator {
    pub fn new() -> Self {
        PauseCoordinator::default()
    }

    /// Mark the focus listener as installed. Returns true only the first time.
    pub fn register(&mut self) -> bool {
        if self.registered {
            return false;
        }
        self.registered = true;
        debug!("focus listener registered");
        true
    }

    pub fn suspend(&self, world: &mut WorldState) -> Vec<GameEvent> {
        if world.paused {
            return vec![];
        }
        world.paused = true;
        if let Some(timer) = world.stage_phase.timer_mut() {
            timer.pause();
            debug!(remaining_ms = timer.remaining_ms(), progress = timer.overall_progress(), "phase timer frozen");
        }
        world.fx.pause_all();
        debug!(tick = world.tick, "suspended");
        vec![GameEvent::Suspended]
    }

    pub fn resume(&self, world: &mut WorldState) -> Vec<GameEvent> {
        if !world.paused {
            return vec![];
        }
        world.paused = false;
        if let Some(timer) = world.stage_phase.timer_mut() {
            timer.resume();
            debug!(elapsed_ms = timer.elapsed_ms(), "phase timer resumed");
        }
        world.fx.resume_all();
        debug!(tick = world.tick, "resumed");
        vec![GameEvent::Resumed]
    }

    /// Manual pause key.
    pub fn toggle(&self, world: &mut WorldState) -> Vec<GameEvent> {
        if world.paused {
            self.resume(world)
        } else {
            self.suspend(world)
        }
    }
}
