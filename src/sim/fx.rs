/// Scene effects: one-shot animations, positional tweens, screen fades.
///
/// Effects advance only from the simulation step, through their own
/// timers, so suspending the game freezes them mid-flight. Completion is
/// reported as `FxDone` values tagged with the stage epoch that started
/// the effect; the director drops any completion from an older epoch.

use super::timer::Timer;

/// Frames in the explosion animation.
pub const EXPLOSION_FRAMES: u32 = 6;

#[derive(Clone, Debug)]
pub struct Animation {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub timer: Timer,
    pub epoch: u64,
}

impl Animation {
    /// Current frame index in `0..EXPLOSION_FRAMES`.
    pub fn frame(&self) -> u32 {
        ((self.timer.progress() * EXPLOSION_FRAMES as f32) as u32).min(EXPLOSION_FRAMES - 1)
    }
}

/// Linear tween of the player's x position.
#[derive(Clone, Debug)]
pub struct Tween {
    pub from: f32,
    pub to: f32,
    pub timer: Timer,
    pub epoch: u64,
}

impl Tween {
    pub fn value(&self) -> f32 {
        self.from + (self.to - self.from) * self.timer.progress()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FadeDir {
    In,
    Out,
}

#[derive(Clone, Debug)]
pub struct Fade {
    pub dir: FadeDir,
    pub timer: Timer,
}

/// Completion signals, consumed by the director.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FxDone {
    Animation { id: u32, epoch: u64 },
    Tween { epoch: u64, value: f32 },
    Fade { dir: FadeDir },
}

#[derive(Clone, Debug, Default)]
pub struct Effects {
    pub animations: Vec<Animation>,
    pub tween: Option<Tween>,
    pub fade: Option<Fade>,
    next_id: u32,
    paused: bool,
}

impl Effects {
    pub fn new() -> Self {
        Effects::default()
    }

    /// Start an explosion at (x, y). Returns the animation id.
    pub fn explode(&mut self, x: f32, y: f32, duration_ms: u32, epoch: u64) -> u32 {
        self.next_id += 1;
        let mut timer = Timer::once(duration_ms);
        if self.paused {
            timer.pause();
        }
        self.animations.push(Animation { id: self.next_id, x, y, timer, epoch });
        self.next_id
    }

    /// Start (or replace) the player-position tween.
    pub fn tween(&mut self, from: f32, to: f32, duration_ms: u32, epoch: u64) {
        let mut timer = Timer::once(duration_ms);
        if self.paused {
            timer.pause();
        }
        self.tween = Some(Tween { from, to, timer, epoch });
    }

    /// Start a screen fade. A finished fade-out stays black until replaced.
    pub fn fade(&mut self, dir: FadeDir, duration_ms: u32) {
        let mut timer = Timer::once(duration_ms);
        if self.paused {
            timer.pause();
        }
        self.fade = Some(Fade { dir, timer });
    }

    /// How dark the screen is: 0.0 clear, 1.0 black.
    pub fn fade_level(&self) -> f32 {
        match &self.fade {
            None => 0.0,
            Some(f) => match f.dir {
                FadeDir::Out => f.timer.progress(),
                FadeDir::In => 1.0 - f.timer.progress(),
            },
        }
    }

    /// Current tweened x, if a tween is running.
    pub fn tween_value(&self) -> Option<f32> {
        self.tween.as_ref().map(Tween::value)
    }

    /// Advance every effect and collect completions.
    pub fn tick(&mut self, dt_ms: u32) -> Vec<FxDone> {
        let mut done = vec![];

        for anim in &mut self.animations {
            if anim.timer.tick(dt_ms) > 0 {
                done.push(FxDone::Animation { id: anim.id, epoch: anim.epoch });
            }
        }
        self.animations.retain(|a| !a.timer.is_finished());

        if let Some(tween) = &mut self.tween {
            if tween.timer.tick(dt_ms) > 0 {
                done.push(FxDone::Tween { epoch: tween.epoch, value: tween.to });
                self.tween = None;
            }
        }

        if let Some(fade) = &mut self.fade {
            if fade.timer.tick(dt_ms) > 0 {
                done.push(FxDone::Fade { dir: fade.dir });
                if fade.dir == FadeDir::In {
                    self.fade = None;
                }
            }
        }

        done
    }

    pub fn pause_all(&mut self) {
        self.paused = true;
        for anim in &mut self.animations {
            anim.timer.pause();
        }
        if let Some(t) = &mut self.tween {
            t.timer.pause();
        }
        if let Some(f) = &mut self.fade {
            f.timer.pause();
        }
    }

    pub fn resume_all(&mut self) {
        self.paused = false;
        for anim in &mut self.animations {
            anim.timer.resume();
        }
        if let Some(t) = &mut self.tween {
            t.timer.resume();
        }
        if let Some(f) = &mut self.fade {
            f.timer.resume();
        }
    }

    /// Drop everything (stage teardown, retry).
    pub fn clear(&mut self) {
        self.animations.clear();
        self.tween = None;
        self.fade = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explosion_completes_with_its_epoch() {
        let mut fx = Effects::new();
        let id = fx.explode(10.0, 20.0, 600, 3);
        let mut done = vec![];
        for _ in 0..40 {
            done.extend(fx.tick(16));
        }
        assert_eq!(done, vec![FxDone::Animation { id, epoch: 3 }]);
        assert!(fx.animations.is_empty());
    }

    #[test]
    fn tween_moves_linearly_and_reports_target() {
        let mut fx = Effects::new();
        fx.tween(100.0, 200.0, 1000, 1);
        fx.tick(500);
        assert_eq!(fx.tween_value(), Some(150.0));
        let done = fx.tick(500);
        assert_eq!(done, vec![FxDone::Tween { epoch: 1, value: 200.0 }]);
        assert_eq!(fx.tween_value(), None);
    }

    #[test]
    fn fade_out_stays_black_fade_in_clears() {
        let mut fx = Effects::new();
        fx.fade(FadeDir::Out, 500);
        fx.tick(500);
        assert_eq!(fx.fade_level(), 1.0);
        fx.fade(FadeDir::In, 500);
        fx.tick(250);
        assert_eq!(fx.fade_level(), 0.5);
        let done = fx.tick(250);
        assert_eq!(done, vec![FxDone::Fade { dir: FadeDir::In }]);
        assert_eq!(fx.fade_level(), 0.0);
    }

    #[test]
    fn paused_effects_freeze_and_new_ones_start_paused() {
        let mut fx = Effects::new();
        fx.explode(0.0, 0.0, 100, 0);
        fx.pause_all();
        fx.tween(0.0, 10.0, 100, 0);
        for _ in 0..100 {
            assert!(fx.tick(16).is_empty());
        }
        fx.resume_all();
        let done = fx.tick(100);
        assert_eq!(done.len(), 2);
    }
}
