/// Simulation timers: fire-after-delay, optionally repeating.
///
/// Timers track elapsed time explicitly and only advance when `tick` is
/// called by the simulation step, so a suspended game never lets them run.
/// A paused timer ignores ticks entirely and keeps its remaining time.

#[derive(Clone, Debug, PartialEq)]
pub struct Timer {
    delay_ms: u32,
    /// Total number of fires (1 for a one-shot).
    total: u32,
    fired: u32,
    /// Time accumulated toward the next fire.
    elapsed_ms: u32,
    paused: bool,
}

impl Timer {
    /// Fire once after `delay_ms`.
    pub fn once(delay_ms: u32) -> Self {
        Timer::repeating(delay_ms, 0)
    }

    /// Fire after `delay_ms`, then `repeat` more times with the same period.
    pub fn repeating(delay_ms: u32, repeat: u32) -> Self {
        Timer {
            delay_ms: delay_ms.max(1),
            total: repeat + 1,
            fired: 0,
            elapsed_ms: 0,
            paused: false,
        }
    }

    /// Advance by `dt_ms`. Returns how many periods fired during this call.
    /// Leftover time carries into the next period.
    pub fn tick(&mut self, dt_ms: u32) -> u32 {
        if self.paused || self.is_finished() {
            return 0;
        }
        self.elapsed_ms += dt_ms;
        let mut fires = 0;
        while self.elapsed_ms >= self.delay_ms && !self.is_finished() {
            self.elapsed_ms -= self.delay_ms;
            self.fired += 1;
            fires += 1;
        }
        if self.is_finished() {
            self.elapsed_ms = 0;
        }
        fires
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.fired >= self.total
    }

    /// Time until the next fire (0 once finished).
    pub fn remaining_ms(&self) -> u32 {
        if self.is_finished() {
            0
        } else {
            self.delay_ms - self.elapsed_ms
        }
    }

    /// Time accumulated in the current period.
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    /// Fires still pending after the most recent one.
    pub fn repeat_count(&self) -> u32 {
        self.total - self.fired.min(self.total)
    }

    /// Progress of the current period in [0, 1].
    pub fn progress(&self) -> f32 {
        if self.is_finished() {
            1.0
        } else {
            self.elapsed_ms as f32 / self.delay_ms as f32
        }
    }

    /// Progress across every period in [0, 1].
    pub fn overall_progress(&self) -> f32 {
        let done = self.fired.min(self.total) as u64 * self.delay_ms as u64 + self.elapsed_ms as u64;
        let all = self.total as u64 * self.delay_ms as u64;
        (done as f64 / all as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fires_once_with_carry() {
        let mut t = Timer::once(100);
        assert_eq!(t.tick(60), 0);
        assert_eq!(t.remaining_ms(), 40);
        assert_eq!(t.tick(60), 1);
        assert!(t.is_finished());
        assert_eq!(t.tick(500), 0);
        assert_eq!(t.overall_progress(), 1.0);
    }

    #[test]
    fn repeating_counts_down_like_a_countdown() {
        let mut t = Timer::repeating(1000, 3);
        let mut seen = vec![];
        for _ in 0..300 {
            if t.tick(16) > 0 {
                seen.push(t.repeat_count());
            }
        }
        assert_eq!(seen, vec![3, 2, 1, 0]);
        assert!(t.is_finished());
    }

    #[test]
    fn large_step_fires_several_periods() {
        let mut t = Timer::repeating(10, 4);
        assert_eq!(t.tick(35), 3);
        assert_eq!(t.elapsed_ms(), 5);
        assert_eq!(t.tick(100), 2);
        assert!(t.is_finished());
    }

    #[test]
    fn paused_timer_keeps_remaining_time() {
        let mut t = Timer::once(1000);
        t.tick(400);
        t.pause();
        for _ in 0..10_000 {
            assert_eq!(t.tick(16), 0);
        }
        assert_eq!(t.remaining_ms(), 600);
        t.resume();
        assert_eq!(t.tick(599), 0);
        assert_eq!(t.tick(1), 1);
    }

    #[test]
    fn pause_does_not_change_fire_tick() {
        // Same number of unpaused ticks must fire on the same tick,
        // however long a pause lasts in between.
        let fire_tick = |pause_at: Option<u32>| {
            let mut t = Timer::repeating(1000, 3);
            let mut live_ticks = 0;
            let mut step = 0;
            loop {
                step += 1;
                if pause_at == Some(step) {
                    t.pause();
                }
                if pause_at.map_or(false, |p| step == p + 500) {
                    t.resume();
                }
                if !t.is_paused() {
                    live_ticks += 1;
                }
                t.tick(16);
                if t.is_finished() {
                    return live_ticks;
                }
            }
        };
        assert_eq!(fire_tick(None), fire_tick(Some(37)));
    }

    #[test]
    fn overall_progress_spans_all_periods() {
        let mut t = Timer::repeating(100, 1);
        t.tick(50);
        assert!((t.overall_progress() - 0.25).abs() < 1e-6);
        t.tick(100);
        assert!((t.overall_progress() - 0.75).abs() < 1e-6);
    }
}
