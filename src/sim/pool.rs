/// Fixed-capacity coin pool.
///
/// Slots are allocated once and recycled for every stage layout. The pool
/// is mutated only by stage layout (activate) and by collection
/// (deactivate). Markers beyond capacity are logged and skipped.

use tracing::warn;

use crate::domain::entity::{Coin, COIN_SIZE};
use crate::domain::physics::Rect;

pub const POOL_CAPACITY: usize = 128;

#[derive(Clone, Debug)]
pub struct CoinPool {
    slots: Vec<Coin>,
}

impl CoinPool {
    pub fn new() -> Self {
        CoinPool::with_capacity(POOL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CoinPool { slots: vec![Coin::inactive(); capacity] }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Deactivate every coin, then activate one slot per marker (px positions).
    /// Returns how many markers were skipped for lack of capacity.
    pub fn layout(&mut self, markers: &[(f32, f32)]) -> usize {
        for coin in &mut self.slots {
            *coin = Coin::inactive();
        }

        let capacity = self.capacity();
        for (coin, &(x, y)) in self.slots.iter_mut().zip(markers) {
            *coin = Coin { x, y, active: true, collected: false };
        }

        let skipped = markers.len().saturating_sub(capacity);
        if skipped > 0 {
            warn!(
                markers = markers.len(),
                capacity,
                "coin pool exhausted; skipping {skipped} coin markers"
            );
        }
        skipped
    }

    /// Deactivate every active coin overlapping `rect`. Returns the count.
    pub fn collect_overlapping(&mut self, rect: &Rect) -> u32 {
        let mut collected = 0;
        for coin in self.slots.iter_mut().filter(|c| c.active) {
            let coin_rect = Rect::new(coin.x, coin.y, COIN_SIZE, COIN_SIZE);
            if coin_rect.overlaps(rect) {
                coin.active = false;
                coin.collected = true;
                collected += 1;
            }
        }
        collected
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|c| c.active).count()
    }

    pub fn active(&self) -> impl Iterator<Item = &Coin> {
        self.slots.iter().filter(|c| c.active)
    }
}

impl Default for CoinPool {
    fn default() -> Self {
        CoinPool::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_recycles_slots() {
        let mut pool = CoinPool::with_capacity(4);
        pool.layout(&[(0.0, 0.0), (16.0, 0.0), (32.0, 0.0)]);
        assert_eq!(pool.active_count(), 3);
        pool.layout(&[(100.0, 0.0)]);
        assert_eq!(pool.active_count(), 1);
        assert_eq!(pool.capacity(), 4);
    }

    #[test]
    fn overflow_is_skipped_not_fatal() {
        let mut pool = CoinPool::with_capacity(2);
        let markers: Vec<(f32, f32)> = (0..5).map(|i| (i as f32 * 16.0, 0.0)).collect();
        assert_eq!(pool.layout(&markers), 3);
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn collecting_deactivates_touched_coins_only() {
        let mut pool = CoinPool::new();
        pool.layout(&[(0.0, 0.0), (64.0, 0.0)]);
        let player = Rect::new(8.0, 8.0, 15.0, 15.0);
        assert_eq!(pool.collect_overlapping(&player), 1);
        assert_eq!(pool.collect_overlapping(&player), 0);
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn active_never_exceeds_capacity() {
        let mut pool = CoinPool::new();
        let markers: Vec<(f32, f32)> = (0..300).map(|i| (i as f32, 0.0)).collect();
        pool.layout(&markers);
        assert_eq!(pool.active_count(), POOL_CAPACITY);
    }
}
