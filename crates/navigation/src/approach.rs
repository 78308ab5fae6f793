//! Wall-approach debounce window

/// Samples held for debouncing
const WINDOW: usize = 3;

/// Tick-driven wall-approach acceptance.
///
/// The maneuver drives toward a wall while `update` feeds one front-distance
/// sample per frame. A sample is accepted only once the window is full, its
/// max−min spread is inside the variance bound, and the sample itself lies in
/// the target band. Spikes from sensor noise right after a physical move
/// therefore cannot trigger an early brake.
#[derive(Debug, Clone)]
pub struct WallApproach {
    window: [f32; WINDOW],
    held: usize,
    pos: usize,
    band: (f32, f32),
    spread_limit: f32,
}

impl WallApproach {
    pub fn new(band: (f32, f32), spread_limit: f32) -> Self {
        Self {
            window: [0.0; WINDOW],
            held: 0,
            pos: 0,
            band,
            spread_limit,
        }
    }

    /// Push one sample; true once the wall is reliably inside the band
    pub fn tick(&mut self, front_cm: f32) -> bool {
        self.window[self.pos] = front_cm;
        self.pos = (self.pos + 1) % WINDOW;
        if self.held < WINDOW {
            self.held += 1;
            return false;
        }

        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &v in &self.window {
            min = min.min(v);
            max = max.max(v);
        }
        max - min <= self.spread_limit && front_cm >= self.band.0 && front_cm <= self.band.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_full_window() {
        let mut approach = WallApproach::new((10.0, 40.0), 4.0);
        assert!(!approach.tick(20.0));
        assert!(!approach.tick(20.0));
        assert!(!approach.tick(20.0)); // window just filled on this push
        assert!(approach.tick(20.0));
    }

    #[test]
    fn test_rejects_noisy_window() {
        let mut approach = WallApproach::new((10.0, 40.0), 4.0);
        for _ in 0..3 {
            approach.tick(20.0);
        }
        assert!(!approach.tick(30.0)); // spread 10 > 4
    }

    #[test]
    fn test_rejects_out_of_band() {
        let mut approach = WallApproach::new((10.0, 40.0), 4.0);
        for _ in 0..4 {
            assert!(!approach.tick(80.0)); // stable but too far
        }
    }

    #[test]
    fn test_recovers_after_spike() {
        let mut approach = WallApproach::new((10.0, 40.0), 4.0);
        approach.tick(20.0);
        approach.tick(90.0); // spike
        approach.tick(20.0);
        assert!(!approach.tick(20.0)); // spike still in window
        assert!(approach.tick(20.0)); // spike evicted on this push
    }
}
