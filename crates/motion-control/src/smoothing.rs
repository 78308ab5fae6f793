//! Fixed-window moving average

/// Circular-buffer moving average.
///
/// During warm-up the average divides by the number of samples held; once the
/// window is full the oldest sample is overwritten and the divisor stays at
/// capacity. `add` on an empty window after `clear` returns 0 rather than
/// dividing by zero.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: Vec<f32>,
    pos: usize,
    held: usize,
}

impl MovingAverage {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        Self {
            window: vec![0.0; capacity],
            pos: 0,
            held: 0,
        }
    }

    /// Push a sample and return the current average
    pub fn add(&mut self, sample: f32) -> f32 {
        self.window[self.pos] = sample;
        self.pos = (self.pos + 1) % self.window.len();
        if self.held < self.window.len() {
            self.held += 1;
        }
        self.average()
    }

    /// Current average without pushing; 0 when empty
    pub fn average(&self) -> f32 {
        if self.held == 0 {
            return 0.0;
        }
        self.window[..self.held.min(self.window.len())]
            .iter()
            .sum::<f32>()
            / self.held as f32
    }

    /// Zero all slots and restart warm-up
    pub fn clear(&mut self) {
        self.window.fill(0.0);
        self.pos = 0;
        self.held = 0;
    }

    pub fn is_full(&self) -> bool {
        self.held == self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_warm_up_divides_by_held() {
        let mut avg = MovingAverage::new(4);
        assert_eq!(avg.add(8.0), 8.0);
        assert_eq!(avg.add(4.0), 6.0);
        assert_eq!(avg.add(0.0), 4.0);
    }

    #[test]
    fn test_constant_input_converges_and_stays() {
        let mut avg = MovingAverage::new(5);
        let mut out = 0.0;
        for _ in 0..5 {
            out = avg.add(42.0);
        }
        assert_eq!(out, 42.0);
        for _ in 0..20 {
            assert_eq!(avg.add(42.0), 42.0);
        }
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        let mut avg = MovingAverage::new(2);
        avg.add(10.0);
        avg.add(20.0);
        assert_eq!(avg.add(30.0), 25.0); // 10 evicted
    }

    #[test]
    fn test_clear_restarts_fresh() {
        let mut avg = MovingAverage::new(3);
        avg.add(5.0);
        avg.add(7.0);
        avg.clear();
        assert_eq!(avg.average(), 0.0);
        assert_eq!(avg.add(9.0), 9.0);
    }

    proptest! {
        #[test]
        fn prop_average_within_sample_bounds(samples in proptest::collection::vec(-1e6f32..1e6, 1..64)) {
            let mut avg = MovingAverage::new(8);
            for &s in &samples {
                avg.add(s);
            }
            let lo = samples.iter().cloned().fold(f32::MAX, f32::min);
            let hi = samples.iter().cloned().fold(f32::MIN, f32::max);
            let out = avg.average();
            prop_assert!(out >= lo - 1e-3 && out <= hi + 1e-3);
        }
    }
}
