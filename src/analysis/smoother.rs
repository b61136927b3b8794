use std::collections::VecDeque;

/// Moving-average smoother for a single joint coordinate.
///
/// Keeps the most recent `capacity` raw values and returns their mean, so a
/// window that has not filled yet simply averages what it holds.
#[derive(Debug, Clone)]
pub struct KeypointSmoother {
    window: VecDeque<f64>,
    capacity: usize,
}

impl KeypointSmoother {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a raw value and return the smoothed value
    pub fn push(&mut self, value: f64) -> f64 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(value);

        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

impl Default for KeypointSmoother {
    fn default() -> Self {
        Self::new(6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_input_converges_exactly() {
        let mut smoother = KeypointSmoother::default();
        let mut last = 0.0;
        for _ in 0..10 {
            last = smoother.push(312.5);
        }
        assert_eq!(last, 312.5);
    }

    #[test]
    fn test_partial_window_averages_available_samples() {
        let mut smoother = KeypointSmoother::new(6);
        assert_eq!(smoother.push(10.0), 10.0);
        assert_eq!(smoother.push(20.0), 15.0);
        assert_eq!(smoother.len(), 2);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut smoother = KeypointSmoother::new(3);
        smoother.push(100.0);
        smoother.push(0.0);
        smoother.push(0.0);
        // 100 falls out of the window
        assert_eq!(smoother.push(0.0), 0.0);
        assert_eq!(smoother.len(), 3);
    }

    #[test]
    fn test_step_change_is_damped() {
        let mut smoother = KeypointSmoother::new(6);
        for _ in 0..6 {
            smoother.push(300.0);
        }
        let smoothed = smoother.push(360.0);
        assert!((smoothed - 310.0).abs() < 1e-9);
    }
}
