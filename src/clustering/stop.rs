//! Stopping criteria.
//!
//! A [`StoppingCriterion`] is a predicate over a scalar status, the score of
//! the best available merge. The engine asks it before every merge and halts
//! on the first `true`.

/// Pluggable stopping rule for agglomerative clustering.
pub trait StoppingCriterion {
    /// Should the engine stop, given the current status value?
    fn should_stop(&self, status: f64) -> bool;
}

/// Criterion defined by an arbitrary predicate.
#[derive(Debug, Clone)]
pub struct FuncStop<F> {
    func: F,
}

impl<F: Fn(f64) -> bool> FuncStop<F> {
    /// Wrap a predicate into a criterion.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F: Fn(f64) -> bool> StoppingCriterion for FuncStop<F> {
    fn should_stop(&self, status: f64) -> bool {
        (self.func)(status)
    }
}

/// Stop once the status falls strictly below a threshold.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdStop {
    threshold: f64,
}

impl ThresholdStop {
    /// Create a criterion with the given threshold.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl StoppingCriterion for ThresholdStop {
    fn should_stop(&self, status: f64) -> bool {
        status < self.threshold
    }
}

/// Stop once the status becomes negative. The default criterion for scores
/// where a positive value still argues for merging.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeStop;

impl StoppingCriterion for NegativeStop {
    fn should_stop(&self, status: f64) -> bool {
        status < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_stop() {
        assert!(NegativeStop.should_stop(-0.1));
        assert!(!NegativeStop.should_stop(0.0));
        assert!(!NegativeStop.should_stop(1.0));
    }

    #[test]
    fn test_threshold_stop_is_strict() {
        let stop = ThresholdStop::new(0.5);
        assert!(stop.should_stop(0.49));
        assert!(!stop.should_stop(0.5));
    }

    #[test]
    fn test_func_stop() {
        let stop = FuncStop::new(|s| s.abs() > 2.0);
        assert!(stop.should_stop(-3.0));
        assert!(!stop.should_stop(1.0));
    }
}
