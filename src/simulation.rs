use rand::Rng;
use std::time::Duration;

pub const DEFAULT_MIN_DURATION: Duration = Duration::from_millis(2_000);
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_millis(5_000);
pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;

pub const SUCCESS_OUTPUT: &str = "Script executed successfully";
pub const FAILURE_MESSAGE: &str = "Simulated error: Script execution failed";

/// Stand-in for a real script run: a random wait and a weighted coin flip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simulation {
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub success_rate: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            success_rate: DEFAULT_SUCCESS_RATE,
        }
    }
}

impl Simulation {
    /// Uniform in `[min_duration, max_duration)`; `min_duration` when the
    /// range is empty.
    pub fn draw_duration(&self) -> Duration {
        if self.max_duration <= self.min_duration {
            return self.min_duration;
        }

        rand::rng().random_range(self.min_duration..self.max_duration)
    }

    pub fn draw_success(&self) -> bool {
        if self.success_rate.is_nan() {
            return false;
        }
        let rate = self.success_rate.clamp(0.0, 1.0);
        rand::rng().random_bool(rate)
    }
}
