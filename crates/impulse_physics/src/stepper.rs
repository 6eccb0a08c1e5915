//! Fixed-timestep accumulator

/// Smoothing weight of the newest overrun sample
const OVERRUN_SMOOTHING: f32 = 0.1;

/// Warn once the average overrun exceeds this fraction of a step
const OVERRUN_WARN_FRACTION: f32 = 0.25;

/// Converts variable frame times into a whole number of fixed steps.
///
/// At most `max_updates` steps run per frame. Time beyond that cap is
/// discarded rather than carried over, and its rolling average is tracked so
/// sustained overload produces a single warning.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    timestep: f32,
    max_updates: u32,
    accumulator: f32,
    overrun_average: f32,
    overrun_warned: bool,
    paused: bool,
    total_steps: u64,
}

impl FixedStepper {
    pub fn new(timestep: f32, max_updates: u32) -> Self {
        Self {
            timestep,
            max_updates,
            accumulator: 0.0,
            overrun_average: 0.0,
            overrun_warned: false,
            paused: false,
            total_steps: 0,
        }
    }

    /// Add a frame's elapsed time and return how many fixed steps to run
    pub fn advance(&mut self, frame_time: f32) -> u32 {
        if self.paused || !frame_time.is_finite() || frame_time <= 0.0 {
            return 0;
        }

        self.accumulator += frame_time;
        let available = (self.accumulator / self.timestep).floor();
        let steps = if available >= self.max_updates as f32 {
            self.max_updates
        } else {
            available as u32
        };
        self.accumulator -= steps as f32 * self.timestep;

        let mut excess = 0.0;
        if self.accumulator >= self.timestep {
            let whole = (self.accumulator / self.timestep).floor() * self.timestep;
            self.accumulator -= whole;
            excess = whole;
        }
        self.record_overrun(excess);

        self.total_steps += steps as u64;
        steps
    }

    fn record_overrun(&mut self, excess: f32) {
        self.overrun_average =
            self.overrun_average * (1.0 - OVERRUN_SMOOTHING) + excess * OVERRUN_SMOOTHING;

        let limit = self.timestep * OVERRUN_WARN_FRACTION;
        if self.overrun_average > limit {
            if !self.overrun_warned {
                log::warn!(
                    "Physics falling behind: discarding {:.4}s per frame on average (cap {} steps of {:.4}s)",
                    self.overrun_average,
                    self.max_updates,
                    self.timestep
                );
                self.overrun_warned = true;
            }
        } else {
            self.overrun_warned = false;
        }
    }

    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    pub fn set_timestep(&mut self, timestep: f32) {
        self.timestep = timestep;
    }

    pub fn max_updates(&self) -> u32 {
        self.max_updates
    }

    /// Leftover time not yet consumed by a step
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Fraction of a step left over, for render interpolation
    pub fn interpolation_factor(&self) -> f32 {
        self.accumulator / self.timestep
    }

    /// Rolling average of discarded time per frame
    pub fn overrun_average(&self) -> f32 {
        self.overrun_average
    }

    pub fn is_overrunning(&self) -> bool {
        self.overrun_warned
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// While paused no time accumulates
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Drop any accumulated time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.overrun_average = 0.0;
        self.overrun_warned = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_accumulates_partial_steps() {
        let mut stepper = FixedStepper::new(0.01, 4);
        assert_eq!(stepper.advance(0.004), 0);
        assert_eq!(stepper.advance(0.004), 0);
        assert_eq!(stepper.advance(0.004), 1);
        assert_relative_eq!(stepper.accumulator(), 0.002, epsilon = 1e-6);
    }

    #[test]
    fn test_caps_and_discards_excess() {
        let mut stepper = FixedStepper::new(0.01, 4);
        assert_eq!(stepper.advance(0.105), 4);
        assert!(stepper.accumulator() < 0.01);
        assert_relative_eq!(stepper.overrun_average(), 0.006, epsilon = 1e-5);
    }

    #[test]
    fn test_overrun_warning_rearms() {
        let mut stepper = FixedStepper::new(0.01, 1);
        for _ in 0..20 {
            stepper.advance(0.05);
        }
        assert!(stepper.is_overrunning());
        for _ in 0..100 {
            stepper.advance(0.01);
        }
        assert!(!stepper.is_overrunning());
    }

    #[test]
    fn test_paused_accumulates_nothing() {
        let mut stepper = FixedStepper::new(0.01, 4);
        stepper.set_paused(true);
        assert_eq!(stepper.advance(1.0), 0);
        assert_eq!(stepper.accumulator(), 0.0);
        stepper.set_paused(false);
        assert_eq!(stepper.advance(0.015), 1);
    }

    #[test]
    fn test_rejects_bad_frame_times() {
        let mut stepper = FixedStepper::new(0.01, 4);
        assert_eq!(stepper.advance(f32::NAN), 0);
        assert_eq!(stepper.advance(-1.0), 0);
        assert_eq!(stepper.total_steps(), 0);
    }
}
