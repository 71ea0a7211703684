/// Step counter and fixed step size of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    step: u64,
    timestep: f64,
    number_of_steps: u64,
}

impl Timings {
    pub fn new(timestep: f64, number_of_steps: u64) -> Self {
        Self {
            step: 0,
            timestep,
            number_of_steps,
        }
    }

    /// Number of completed steps.
    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Timestep in fs.
    #[inline]
    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    #[inline]
    pub fn number_of_steps(&self) -> u64 {
        self.number_of_steps
    }

    pub(crate) fn increment(&mut self) {
        self.step += 1;
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.step >= self.number_of_steps
    }

    /// Simulated time in ps.
    pub fn simulation_time(&self) -> f64 {
        self.step as f64 * self.timestep * 1.0e-3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_until_finished() {
        let mut timings = Timings::new(0.5, 2);
        assert!(!timings.is_finished());
        timings.increment();
        timings.increment();
        assert!(timings.is_finished());
        assert_eq!(timings.step(), 2);
        assert!((timings.simulation_time() - 1.0e-3).abs() < 1e-15);
    }
}
