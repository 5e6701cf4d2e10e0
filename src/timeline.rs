/// Running video length: every added segment contributes its duration plus one pause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    total: f64,
    pause: f64,
}

impl Budget {
    pub fn new(pause: f64) -> Self {
        Self { total: 0.0, pause }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn add(&mut self, duration: f64) {
        self.total += duration + self.pause;
    }

    pub fn fits(&self, duration: f64, target: f64) -> bool {
        self.total + duration + self.pause <= target
    }

    /// Single forward pass over `durations`: each one is added while it fits
    /// under `target`; the first that does not ends the pass. Returns how many
    /// leading durations were accepted.
    pub fn accept_within(&mut self, durations: &[f64], target: f64) -> usize {
        let mut accepted = 0;
        for &duration in durations {
            if !self.fits(duration, target) {
                break;
            }
            self.add(duration);
            accepted += 1;
        }
        accepted
    }

    /// Whole seconds needed to hold the budget.
    pub fn rounded_seconds(&self) -> u64 {
        whole_seconds(self.total)
    }
}

/// Rounds a length up to the whole seconds a render is cut to.
pub fn whole_seconds(seconds: f64) -> u64 {
    seconds.max(0.0).ceil() as u64
}
