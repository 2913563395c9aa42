/// Iteration budget for one session.
pub struct LoopController {
    max_loops: u32,
    iteration: u32,
    failure_count: u32,
}

impl LoopController {
    pub fn new(max_loops: u32) -> Self {
        Self {
            max_loops,
            iteration: 0,
            failure_count: 0,
        }
    }

    /// Claims the next iteration and returns its 1-based number, or `None`
    /// once the budget is spent.
    pub fn next_iteration(&mut self) -> Option<u32> {
        if self.exhausted() {
            return None;
        }
        self.iteration += 1;
        Some(self.iteration)
    }

    pub fn exhausted(&self) -> bool {
        self.iteration >= self.max_loops
    }

    pub fn iterations(&self) -> u32 {
        self.iteration
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    pub fn failures(&self) -> u32 {
        self.failure_count
    }
}
