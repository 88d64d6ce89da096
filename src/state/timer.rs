use std::time::{Duration, Instant};

/// Run-wide time budget
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
    max_age: Option<Duration>,
}

impl Timer {
    /// Starts a timer; a limit of 0 seconds disables expiry
    pub fn start(time_limit_secs: u64) -> Self {
        let max_age = if time_limit_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(time_limit_secs))
        };
        Self::with_max_age(max_age)
    }

    pub fn with_max_age(max_age: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            max_age,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn expired(&self) -> bool {
        match self.max_age {
            Some(max_age) => self.elapsed() > max_age,
            None => false,
        }
    }
}
