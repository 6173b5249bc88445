//! Bounded whole-attempt retry state machine.
//!
//! The controller holds no I/O; the pruner reports the outcome of each attempt
//! and asks what to do next. Attempts are never resumed: after a failure the
//! next attempt starts over from a fresh session.

/// Where a pruning run stands. The attempt number is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt `n` is running (or about to run).
    Attempting(u32),
    /// Attempt `n` committed. Final.
    Committed(u32),
    /// Attempt `n` was the last allowed and failed. Final.
    Exhausted(u32),
}

/// What follows a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterFailure {
    /// Run attempt `next` from scratch.
    Retry { next: u32 },
    /// No attempts left; `attempts` were made.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct RetryController {
    max_attempts: u32,
    state: RetryState,
}

impl RetryController {
    /// `retry_count` is the number of additional attempts after the first.
    pub fn new(retry_count: u32) -> Self {
        Self {
            max_attempts: retry_count.saturating_add(1),
            state: RetryState::Attempting(1),
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Current attempt number.
    pub fn attempt(&self) -> u32 {
        match self.state {
            RetryState::Attempting(n) | RetryState::Committed(n) | RetryState::Exhausted(n) => n,
        }
    }

    /// The current attempt committed.
    pub fn on_success(&mut self) -> RetryState {
        if let RetryState::Attempting(n) = self.state {
            self.state = RetryState::Committed(n);
        }
        self.state
    }

    /// The current attempt failed and was rolled back.
    ///
    /// Moves to the next attempt, or to [`RetryState::Exhausted`] once the
    /// attempt counter would pass `retry_count + 1`. A run that already
    /// reached a final state is reported as exhausted and left unchanged.
    pub fn on_failure(&mut self) -> AfterFailure {
        let RetryState::Attempting(n) = self.state else {
            return AfterFailure::Exhausted {
                attempts: self.attempt(),
            };
        };

        match n.checked_add(1).filter(|next| *next <= self.max_attempts) {
            Some(next) => {
                self.state = RetryState::Attempting(next);
                AfterFailure::Retry { next }
            }
            None => {
                self.state = RetryState::Exhausted(n);
                AfterFailure::Exhausted { attempts: n }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_first_attempt() {
        let controller = RetryController::new(2);
        assert_eq!(controller.state(), RetryState::Attempting(1));
        assert_eq!(controller.max_attempts(), 3);
        assert_eq!(controller.attempt(), 1);
    }

    #[test]
    fn test_no_retries_exhausts_after_one_failure() {
        let mut controller = RetryController::new(0);
        assert_eq!(controller.on_failure(), AfterFailure::Exhausted { attempts: 1 });
        assert_eq!(controller.state(), RetryState::Exhausted(1));
    }

    #[test]
    fn test_exhausts_after_retry_count_plus_one_failures() {
        let mut controller = RetryController::new(3);
        let mut attempts = 1;
        while let AfterFailure::Retry { next } = controller.on_failure() {
            attempts += 1;
            assert_eq!(next, attempts);
        }
        assert_eq!(attempts, 4);
        assert_eq!(controller.state(), RetryState::Exhausted(4));
        assert_eq!(controller.attempt(), 4);
    }

    #[test]
    fn test_success_after_failure() {
        let mut controller = RetryController::new(1);
        assert_eq!(controller.on_failure(), AfterFailure::Retry { next: 2 });
        assert_eq!(controller.on_success(), RetryState::Committed(2));
    }

    #[test]
    fn test_final_states_are_sticky() {
        let mut controller = RetryController::new(5);
        controller.on_success();
        assert_eq!(controller.on_failure(), AfterFailure::Exhausted { attempts: 1 });
        assert_eq!(controller.state(), RetryState::Committed(1));

        let mut controller = RetryController::new(0);
        controller.on_failure();
        assert_eq!(controller.on_success(), RetryState::Exhausted(1));
    }

    #[test]
    fn test_max_retry_count_does_not_overflow() {
        let controller = RetryController::new(u32::MAX);
        assert_eq!(controller.max_attempts(), u32::MAX);
    }
}
