//! Day-based time management for the simulation
//!
//! A run covers `num_days` consecutive days starting at `start_day`. Each
//! day is a fixed budget of `day_length` working minutes that agents spend
//! extracting resources and building devices.

use serde::{Deserialize, Serialize};

/// Tracks the current simulated day and the per-day minute budget
///
/// # Example
/// ```
/// use societies_core::DayClock;
///
/// let mut clock = DayClock::new(0, 3, 600);
/// assert_eq!(clock.current_day(), 0);
/// assert!(!clock.is_finished());
///
/// clock.advance_day();
/// clock.advance_day();
/// clock.advance_day();
/// assert_eq!(clock.current_day(), 3);
/// assert!(clock.is_finished());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayClock {
    /// First simulated day
    start_day: usize,
    /// Number of days to simulate
    num_days: usize,
    /// Day currently being simulated
    current_day: usize,
    /// Working minutes in one day
    day_length: f64,
}

impl DayClock {
    /// Create a new clock
    ///
    /// # Arguments
    /// * `start_day` - Day number of the first simulated day
    /// * `num_days` - Number of days in the run
    /// * `day_length` - Working minutes per day
    pub fn new(start_day: usize, num_days: usize, day_length: u32) -> Self {
        assert!(day_length > 0, "day_length must be positive");
        Self {
            start_day,
            num_days,
            current_day: start_day,
            day_length: f64::from(day_length),
        }
    }

    /// Move to the next day
    pub fn advance_day(&mut self) {
        self.current_day += 1;
    }

    /// Day currently being simulated
    pub fn current_day(&self) -> usize {
        self.current_day
    }

    /// Days completed since the start of the run
    pub fn days_elapsed(&self) -> usize {
        self.current_day - self.start_day
    }

    /// Whether every configured day has been simulated
    pub fn is_finished(&self) -> bool {
        self.days_elapsed() >= self.num_days
    }

    /// Working minutes per day
    pub fn day_length(&self) -> f64 {
        self.day_length
    }

    /// Last day of the run (inclusive)
    pub fn last_day(&self) -> usize {
        (self.start_day + self.num_days).saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "day_length must be positive")]
    fn test_zero_day_length_panics() {
        DayClock::new(0, 1, 0);
    }

    #[test]
    fn test_nonzero_start_day() {
        let mut clock = DayClock::new(10, 2, 100);
        assert_eq!(clock.days_elapsed(), 0);
        assert_eq!(clock.last_day(), 11);
        clock.advance_day();
        assert_eq!(clock.current_day(), 11);
        assert!(!clock.is_finished());
    }
}
