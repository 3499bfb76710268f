//! Tests for DayClock

use societies_core::DayClock;

#[test]
fn test_day_clock_new() {
    let clock = DayClock::new(0, 5, 600);
    assert_eq!(clock.current_day(), 0);
    assert_eq!(clock.days_elapsed(), 0);
    assert_eq!(clock.day_length(), 600.0);
}

#[test]
fn test_advance_day() {
    let mut clock = DayClock::new(0, 5, 600);

    clock.advance_day();
    assert_eq!(clock.current_day(), 1);
    assert_eq!(clock.days_elapsed(), 1);

    clock.advance_day();
    assert_eq!(clock.current_day(), 2);
}

#[test]
fn test_finishes_after_num_days() {
    let mut clock = DayClock::new(3, 2, 600);
    assert!(!clock.is_finished());

    clock.advance_day(); // day 4
    assert!(!clock.is_finished());

    clock.advance_day(); // day 5, past the last day
    assert!(clock.is_finished());
}

#[test]
fn test_zero_days_is_immediately_finished() {
    let clock = DayClock::new(0, 0, 600);
    assert!(clock.is_finished());
}
