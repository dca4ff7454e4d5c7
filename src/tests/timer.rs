use crate::mocks::TestClock;
use crate::timer::Timer;
use embedded_time::duration::Microseconds;
use embedded_time::Clock;

fn now(clock: &TestClock) -> embedded_time::Instant<TestClock> {
    clock.try_now().unwrap()
}

#[test]
fn test_stopped_timer_never_times_out() {
    let clock = TestClock::new();
    let timer = Timer::<TestClock>::new(Microseconds::new(1_000));

    assert!(timer.is_stopped());
    assert!(!timer.is_timed_out(now(&clock)));

    clock.advance_ms(100);
    assert!(!timer.is_timed_out(now(&clock)));
}

#[test]
fn test_timer_expires_after_deadline() {
    let clock = TestClock::new();
    let mut timer = Timer::<TestClock>::new(Microseconds::new(1_000));

    timer.start(now(&clock));
    assert!(!timer.is_stopped());
    assert!(!timer.is_timed_out(now(&clock)));

    clock.advance_us(1_000);
    assert!(!timer.is_timed_out(now(&clock)));

    clock.advance_us(1);
    assert!(timer.is_timed_out(now(&clock)));
}

#[test]
fn test_stop_disarms_timer() {
    let clock = TestClock::new();
    let mut timer = Timer::<TestClock>::new(Microseconds::new(1_000));

    timer.start(now(&clock));
    clock.advance_ms(10);
    assert!(timer.is_timed_out(now(&clock)));

    timer.stop();
    assert!(timer.is_stopped());
    assert!(!timer.is_timed_out(now(&clock)));
}

#[test]
fn test_zero_timeout_expires_immediately() {
    let clock = TestClock::new();
    let mut timer = Timer::<TestClock>::new(Microseconds::new(0));

    assert!(!timer.is_timed_out(now(&clock)));

    timer.start(now(&clock));
    assert!(timer.is_timed_out(now(&clock)));
}

#[test]
fn test_restart_moves_deadline() {
    let clock = TestClock::new();
    let mut timer = Timer::<TestClock>::new(Microseconds::new(1_000));

    timer.start(now(&clock));
    clock.advance_us(900);
    timer.start(now(&clock));
    clock.advance_us(900);
    assert!(!timer.is_timed_out(now(&clock)));

    clock.advance_us(101);
    assert!(timer.is_timed_out(now(&clock)));
}

#[test]
fn test_set_timeout_applies_on_next_start() {
    let clock = TestClock::new();
    let mut timer = Timer::<TestClock>::new(Microseconds::new(1_000));

    timer.set_timeout(Microseconds::new(5_000));
    timer.start(now(&clock));

    clock.advance_us(4_000);
    assert!(!timer.is_timed_out(now(&clock)));

    clock.advance_us(1_001);
    assert!(timer.is_timed_out(now(&clock)));
}
