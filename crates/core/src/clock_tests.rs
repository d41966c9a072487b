// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    assert!(clock.now() > t1);
}

#[test]
fn fake_clock_advances_shared_time() {
    let clock = FakeClock::new();
    let observer = clock.clone();
    let start = observer.now();

    clock.advance(Duration::from_secs(11));

    assert_eq!(observer.elapsed_since(start), Duration::from_secs(11));
}

#[test]
fn elapsed_since_future_instant_is_zero() {
    let clock = FakeClock::new();
    let later = clock.now() + Duration::from_secs(5);
    assert_eq!(clock.elapsed_since(later), Duration::ZERO);
}
