use lerp::Lerp;

/// Halfway point of the closed interval `[start, end]`.
#[inline(always)]
pub(crate) fn midpoint(start: f64, end: f64) -> f64 {
    start.lerp(end, 0.5)
}

/// Squared distance from `value` to the closed interval `[start, end]`,
/// zero when the interval contains it.
#[inline]
pub(crate) fn interval_distance_squared(value: f64, start: f64, end: f64) -> f64 {
    let gap = if value < start {
        start - value
    } else if value > end {
        value - end
    } else {
        0.0
    };
    gap * gap
}

/// Evaluates an expression and logs how long it took.
#[allow(unused_macros)]
macro_rules! time_test {
    ($expr:expr, $label:expr) => {{
        let start = std::time::Instant::now();
        let result = $expr;
        log::info!("{}: {:?}", $label, start.elapsed());
        result
    }};
}
#[allow(unused_imports)]
pub(crate) use time_test;

#[test]
fn midpoint_test() {
    assert_eq!(midpoint(0.0, 100.0), 50.0);
    assert_eq!(midpoint(-4.0, 2.0), -1.0);
    assert_eq!(midpoint(3.0, 3.0), 3.0);
}

#[test]
fn interval_distance_test() {
    assert_eq!(interval_distance_squared(5.0, 0.0, 10.0), 0.0);
    assert_eq!(interval_distance_squared(-2.0, 0.0, 10.0), 4.0);
    assert_eq!(interval_distance_squared(13.0, 0.0, 10.0), 9.0);
}
