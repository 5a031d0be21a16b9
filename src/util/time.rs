use std::time::Instant;

use jiff::Timestamp;

/// Get the current UTC date and time as a string
pub fn time_now_utc() -> String {
    Timestamp::now().to_string()
}

/// Milliseconds elapsed since `start`, as a float.
pub fn elapsed_ms(start: Instant) -> f64 {
    calc_elapsed_ms(start.elapsed().as_micros())
}

/// Convert a duration in (u) microseconds to milliseconds.
pub fn calc_elapsed_ms(us: u128) -> f64 {
    us as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use crate::util::time::{calc_elapsed_ms, time_now_utc};

    #[test]
    fn calc_elapsed_ms_returns_1ms() {
        assert_eq!(calc_elapsed_ms(1000), 1.0);
    }
    #[test]
    fn calc_elapsed_ms_returns_0ms() {
        assert_eq!(calc_elapsed_ms(0), 0.0);
    }
    #[test]
    fn calc_elapsed_ms_returns_9_877ms() {
        assert_eq!(calc_elapsed_ms(9877), 9.877);
    }
    #[test]
    fn time_now_utc_is_rfc3339() {
        let now = time_now_utc();
        assert!(now.ends_with('Z'));
        assert!(now.parse::<jiff::Timestamp>().is_ok());
    }
}
