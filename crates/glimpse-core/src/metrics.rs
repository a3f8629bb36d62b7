//! Numeric semantics of the overview metrics.
//!
//! Storage backends fetch raw counts and sums; these functions turn them into
//! the reported figures so every backend rounds the same way.

/// `round(100 * single_page / total)`, or 0 for an empty range.
pub fn bounce_rate(single_page_sessions: i64, total_sessions: i64) -> i64 {
    if total_sessions <= 0 {
        return 0;
    }
    (100.0 * single_page_sessions as f64 / total_sessions as f64).round() as i64
}

/// Mean of the positive session durations, rounded to whole seconds.
///
/// Callers pass the sum and count of sessions with `duration > 0` only;
/// zero-length sessions are excluded, not averaged in as zero.
pub fn average_duration(positive_duration_sum: i64, positive_sessions: i64) -> i64 {
    if positive_sessions <= 0 {
        return 0;
    }
    (positive_duration_sum as f64 / positive_sessions as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounce_rate_counts_single_page_sessions() {
        let pageviews = [1, 1, 2, 3, 1, 1, 4, 2, 1, 1];
        let single = pageviews.iter().filter(|&&pv| pv == 1).count() as i64;
        assert_eq!(bounce_rate(single, pageviews.len() as i64), 60);
    }

    #[test]
    fn bounce_rate_rounds_to_nearest() {
        assert_eq!(bounce_rate(1, 3), 33);
        assert_eq!(bounce_rate(2, 3), 67);
        assert_eq!(bounce_rate(1, 8), 13);
    }

    #[test]
    fn empty_range_is_zero_not_nan() {
        assert_eq!(bounce_rate(0, 0), 0);
        assert_eq!(average_duration(0, 0), 0);
    }

    #[test]
    fn average_duration_ignores_zero_sessions() {
        // durations [0, 0, 30, 90]: only the two positive ones count.
        assert_eq!(average_duration(120, 2), 60);
        assert_eq!(average_duration(10, 3), 3);
    }
}
