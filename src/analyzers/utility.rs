use super::types::WorkDuration;

/// Average whole hours per day: `floor(total_hours / days)`. Returns 0 for
/// no days.
///
/// Truncates on purpose; existing reports were produced this way.
pub fn average_hours_per_day(total: WorkDuration, days: usize) -> i64 {
    if days == 0 {
        return 0;
    }
    total.hours().div_euclid(days as i64)
}
