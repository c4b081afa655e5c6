/// A maximal run `start..=end` of equal values in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsecutiveRange {
    pub start: usize,
    pub end: usize,
}

impl ConsecutiveRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Run-length encode `values` into maximal ranges of equal values.
pub fn consecutive_ranges<T: PartialEq>(values: &[T]) -> Vec<ConsecutiveRange> {
    consecutive_ranges_by(values, |a, b| a == b)
}

/// Like [`consecutive_ranges`], with `same_run(start_value, value)` deciding
/// whether `value` extends the run that began at `start_value`.
///
/// A comparison that is false for a value against itself (a missing reading)
/// puts that value in a range of its own.
pub fn consecutive_ranges_by<T, F>(values: &[T], same_run: F) -> Vec<ConsecutiveRange>
where
    F: Fn(&T, &T) -> bool,
{
    if values.is_empty() {
        return Vec::new();
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..values.len() {
        if !same_run(&values[start], &values[i]) {
            ranges.push(ConsecutiveRange::new(start, i - 1));
            start = i;
        }
    }
    ranges.push(ConsecutiveRange::new(start, values.len() - 1));

    ranges
}
