//! Visual line navigation
//!
//! Moves the caret up or down by one *rendered* row. With soft wrapping a
//! logical line can span several rows, so the target is found geometrically:
//! the caret oracle maps offsets to pixel positions and the navigator searches
//! that mapping. Row boundaries are monotonic in offset but their number is
//! unknown, hence an exponential probe followed by binary searches.

use crate::region::Offset;

/// Tolerance for sub-pixel measurement noise
pub const EPSILON: f32 = 0.5;

/// Initial probe window before the step starts doubling
const PROBE_WINDOW: usize = 16;

/// Vertical direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Caret position in the editor's local pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CaretMeasure {
    pub top: f32,
    pub left: f32,
}

impl CaretMeasure {
    pub fn new(top: f32, left: f32) -> Self {
        Self { top, left }
    }
}

/// Maps text offsets to caret geometry.
///
/// Implementations must be pure and repeatable for a fixed viewport state:
/// the navigator measures the same offset several times during one call.
pub trait CaretOracle {
    /// Caret geometry at `offset`
    fn measure(&self, offset: Offset) -> CaretMeasure;

    /// Height of one rendered row, shared by every measurement in a pass
    fn line_height(&self) -> f32;
}

/// Navigate from `current` using an oracle
pub fn navigate<O: CaretOracle + ?Sized>(
    oracle: &O,
    current: Offset,
    text_len: usize,
    direction: Direction,
) -> Offset {
    let current_measure = oracle.measure(current);
    find_target(current, text_len, direction, current_measure, |offset| {
        oracle.measure(offset)
    })
}

/// Find the offset on the adjacent visual row closest to the caret's
/// horizontal position.
///
/// Returns 0 for an empty document, and clamps to the document start/end
/// when there is no row in the requested direction.
pub fn find_target<F>(
    current: Offset,
    text_len: usize,
    direction: Direction,
    current_measure: CaretMeasure,
    measure: F,
) -> Offset
where
    F: Fn(Offset) -> CaretMeasure,
{
    if text_len == 0 {
        return 0;
    }

    let current = current.min(text_len);
    let current_top = current_measure.top;
    let probe = match direction {
        Direction::Down => {
            first_with_top_greater(current, text_len, current_top + EPSILON, &measure)
        }
        Direction::Up => last_with_top_less(current, current_top - EPSILON, &measure),
    };

    let Some(probe) = probe else {
        return match direction {
            Direction::Down => text_len,
            Direction::Up => 0,
        };
    };

    let row_top = measure(probe).top;
    let row_start = row_start(probe, row_top, &measure);
    let row_end = row_end(probe, text_len, row_top, &measure);
    closest_left_in_row(row_start, row_end, current_measure.left, &measure)
}

/// First offset after `start` whose top is strictly greater than `threshold`
fn first_with_top_greater<F>(
    start: Offset,
    max: Offset,
    threshold: f32,
    measure: &F,
) -> Option<Offset>
where
    F: Fn(Offset) -> CaretMeasure,
{
    if start >= max {
        return None;
    }

    let mut low = start + 1;
    let mut high = max.min(low + PROBE_WINDOW);

    // Bracket: grow the window until it crosses into the next row
    while high < max && measure(high).top <= threshold {
        low = high + 1;
        high = max.min(high + (high - start) * 2);
    }

    if measure(high).top <= threshold {
        return None;
    }

    let (mut left, mut right) = (low, high);
    while left < right {
        let mid = left + (right - left) / 2;
        if measure(mid).top > threshold {
            right = mid;
        } else {
            left = mid + 1;
        }
    }
    Some(left)
}

/// Last offset before `start` whose top is strictly less than `threshold`
fn last_with_top_less<F>(start: Offset, threshold: f32, measure: &F) -> Option<Offset>
where
    F: Fn(Offset) -> CaretMeasure,
{
    if start == 0 {
        return None;
    }

    let mut high = start - 1;
    let mut low = high.saturating_sub(PROBE_WINDOW);

    while low > 0 && measure(low).top >= threshold {
        high = low - 1;
        low = low.saturating_sub((start - low) * 2);
    }

    if measure(low).top >= threshold {
        return None;
    }

    let (mut left, mut right) = (low, high);
    while left < right {
        // Round up so `left = mid` always makes progress
        let mid = left + (right - left).div_ceil(2);
        if measure(mid).top < threshold {
            left = mid;
        } else {
            right = mid - 1;
        }
    }
    Some(left)
}

/// Smallest offset sharing `row_top` (within epsilon), searching down from `probe`
fn row_start<F>(probe: Offset, row_top: f32, measure: &F) -> Offset
where
    F: Fn(Offset) -> CaretMeasure,
{
    let (mut left, mut right) = (0, probe);
    while left < right {
        let mid = left + (right - left) / 2;
        if measure(mid).top >= row_top - EPSILON {
            right = mid;
        } else {
            left = mid + 1;
        }
    }
    left
}

/// Largest offset sharing `row_top` (within epsilon), searching up from `probe`
fn row_end<F>(probe: Offset, max: Offset, row_top: f32, measure: &F) -> Offset
where
    F: Fn(Offset) -> CaretMeasure,
{
    let (mut left, mut right) = (probe, max);
    while left < right {
        let mid = left + (right - left).div_ceil(2);
        if measure(mid).top <= row_top + EPSILON {
            left = mid;
        } else {
            right = mid - 1;
        }
    }
    left
}

/// Offset in `[start, end]` whose left edge is closest to `target_left`.
/// Ties favor the earlier offset.
fn closest_left_in_row<F>(start: Offset, end: Offset, target_left: f32, measure: &F) -> Offset
where
    F: Fn(Offset) -> CaretMeasure,
{
    if start >= end {
        return start;
    }

    let (mut left, mut right) = (start, end);
    while left < right {
        let mid = left + (right - left) / 2;
        if measure(mid).left < target_left {
            left = mid + 1;
        } else {
            right = mid;
        }
    }

    let after = left;
    let before = start.max(left.saturating_sub(1));
    let diff_after = (measure(after).left - target_left).abs();
    let diff_before = (measure(before).left - target_left).abs();
    if diff_before <= diff_after {
        before
    } else {
        after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flatten rows of left positions into a measurement table (20px rows)
    fn measure_map(rows: &[&[f32]]) -> Vec<CaretMeasure> {
        rows.iter()
            .enumerate()
            .flat_map(|(row, lefts)| {
                lefts
                    .iter()
                    .map(move |&left| CaretMeasure::new(row as f32 * 20.0, left))
            })
            .collect()
    }

    fn target(points: &[CaretMeasure], current: Offset, direction: Direction) -> Offset {
        let text_len = points.len() - 1;
        find_target(current, text_len, direction, points[current], |o| points[o])
    }

    fn three_rows() -> Vec<CaretMeasure> {
        measure_map(&[
            &[0.0, 10.0, 20.0, 30.0, 40.0], // 0..=4
            &[0.0, 10.0, 20.0, 30.0],       // 5..=8
            &[0.0, 10.0, 20.0, 30.0],       // 9..=12
        ])
    }

    #[test]
    fn test_moves_to_nearest_x_on_next_row() {
        let points = three_rows();
        assert_eq!(target(&points, 3, Direction::Down), 8);
    }

    #[test]
    fn test_moves_to_nearest_x_on_previous_row() {
        let points = three_rows();
        assert_eq!(target(&points, 10, Direction::Up), 6);
    }

    #[test]
    fn test_clamps_at_document_end() {
        let points = measure_map(&[&[0.0, 10.0, 20.0], &[0.0, 10.0]]);
        let text_len = points.len() - 1;
        assert_eq!(target(&points, text_len, Direction::Down), text_len);
    }

    #[test]
    fn test_clamps_at_document_start() {
        let points = three_rows();
        assert_eq!(target(&points, 0, Direction::Up), 0);
        assert_eq!(target(&points, 2, Direction::Up), 0);
    }

    #[test]
    fn test_empty_document_returns_zero() {
        let result = find_target(0, 0, Direction::Down, CaretMeasure::default(), |_| {
            CaretMeasure::default()
        });
        assert_eq!(result, 0);
        let result = find_target(5, 0, Direction::Up, CaretMeasure::default(), |_| {
            CaretMeasure::default()
        });
        assert_eq!(result, 0);
    }

    #[test]
    fn test_longer_row_snaps_to_row_end_when_target_is_past_it() {
        // From x=40 on the wide first row, the second row ends at x=30
        let points = three_rows();
        assert_eq!(target(&points, 4, Direction::Down), 8);
    }

    #[test]
    fn test_ties_favor_earlier_offset() {
        let points = measure_map(&[&[0.0, 15.0], &[0.0, 10.0, 20.0, 30.0]]);
        // x=15 is equidistant from 10 (offset 3) and 20 (offset 4)
        assert_eq!(target(&points, 1, Direction::Down), 3);
    }

    #[test]
    fn test_single_offset_row_returns_that_offset() {
        let points = measure_map(&[&[0.0, 10.0, 20.0], &[0.0], &[0.0, 10.0, 20.0]]);
        assert_eq!(target(&points, 2, Direction::Down), 3);
        assert_eq!(target(&points, 6, Direction::Up), 3);
    }

    #[test]
    fn test_sub_pixel_noise_stays_on_same_row() {
        let mut points = three_rows();
        points[2].top += 0.3;
        points[7].top -= 0.4;
        assert_eq!(target(&points, 0, Direction::Down), 5);
        assert_eq!(target(&points, 7, Direction::Up), 2);
    }

    #[test]
    fn test_probe_crosses_long_rows() {
        // Rows longer than the initial probe window force the doubling path
        let long: Vec<f32> = (0..100).map(|i| i as f32 * 10.0).collect();
        let points = measure_map(&[&long, &long, &long]);
        assert_eq!(target(&points, 42, Direction::Down), 142);
        assert_eq!(target(&points, 242, Direction::Up), 142);
    }

    #[test]
    fn test_round_trip_lands_on_adjacent_row() {
        let points = measure_map(&[
            &[0.0, 10.0, 20.0, 30.0, 40.0, 50.0],
            &[0.0, 10.0],
            &[0.0, 10.0, 20.0, 30.0, 40.0],
            &[0.0, 10.0, 20.0],
        ]);
        let text_len = points.len() - 1;
        for start in 0..=text_len {
            let down = target(&points, start, Direction::Down);
            let back = target(&points, down, Direction::Up);
            let row_gap = points[down].top - points[back].top;
            assert!(
                (row_gap - 20.0).abs() < EPSILON,
                "start {start}: down {down}, back {back}"
            );
        }
    }

    #[test]
    fn test_repeated_moves_are_monotonic() {
        let points = measure_map(&[
            &[0.0, 10.0, 20.0],
            &[0.0, 10.0, 20.0, 30.0],
            &[0.0],
            &[0.0, 10.0],
        ]);
        let text_len = points.len() - 1;

        let mut offset = 1;
        let mut last_top = points[offset].top;
        for _ in 0..6 {
            offset = target(&points, offset, Direction::Down);
            assert!(points[offset].top >= last_top);
            last_top = points[offset].top;
        }
        assert_eq!(offset, text_len);

        for _ in 0..6 {
            offset = target(&points, offset, Direction::Up);
            assert!(points[offset].top <= last_top);
            last_top = points[offset].top;
        }
        assert_eq!(offset, 0);
    }

    struct GridOracle {
        points: Vec<CaretMeasure>,
    }

    impl CaretOracle for GridOracle {
        fn measure(&self, offset: Offset) -> CaretMeasure {
            self.points[offset.min(self.points.len() - 1)]
        }

        fn line_height(&self) -> f32 {
            20.0
        }
    }

    #[test]
    fn test_navigate_uses_oracle_measure() {
        let oracle = GridOracle {
            points: three_rows(),
        };
        let text_len = oracle.points.len() - 1;
        assert_eq!(navigate(&oracle, 3, text_len, Direction::Down), 8);
        assert_eq!(
            navigate(&oracle, 8, text_len, Direction::Down.reverse()),
            3
        );
    }
}
