//! Sliding-window construction over chronologically ordered feature rows.
//!
//! Pure functions, shared by the training, evaluation and prediction paths
//! so that all three see identical window geometry.

use crate::domain::types::{FeatureRow, Window, CLOSE_IDX};

/// Default number of trading days per model input.
pub const DEFAULT_WINDOW_LENGTH: usize = 60;

/// Builds every (window, target) pair available in `rows`.
///
/// For each index `i` in `window_length..rows.len()` the window is the
/// `window_length` rows preceding `i` and the target is the close feature of
/// row `i`. Sequences no longer than `window_length` yield an empty result;
/// that is a normal outcome, not an error.
pub fn make_windows(rows: &[FeatureRow], window_length: usize) -> (Vec<Window>, Vec<f64>) {
    if rows.len() <= window_length {
        return (Vec::new(), Vec::new());
    }

    let mut windows = Vec::with_capacity(rows.len() - window_length);
    let mut targets = Vec::with_capacity(rows.len() - window_length);
    for i in window_length..rows.len() {
        windows.push(rows[i - window_length..i].to_vec());
        targets.push(rows[i][CLOSE_IDX]);
    }
    (windows, targets)
}

/// The single most-recent window, used for next-day prediction.
///
/// Returns `None` when fewer than `window_length` rows survive cleaning;
/// the caller maps that to `InsufficientData`.
pub fn latest_window(rows: &[FeatureRow], window_length: usize) -> Option<Window> {
    if rows.len() < window_length {
        return None;
    }
    Some(rows[rows.len() - window_length..].to_vec())
}

/// Flattens a window into the row-major feature vector the model consumes.
pub fn flatten(window: &Window) -> Vec<f64> {
    window.iter().flat_map(|row| row.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<FeatureRow> {
        // close = i so targets are easy to assert on
        (0..n)
            .map(|i| [i as f64, 1.0, 2.0, 3.0, 4.0])
            .collect()
    }

    #[test]
    fn emits_one_pair_per_row_past_the_window() {
        for len in [61usize, 75, 120] {
            let (windows, targets) = make_windows(&rows(len), 60);
            assert_eq!(windows.len(), len - 60);
            assert_eq!(targets.len(), len - 60);
            assert!(windows.iter().all(|w| w.len() == 60));
        }
    }

    #[test]
    fn targets_are_the_close_of_the_following_row() {
        let (windows, targets) = make_windows(&rows(63), 60);
        assert_eq!(targets, vec![60.0, 61.0, 62.0]);
        // each window ends with the row just before its target
        assert_eq!(windows[0].last().unwrap()[CLOSE_IDX], 59.0);
        assert_eq!(windows[2].first().unwrap()[CLOSE_IDX], 2.0);
    }

    #[test]
    fn short_sequences_yield_empty_not_error() {
        let (windows, targets) = make_windows(&rows(60), 60);
        assert!(windows.is_empty());
        assert!(targets.is_empty());

        let (windows, _) = make_windows(&rows(0), 60);
        assert!(windows.is_empty());
    }

    #[test]
    fn latest_window_takes_the_tail() {
        let all = rows(100);
        let w = latest_window(&all, 60).unwrap();
        assert_eq!(w.len(), 60);
        assert_eq!(w[0][CLOSE_IDX], 40.0);
        assert_eq!(w[59][CLOSE_IDX], 99.0);

        assert!(latest_window(&rows(59), 60).is_none());
        // exactly window_length rows is enough for prediction
        assert!(latest_window(&rows(60), 60).is_some());
    }

    #[test]
    fn flatten_is_row_major() {
        let w: Window = vec![[1.0, 2.0, 3.0, 4.0, 5.0], [6.0, 7.0, 8.0, 9.0, 10.0]];
        assert_eq!(
            flatten(&w),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
        );
    }
}
