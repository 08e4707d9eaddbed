use machine_learning::{Result as MlResult, dataset::Dataset};

/// `W` consecutive observations and the observation right after them.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub sequence: Vec<f64>,
    pub label: f64,
}

/// Walks `series` with step 1 producing a `Window` per position: `series.len() - window` of
/// them, labels in chronological order. Returns none if the series is not longer than `window`.
pub fn sliding_windows(series: &[f64], window: usize) -> Vec<Window> {
    if window == 0 {
        return Vec::new();
    }

    series
        .windows(window + 1)
        .map(|w| Window {
            sequence: w[..window].to_vec(),
            label: w[window],
        })
        .collect()
}

/// Index of the first held-out window when splitting `n_windows` chronologically, keeping at
/// least one window on each side.
pub fn split_point(n_windows: usize, train_split: f64) -> usize {
    let point = (n_windows as f64 * train_split).floor() as usize;
    point.clamp(1, n_windows.saturating_sub(1).max(1))
}

/// Packs `windows` into a dataset with `W` inputs and one output per row.
pub fn to_dataset(windows: &[Window]) -> MlResult<Dataset> {
    let x_size = windows.first().map_or(0, |w| w.sequence.len());

    let data = windows
        .iter()
        .flat_map(|w| w.sequence.iter().chain([&w.label]))
        .map(|&v| v as f32)
        .collect();

    Dataset::new(data, x_size, 1)
}
