//! Missing-aware rolling windows.
//!
//! The window spans `window` rows ending at the current row. Missing rows
//! occupy a slot but do not count as observations; a row with fewer than
//! `min_periods` observations in its window is undefined (`None`).

/// Trailing window with a minimum observation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    window: usize,
    min_periods: usize,
}

impl RollingWindow {
    /// Full window required: undefined until `window` observations exist.
    pub fn new(window: usize) -> Self {
        Self::with_min_periods(window, window)
    }

    pub fn with_min_periods(window: usize, min_periods: usize) -> Self {
        assert!(window >= 1, "rolling window must be >= 1");
        Self {
            window,
            min_periods: min_periods.clamp(1, window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn min_periods(&self) -> usize {
        self.min_periods
    }

    /// Rolling maximum over present values.
    pub fn max(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        (0..values.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(self.window);
                let present = values[start..=i].iter().flatten();
                let (count, max) = present.fold((0usize, f64::NEG_INFINITY), |(n, m), &v| {
                    (n + 1, m.max(v))
                });
                (count >= self.min_periods).then_some(max)
            })
            .collect()
    }

    /// Rolling arithmetic mean over present values.
    pub fn mean(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut result = Vec::with_capacity(values.len());
        let mut sum = 0.0;
        let mut count = 0usize;

        for i in 0..values.len() {
            if let Some(v) = values[i] {
                sum += v;
                count += 1;
            }
            if i >= self.window {
                if let Some(leaving) = values[i - self.window] {
                    sum -= leaving;
                    count -= 1;
                }
            }
            result.push((count >= self.min_periods).then(|| sum / count as f64));
        }

        result
    }
}
