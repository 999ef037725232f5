use std::collections::VecDeque;
use std::fmt;

/// How a meter renders itself in progress lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterFormat {
    /// `median (global_avg)` with four decimals.
    Smoothed,
    /// The latest value with six decimals, used for the learning rate.
    Value6,
}

/// Tracks a series of values, exposing smoothed values over a window and a
/// global average over the whole series.
///
/// `count` and `total` only ever grow while the meter is alive.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    window: VecDeque<f64>,
    window_size: usize,
    total: f64,
    count: usize,
    format: MeterFormat,
}

impl SmoothedValue {
    pub fn new(window_size: usize, format: MeterFormat) -> SmoothedValue {
        SmoothedValue {
            window: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            total: 0.0,
            count: 0,
            format,
        }
    }

    /// Records `value` observed `n` times (e.g. an accuracy over `n` samples).
    pub fn update(&mut self, value: f64, n: usize) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.count += n;
        self.total += value * n as f64;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Overwrites the global totals, used after a cross-process reduction.
    pub(crate) fn set_totals(&mut self, count: usize, total: f64) {
        self.count = count;
        self.total = total;
    }

    pub fn median(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.window.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted[(sorted.len() - 1) / 2]
    }

    pub fn avg(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn global_avg(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total / self.count as f64
    }

    pub fn max(&self) -> f64 {
        self.window.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn value(&self) -> f64 {
        self.window.back().copied().unwrap_or(0.0)
    }
}

impl Default for SmoothedValue {
    fn default() -> Self {
        SmoothedValue::new(20, MeterFormat::Smoothed)
    }
}

impl fmt::Display for SmoothedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            MeterFormat::Smoothed => write!(f, "{:.4} ({:.4})", self.median(), self.global_avg()),
            MeterFormat::Value6 => write!(f, "{:.6}", self.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_avg_is_weighted_by_n() {
        let mut m = SmoothedValue::default();
        m.update(100.0, 1);
        m.update(0.0, 3);
        assert_eq!(m.count(), 4);
        assert_eq!(m.global_avg(), 25.0);
    }

    #[test]
    fn window_drops_oldest_but_totals_keep_growing() {
        let mut m = SmoothedValue::new(2, MeterFormat::Smoothed);
        for v in [1.0, 2.0, 9.0] {
            m.update(v, 1);
        }
        assert_eq!(m.avg(), 5.5);
        assert_eq!(m.max(), 9.0);
        assert_eq!(m.value(), 9.0);
        assert_eq!(m.count(), 3);
        assert_eq!(m.global_avg(), 4.0);
    }

    #[test]
    fn display_follows_format() {
        let mut lr = SmoothedValue::new(1, MeterFormat::Value6);
        lr.update(0.001, 1);
        assert_eq!(lr.to_string(), "0.001000");

        let mut loss = SmoothedValue::default();
        loss.update(0.5, 1);
        assert_eq!(loss.to_string(), "0.5000 (0.5000)");
    }
}
