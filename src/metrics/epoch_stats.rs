use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::metrics::dist::ProcessGroup;
use crate::metrics::smoothed::{MeterFormat, SmoothedValue};

/// Metric name → global average, returned at the end of an epoch.
pub type EpochSummary = BTreeMap<String, f64>;

/// Running per-epoch metrics, one `SmoothedValue` per metric name.
///
/// Created at the start of an epoch, updated once per batch, read once at
/// the end. Meters keep the order in which they were first seen.
#[derive(Debug, Clone)]
pub struct EpochStats {
    meters: Vec<(String, SmoothedValue)>,
    delimiter: &'static str,
}

impl EpochStats {
    pub fn new() -> EpochStats {
        EpochStats { meters: Vec::new(), delimiter: "  " }
    }

    /// Registers a meter with a non-default window or format.
    pub fn add_meter(&mut self, name: &str, meter: SmoothedValue) {
        match self.meters.iter_mut().find(|(n, _)| n == name) {
            Some((_, m)) => *m = meter,
            None => self.meters.push((name.to_string(), meter)),
        }
    }

    /// Records `value` for `name`, weighted by `n`. Unknown names get a
    /// default smoothed meter.
    pub fn update(&mut self, name: &str, value: f64, n: usize) {
        self.meter_mut(name).update(value, n);
    }

    pub fn meter(&self, name: &str) -> Option<&SmoothedValue> {
        self.meters.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    fn meter_mut(&mut self, name: &str) -> &mut SmoothedValue {
        let idx = match self.meters.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.meters.push((name.to_string(), SmoothedValue::default()));
                self.meters.len() - 1
            }
        };
        &mut self.meters[idx].1
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    /// Sums every meter's `(count, total)` across the process group so the
    /// global averages cover all participants.
    pub fn synchronize_between_processes(&mut self, group: &dyn ProcessGroup) {
        if group.world_size() <= 1 {
            return;
        }
        for (_, meter) in self.meters.iter_mut() {
            let mut buf = [meter.count() as f64, meter.total()];
            group.all_reduce_sum(&mut buf);
            meter.set_totals(buf[0].round() as usize, buf[1]);
        }
    }

    pub fn global_averages(&self) -> EpochSummary {
        self.meters
            .iter()
            .filter(|(_, m)| m.count() > 0)
            .map(|(n, m)| (n.clone(), m.global_avg()))
            .collect()
    }

    /// One progress line for batch `i` of `total`, with an ETA extrapolated
    /// from the mean time per batch so far.
    pub fn progress_line(&self, header: &str, i: usize, total: usize, elapsed: Duration) -> String {
        let width = total.to_string().len();
        let per_iter = elapsed.as_secs_f64() / (i + 1) as f64;
        let eta = Duration::from_secs_f64(per_iter * total.saturating_sub(i + 1) as f64);
        format!(
            "{header}{d}[{i:>width$}/{total}]{d}eta: {eta}{d}{meters}{d}time: {per_iter:.4}",
            d = self.delimiter,
            eta = format_hms(eta),
            meters = self,
        )
    }
}

impl Default for EpochStats {
    fn default() -> Self {
        EpochStats::new()
    }
}

impl fmt::Display for EpochStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.meters.iter().map(|(n, m)| format!("{}: {}", n, m)).collect();
        write!(f, "{}", parts.join(self.delimiter))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `H:MM:SS`
pub fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// A learning-rate meter that prints only its latest value.
pub fn lr_meter() -> SmoothedValue {
    SmoothedValue::new(1, MeterFormat::Value6)
}
