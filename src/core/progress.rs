// src/core/progress.rs — Throughput smoothing and remaining-time estimation

use std::time::Duration;

/// EMA weights for the smoothed throughput rate.
const EMA_KEEP: f64 = 0.7;
const EMA_NEW: f64 = 0.3;

/// Width of the recent-progress window used for the human ETA.
const RECENT_WINDOW_PCT: f64 = 5.0;

/// Safety buffer applied to the remaining-time projection.
const SAFETY_BUFFER: f64 = 1.1;

/// Sanity bounds for the recent-rate projection; outside these the
/// estimator falls back to the overall average rate.
const MIN_SANE: Duration = Duration::from_secs(1);
const MAX_SANE: Duration = Duration::from_secs(2 * 60 * 60);

/// Consumes (elapsed, percent) samples and produces a smoothed rate and
/// a coarse remaining-time estimate.
///
/// All elapsed inputs are *effective* milliseconds: wall clock minus
/// time spent paused. The caller is responsible for that subtraction,
/// which keeps this component clock-free and directly testable.
#[derive(Debug, Default)]
pub struct EtaEstimator {
    /// EMA of instantaneous throughput, in percent per millisecond.
    rate: Option<f64>,
    /// All (elapsed_ms, percent) samples seen so far, in order.
    samples: Vec<(u64, f64)>,
}

impl EtaEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a progress sample. Samples with a non-positive time delta
    /// update history but skip the rate update.
    pub fn record(&mut self, elapsed_ms: u64, percent: f64) {
        if let Some(&(prev_ms, prev_pct)) = self.samples.last() {
            let dt = elapsed_ms.saturating_sub(prev_ms);
            if dt > 0 {
                let inst = (percent - prev_pct) / dt as f64;
                self.rate = Some(match self.rate {
                    Some(r) => r * EMA_KEEP + inst * EMA_NEW,
                    None => inst,
                });
            }
        }
        self.samples.push((elapsed_ms, percent));
    }

    /// Smoothed throughput in percent per second.
    pub fn rate_per_sec(&self) -> f64 {
        self.rate.unwrap_or(0.0) * 1000.0
    }

    /// Remaining-time estimate for the current progress point.
    ///
    /// Extrapolates the time taken to cover the last 5 percentage points
    /// forward over the remainder, plus a 10% buffer. Falls back to the
    /// overall average rate when that projection lands outside [1s, 2h].
    pub fn remaining(&self) -> Option<Duration> {
        let &(now_ms, percent) = self.samples.last()?;
        if percent <= 0.0 {
            return None;
        }
        if percent >= 100.0 {
            return Some(Duration::ZERO);
        }

        match self.recent_projection(now_ms, percent) {
            Some(d) if d >= MIN_SANE && d <= MAX_SANE => Some(d),
            _ => self.average_projection(now_ms, percent),
        }
    }

    /// Formatted estimate, e.g. "~3m 12s remaining" or "~45s remaining".
    pub fn eta_string(&self) -> Option<String> {
        self.remaining().map(format_remaining)
    }

    fn recent_projection(&self, now_ms: u64, percent: f64) -> Option<Duration> {
        // Earliest sample within the last RECENT_WINDOW_PCT points
        let &(win_ms, win_pct) = self
            .samples
            .iter()
            .find(|&&(_, p)| p >= percent - RECENT_WINDOW_PCT)?;

        let covered = percent - win_pct;
        let took_ms = now_ms.saturating_sub(win_ms);
        if covered <= 0.0 || took_ms == 0 {
            return None;
        }

        let remaining_ms = (100.0 - percent) / covered * took_ms as f64 * SAFETY_BUFFER;
        Some(Duration::from_millis(remaining_ms as u64))
    }

    fn average_projection(&self, now_ms: u64, percent: f64) -> Option<Duration> {
        if now_ms == 0 {
            return None;
        }
        let avg_rate = percent / now_ms as f64; // percent per ms
        if avg_rate <= 0.0 {
            return None;
        }
        let remaining_ms = (100.0 - percent) / avg_rate;
        Some(Duration::from_millis(remaining_ms as u64))
    }
}

/// Coarse "~Xm Ys remaining" string; minutes omitted when zero.
pub fn format_remaining(d: Duration) -> String {
    let total = d.as_secs();
    let minutes = total / 60;
    let seconds = total % 60;
    if minutes == 0 {
        format!("~{}s remaining", seconds)
    } else {
        format!("~{}m {}s remaining", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_seeds_nothing() {
        let mut est = EtaEstimator::new();
        est.record(0, 0.0);
        assert_eq!(est.rate_per_sec(), 0.0);
        assert!(est.remaining().is_none());
    }

    #[test]
    fn test_ema_seeding_and_smoothing() {
        let mut est = EtaEstimator::new();
        est.record(0, 0.0);
        est.record(1000, 10.0); // 0.01 %/ms seeds the EMA
        assert!((est.rate_per_sec() - 10.0).abs() < 1e-6);

        est.record(2000, 15.0); // inst = 0.005 %/ms
        // 0.01*0.7 + 0.005*0.3 = 0.0085 %/ms = 8.5 %/s
        assert!((est.rate_per_sec() - 8.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_dt_skips_rate_update() {
        let mut est = EtaEstimator::new();
        est.record(1000, 10.0);
        est.record(1000, 20.0);
        assert_eq!(est.rate_per_sec(), 0.0);
    }

    #[test]
    fn test_steady_progress_projection() {
        // 1% per second: at 50% after 50s, ~50s remain (+10% buffer)
        let mut est = EtaEstimator::new();
        for i in 0..=50u64 {
            est.record(i * 1000, i as f64);
        }
        let remaining = est.remaining().unwrap();
        let secs = remaining.as_secs_f64();
        assert!((secs - 55.0).abs() < 2.0, "got {}s", secs);
    }

    #[test]
    fn test_recent_window_dominates() {
        // Slow start, fast recent progress: projection should track the
        // last 5 points, not the overall average.
        let mut est = EtaEstimator::new();
        est.record(0, 0.0);
        est.record(60_000, 5.0); // 5% in a minute
        for i in 1..=10u64 {
            est.record(60_000 + i * 1000, 5.0 + i as f64 * 5.0); // 5%/s
        }
        // now at 55% after 70s; last 5% took ~1s, so ~9s * 1.1 remain
        let secs = est.remaining().unwrap().as_secs_f64();
        assert!(secs < 20.0, "recent-rate projection ignored: {}s", secs);
    }

    #[test]
    fn test_insane_projection_falls_back_to_average() {
        // A 10-point jump in one sample leaves the recent window with no
        // usable span, so the overall average rate applies.
        let mut est = EtaEstimator::new();
        est.record(0, 0.0);
        est.record(100_000, 40.0);
        est.record(100_010, 50.0); // 10 points in 10ms
        let remaining = est.remaining().unwrap();
        // Average: 50% over 100s → 50% remaining → ~100s
        let secs = remaining.as_secs_f64();
        assert!((secs - 100.0).abs() < 5.0, "got {}s", secs);
    }

    #[test]
    fn test_complete_is_zero() {
        let mut est = EtaEstimator::new();
        est.record(0, 0.0);
        est.record(5000, 100.0);
        assert_eq!(est.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_format_seconds_only() {
        assert_eq!(format_remaining(Duration::from_secs(45)), "~45s remaining");
    }

    #[test]
    fn test_format_minutes_and_seconds() {
        assert_eq!(
            format_remaining(Duration::from_secs(192)),
            "~3m 12s remaining"
        );
    }

    #[test]
    fn test_format_exact_minute() {
        assert_eq!(format_remaining(Duration::from_secs(60)), "~1m 0s remaining");
    }
}
