/// CPU time profiler for controller updates.

use std::time::{Duration, Instant};

/// Accumulates wall-clock samples between `begin_measurement` and
/// `end_measurement`.
#[derive(Debug, Clone, Default)]
pub struct CpuTimeProfiler {
    started: Option<Instant>,
    samples: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
    last: Duration,
}

impl CpuTimeProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_measurement(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the open measurement and record it (no-op without one)
    pub fn end_measurement(&mut self) {
        if let Some(started) = self.started.take() {
            self.record(started.elapsed());
        }
    }

    /// Drop the open measurement without recording it
    pub fn cancel_measurement(&mut self) {
        self.started = None;
    }

    /// Record an externally measured sample
    pub fn record(&mut self, sample: Duration) {
        self.samples += 1;
        self.total += sample;
        self.last = sample;
        self.max = self.max.max(sample);
        self.min = Some(self.min.map_or(sample, |min| min.min(sample)));
    }

    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn last(&self) -> Duration {
        self.last
    }

    pub fn min(&self) -> Duration {
        self.min.unwrap_or_default()
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn average(&self) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }
        // Duration only divides by u32
        let samples = u32::try_from(self.samples).unwrap_or(u32::MAX);
        self.total / samples
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profiler() {
        let profiler = CpuTimeProfiler::new();
        assert_eq!(profiler.sample_count(), 0);
        assert_eq!(profiler.average(), Duration::ZERO);
        assert_eq!(profiler.min(), Duration::ZERO);
    }

    #[test]
    fn test_record_statistics() {
        let mut profiler = CpuTimeProfiler::new();
        profiler.record(Duration::from_micros(30));
        profiler.record(Duration::from_micros(10));
        profiler.record(Duration::from_micros(20));

        assert_eq!(profiler.sample_count(), 3);
        assert_eq!(profiler.total(), Duration::from_micros(60));
        assert_eq!(profiler.min(), Duration::from_micros(10));
        assert_eq!(profiler.max(), Duration::from_micros(30));
        assert_eq!(profiler.last(), Duration::from_micros(20));
        assert_eq!(profiler.average(), Duration::from_micros(20));
    }

    #[test]
    fn test_end_without_begin_is_ignored() {
        let mut profiler = CpuTimeProfiler::new();
        profiler.end_measurement();
        assert_eq!(profiler.sample_count(), 0);

        profiler.begin_measurement();
        profiler.end_measurement();
        profiler.end_measurement();
        assert_eq!(profiler.sample_count(), 1);
    }
}
