//! Point-in-time summary of recorded samples.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::monitor::Sample;

/// Duration statistics for one named operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationStats {
    /// Samples recorded under this name.
    pub count: u64,
    /// Mean duration in milliseconds.
    pub avg_ms: f64,
    /// Shortest duration in milliseconds.
    pub min_ms: f64,
    /// Longest duration in milliseconds.
    pub max_ms: f64,
}

/// Hit/miss counts for one named cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 with no accesses.
    pub hit_rate: f64,
}

/// Summary produced by [`PerformanceMonitor::report`](super::PerformanceMonitor::report).
///
/// Covers only the samples still inside the monitor's ring buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceReport {
    /// Per-operation render statistics, sorted by name.
    pub operations: BTreeMap<String, OperationStats>,
    /// Render samples in the buffer.
    pub total_renders: u64,
    /// Per-cache access statistics, sorted by name.
    pub caches: BTreeMap<String, CacheStats>,
    /// Hit rate across all caches.
    pub cache_hit_rate: f64,
    /// Operation with the highest average duration.
    pub slowest_operation: Option<String>,
    /// Operation with the lowest average duration.
    pub fastest_operation: Option<String>,
    /// Samples pushed out of the ring buffer since the last reset.
    pub samples_evicted: u64,
}

#[derive(Default)]
struct DurationAccumulator {
    count: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
}

impl DurationAccumulator {
    fn add(&mut self, duration: Duration) {
        self.count += 1;
        self.total += duration;
        self.min = Some(self.min.map_or(duration, |min| min.min(duration)));
        self.max = self.max.max(duration);
    }

    fn finish(&self) -> OperationStats {
        let avg = if self.count == 0 {
            0.0
        } else {
            duration_ms(self.total) / self.count as f64
        };
        OperationStats {
            count: self.count,
            avg_ms: avg,
            min_ms: self.min.map_or(0.0, duration_ms),
            max_ms: duration_ms(self.max),
        }
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

impl PerformanceReport {
    pub(crate) fn from_samples<'a, I>(samples: I, samples_evicted: u64) -> Self
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut renders: BTreeMap<&str, DurationAccumulator> = BTreeMap::new();
        let mut accesses: BTreeMap<&str, (u64, u64)> = BTreeMap::new();

        for sample in samples {
            match sample {
                Sample::Render { name, duration } => {
                    renders.entry(name.as_ref()).or_default().add(*duration);
                }
                Sample::CacheAccess { name, hit } => {
                    let counts = accesses.entry(name.as_ref()).or_default();
                    if *hit {
                        counts.0 += 1;
                    } else {
                        counts.1 += 1;
                    }
                }
            }
        }

        let operations: BTreeMap<String, OperationStats> = renders
            .into_iter()
            .map(|(name, acc)| (name.to_string(), acc.finish()))
            .collect();
        let total_renders = operations.values().map(|stats| stats.count).sum();

        // Ties keep the alphabetically first name.
        let mut slowest: Option<(&String, f64)> = None;
        let mut fastest: Option<(&String, f64)> = None;
        for (name, stats) in &operations {
            if slowest.map_or(true, |(_, avg)| stats.avg_ms > avg) {
                slowest = Some((name, stats.avg_ms));
            }
            if fastest.map_or(true, |(_, avg)| stats.avg_ms < avg) {
                fastest = Some((name, stats.avg_ms));
            }
        }
        let slowest_operation = slowest.map(|(name, _)| name.clone());
        let fastest_operation = fastest.map(|(name, _)| name.clone());

        let (total_hits, total_misses) = accesses
            .values()
            .fold((0, 0), |(h, m), (hits, misses)| (h + hits, m + misses));
        let caches = accesses
            .into_iter()
            .map(|(name, (hits, misses))| {
                (
                    name.to_string(),
                    CacheStats {
                        hits,
                        misses,
                        hit_rate: hit_rate(hits, misses),
                    },
                )
            })
            .collect();

        Self {
            operations,
            total_renders,
            caches,
            cache_hit_rate: hit_rate(total_hits, total_misses),
            slowest_operation,
            fastest_operation,
            samples_evicted,
        }
    }

    /// Pretty-printed JSON export for dev tooling.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Renders: {}", self.total_renders)?;
        if !self.operations.is_empty() {
            writeln!(
                f,
                "  {:<24} {:>7} {:>10} {:>10} {:>10}",
                "operation", "count", "avg ms", "min ms", "max ms"
            )?;
            for (name, stats) in &self.operations {
                writeln!(
                    f,
                    "  {:<24} {:>7} {:>10.2} {:>10.2} {:>10.2}",
                    name, stats.count, stats.avg_ms, stats.min_ms, stats.max_ms
                )?;
            }
        }
        if let (Some(slowest), Some(fastest)) = (&self.slowest_operation, &self.fastest_operation) {
            writeln!(f, "Slowest: {slowest}, fastest: {fastest}")?;
        }

        writeln!(f, "Cache hit rate: {:.1}%", self.cache_hit_rate * 100.0)?;
        for (name, stats) in &self.caches {
            writeln!(
                f,
                "  {:<24} {:>7} hits {:>7} misses ({:.1}%)",
                name,
                stats.hits,
                stats.misses,
                stats.hit_rate * 100.0
            )?;
        }

        if self.samples_evicted > 0 {
            writeln!(f, "Samples evicted: {}", self.samples_evicted)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn render(name: &str, ms: u64) -> Sample {
        Sample::Render {
            name: Arc::from(name),
            duration: Duration::from_millis(ms),
        }
    }

    fn access(name: &str, hit: bool) -> Sample {
        Sample::CacheAccess {
            name: Arc::from(name),
            hit,
        }
    }

    #[test]
    fn test_empty_report() {
        let report = PerformanceReport::from_samples(&Vec::<Sample>::new(), 0);
        assert_eq!(report.total_renders, 0);
        assert_eq!(report.cache_hit_rate, 0.0);
        assert!(report.slowest_operation.is_none());
    }

    #[test]
    fn test_operation_statistics() {
        let samples = vec![
            render("pipeline-chart", 10),
            render("pipeline-chart", 30),
            render("hero", 2),
        ];
        let report = PerformanceReport::from_samples(&samples, 0);

        let chart = &report.operations["pipeline-chart"];
        assert_eq!(chart.count, 2);
        assert_eq!(chart.avg_ms, 20.0);
        assert_eq!(chart.min_ms, 10.0);
        assert_eq!(chart.max_ms, 30.0);
        assert_eq!(report.total_renders, 3);
        assert_eq!(report.slowest_operation.as_deref(), Some("pipeline-chart"));
        assert_eq!(report.fastest_operation.as_deref(), Some("hero"));
    }

    #[test]
    fn test_cache_hit_rates() {
        let samples = vec![
            access("leads", true),
            access("leads", true),
            access("leads", false),
            access("companies", false),
        ];
        let report = PerformanceReport::from_samples(&samples, 0);

        assert_eq!(report.caches["leads"].hits, 2);
        assert_eq!(report.caches["companies"].hit_rate, 0.0);
        assert_eq!(report.cache_hit_rate, 0.5);
    }

    #[test]
    fn test_json_export() {
        let samples = vec![render("hero", 4), access("leads", true)];
        let report = PerformanceReport::from_samples(&samples, 0);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["total_renders"], 1);
        assert_eq!(json["operations"]["hero"]["avg_ms"], 4.0);
        assert_eq!(json["cache_hit_rate"], 1.0);
    }

    #[test]
    fn test_display_lists_operations() {
        let samples = vec![render("hero", 4), access("leads", false)];
        let text = PerformanceReport::from_samples(&samples, 2).to_string();

        assert!(text.contains("Renders: 1"));
        assert!(text.contains("hero"));
        assert!(text.contains("Cache hit rate: 0.0%"));
        assert!(text.contains("Samples evicted: 2"));
    }
}
