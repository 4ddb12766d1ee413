//! Descriptive statistics over raw timing samples.

use crate::core::{OperationKind, TimingAggregate, TimingSample};

impl TimingAggregate {
    /// Compute statistics for one group.
    ///
    /// Standard deviation uses the n-1 divisor and is `None` below two samples.
    pub fn from_samples(variant: &str, operation: OperationKind, samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return TimingAggregate {
                variant: variant.to_string(),
                operation,
                samples: 0,
                mean_ms: 0.0,
                stddev_ms: None,
                min_ms: 0.0,
                max_ms: 0.0,
                median_ms: 0.0,
            };
        }

        let mean_ms = samples.iter().sum::<f64>() / n as f64;
        let min_ms = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let stddev_ms = (n >= 2).then(|| {
            let ss: f64 = samples.iter().map(|x| (x - mean_ms).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_ms = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        TimingAggregate {
            variant: variant.to_string(),
            operation,
            samples: n,
            mean_ms,
            stddev_ms,
            min_ms,
            max_ms,
            median_ms,
        }
    }
}

/// Group by `(variant, operation)` and summarize.
///
/// Output follows first appearance: variants in the order first seen, and
/// within a variant, operations in the order first seen.
pub fn aggregate(samples: &[TimingSample]) -> Vec<TimingAggregate> {
    let mut groups: Vec<(&str, Vec<(OperationKind, Vec<f64>)>)> = Vec::new();
    for s in samples {
        let idx = match groups.iter().position(|(v, _)| *v == s.variant) {
            Some(i) => i,
            None => {
                groups.push((s.variant.as_str(), Vec::new()));
                groups.len() - 1
            }
        };
        let ops = &mut groups[idx].1;
        match ops.iter_mut().find(|(op, _)| *op == s.operation) {
            Some((_, values)) => values.push(s.duration_ms),
            None => ops.push((s.operation, vec![s.duration_ms])),
        }
    }

    groups
        .into_iter()
        .flat_map(|(variant, ops)| {
            ops.into_iter()
                .map(move |(op, values)| TimingAggregate::from_samples(variant, op, &values))
        })
        .collect()
}

/// Sample-count-weighted mean across groups of the same population.
///
/// `None` when the groups hold no samples.
pub fn merge_means(parts: &[TimingAggregate]) -> Option<f64> {
    let total: usize = parts.iter().map(|a| a.samples).sum();
    if total == 0 {
        return None;
    }
    let weighted: f64 = parts.iter().map(|a| a.mean_ms * a.samples as f64).sum();
    Some(weighted / total as f64)
}
