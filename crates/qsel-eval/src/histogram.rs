//! Histogram-intersection similarity between measurement distributions.

use qsel_hal::Counts;

/// Histogram intersection of an execution against its calibration run.
///
/// Sums `min(candidate_count, calibration_count)` over the union of
/// observed outcomes and normalizes by the calibration shot count.
/// Outcomes absent from one histogram count as zero, so disjoint
/// distributions score 0 and identical ones score 1.
///
/// Returns 0 when the calibration ran zero shots; callers treat
/// non-positive values as "no evidence".
pub fn histogram_intersection(candidate: &Counts, calibration: &Counts, calibration_shots: u64) -> f64 {
    if calibration_shots == 0 {
        return 0.0;
    }

    let overlap: u64 = candidate
        .union_outcomes(calibration)
        .iter()
        .map(|outcome| candidate.get(outcome).min(calibration.get(outcome)))
        .sum();

    overlap as f64 / calibration_shots as f64
}
