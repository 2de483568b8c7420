/// Shared line-width search
///
/// In uniform-width mode every signal of a window carries the same decay.
/// The width is found by a golden-section search over the NNLS residual.

use super::design::DesignMatrix;
use super::nnls::{self, FitResult};
use super::optimize::{golden_section, Minimum};

/// Interval tolerance for the width search, in points
const WIDTH_TOLERANCE: f64 = 1.0e-2;

/// NNLS refit with every line at the same `width`.
pub fn fit_with_width(samples: &[f64], frequencies: &[f64], width: f64) -> Option<FitResult> {
    let decays = vec![width; frequencies.len()];
    let matrix = DesignMatrix::build(frequencies, &decays, samples.len()).ok()?;
    Some(nnls::fit(&matrix, samples))
}

/// Find the shared decay in `interval` minimizing the NNLS residual.
///
/// Never fails: an exhausted budget returns the best width evaluated.
pub fn optimize_width(
    samples: &[f64],
    frequencies: &[f64],
    interval: (f64, f64),
    max_evaluations: usize,
) -> Minimum<f64> {
    let (lo, hi) = interval;
    let result = golden_section(
        |w| match fit_with_width(samples, frequencies, w) {
            Some(fit) => fit.rss,
            None => f64::INFINITY,
        },
        lo,
        hi,
        WIDTH_TOLERANCE,
        max_evaluations,
    );
    if !result.converged() {
        log::debug!(
            "Width search stopped after {} evaluations at {:.3} points",
            result.evaluations,
            result.point
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::optimize::Termination;
    use approx::assert_abs_diff_eq;

    fn synthetic(freqs: &[f64], width: f64, amps: &[f64], n: usize) -> Vec<f64> {
        let decays = vec![width; freqs.len()];
        DesignMatrix::build(freqs, &decays, n).unwrap().apply(amps)
    }

    #[test]
    fn test_recovers_shared_width() {
        let freqs = [30.0, 70.0];
        let samples = synthetic(&freqs, 9.0, &[4.0, 2.0], 128);
        let m = optimize_width(&samples, &freqs, (2.0, 40.0), 100);
        assert!(m.converged());
        assert_abs_diff_eq!(m.point, 9.0, epsilon = 0.05);
        let fit = fit_with_width(&samples, &freqs, m.point).unwrap();
        assert_abs_diff_eq!(fit.coefficients[0], 4.0, epsilon = 0.05);
        assert_abs_diff_eq!(fit.coefficients[1], 2.0, epsilon = 0.05);
    }

    #[test]
    fn test_budget_returns_best_so_far() {
        let freqs = [40.0];
        let samples = synthetic(&freqs, 12.0, &[1.0], 96);
        let m = optimize_width(&samples, &freqs, (1.0, 48.0), 5);
        assert_eq!(m.status, Termination::EvaluationLimit);
        assert!(m.point >= 1.0 && m.point <= 48.0);
        assert!(m.value.is_finite());
    }
}
