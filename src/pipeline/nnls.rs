/// Amplitude fitting
///
/// Solves `min ‖A·x − b‖²` for the line-shape amplitudes, either subject
/// to `x ≥ 0` (Lawson–Hanson active-set NNLS) or unconstrained. Both work
/// on the normal equations of the (small) design matrix and report the
/// residual and an AIC-like information criterion used to compare model
/// orders.

use super::design::DesignMatrix;
use super::linalg::solve_symmetric;
use crate::config::AmplitudeMode;

/// Smallest residual used when forming the information criterion
const RSS_FLOOR: f64 = 1e-300;

/// Outcome of one amplitude fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// One coefficient per design-matrix column
    pub coefficients: Vec<f64>,
    /// ‖A·x − b‖²
    pub rss: f64,
    /// n·ln(rss/n) + 2·k, k = number of non-zero coefficients
    pub aic: f64,
    pub max_value: f64,
    pub max_index: usize,
    /// False when the iteration cap was hit; the coefficients are then the
    /// best feasible iterate
    pub converged: bool,
}

impl FitResult {
    fn from_coefficients(matrix: &DesignMatrix, b: &[f64], coefficients: Vec<f64>, converged: bool) -> Self {
        let fitted = matrix.apply(&coefficients);
        let rss: f64 = fitted.iter().zip(b).map(|(f, y)| (f - y) * (f - y)).sum();
        let n = matrix.n_rows().max(1) as f64;
        let k = coefficients.iter().filter(|&&c| c != 0.0).count() as f64;
        let aic = n * (rss.max(RSS_FLOOR) / n).ln() + 2.0 * k;
        let (max_index, max_value) = coefficients
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, v)| if v > bv { (i, v) } else { (bi, bv) });
        Self {
            coefficients,
            rss,
            aic,
            max_value: if max_value.is_finite() { max_value } else { 0.0 },
            max_index,
            converged,
        }
    }

    /// Number of strictly positive coefficients
    pub fn active_count(&self) -> usize {
        self.coefficients.iter().filter(|&&c| c > 0.0).count()
    }
}

/// Fit amplitudes in the requested mode.
pub fn fit_amplitudes(matrix: &DesignMatrix, b: &[f64], mode: AmplitudeMode) -> FitResult {
    match mode {
        AmplitudeMode::NonNegative => fit(matrix, b),
        AmplitudeMode::Unconstrained => fit_unconstrained(matrix, b),
    }
}

/// Unconstrained least squares via the normal equations.
pub fn fit_unconstrained(matrix: &DesignMatrix, b: &[f64]) -> FitResult {
    let k = matrix.n_cols();
    let (gram, atb) = matrix.normal_equations(b);
    match solve_symmetric(&gram, k, &atb) {
        Some(x) => FitResult::from_coefficients(matrix, b, x, true),
        None => FitResult::from_coefficients(matrix, b, vec![0.0; k], false),
    }
}

/// Non-negative least squares (Lawson–Hanson active set).
///
/// Never fails: a singular system or an exhausted iteration budget yields
/// the best feasible iterate, possibly all zeros.
pub fn fit(matrix: &DesignMatrix, b: &[f64]) -> FitResult {
    let k = matrix.n_cols();
    if k == 0 {
        return FitResult::from_coefficients(matrix, b, Vec::new(), true);
    }
    let (gram, atb) = matrix.normal_equations(b);
    let scale = atb.iter().map(|v| v.abs()).fold(0.0f64, f64::max);
    let tol = 1e-12 * scale.max(f64::MIN_POSITIVE);

    let mut x = vec![0.0; k];
    let mut passive = vec![false; k];
    // Columns whose entry was rejected numerically; excluded until x changes
    let mut blocked = vec![false; k];
    let max_outer = 3 * k + 30;
    let mut converged = false;

    for _ in 0..max_outer {
        let w = gradient(&gram, &atb, &x, k);
        // Most violating zero-set variable; lowest index wins ties
        let mut best: Option<(usize, f64)> = None;
        for j in 0..k {
            if passive[j] || blocked[j] {
                continue;
            }
            if w[j] > tol && best.map_or(true, |(_, bw)| w[j] > bw) {
                best = Some((j, w[j]));
            }
        }
        let Some((t, _)) = best else {
            converged = true;
            break;
        };
        passive[t] = true;

        let mut inner = 0;
        loop {
            inner += 1;
            let idx: Vec<usize> = (0..k).filter(|&j| passive[j]).collect();
            let Some(z) = solve_passive(&gram, &atb, k, &idx) else {
                // Singular subproblem: drop the newcomer and move on
                passive[t] = false;
                blocked[t] = true;
                break;
            };

            if z.iter().all(|&v| v > 0.0) {
                for (p, &j) in idx.iter().enumerate() {
                    x[j] = z[p];
                }
                blocked.iter_mut().for_each(|b| *b = false);
                break;
            }

            if inner > k + 1 {
                // Cycling; keep the feasible part of the subproblem solution
                for (p, &j) in idx.iter().enumerate() {
                    x[j] = z[p].max(0.0);
                    passive[j] = x[j] > 0.0;
                }
                break;
            }

            // Step towards z until the first passive variable hits zero
            let mut alpha = f64::INFINITY;
            for (p, &j) in idx.iter().enumerate() {
                if z[p] <= 0.0 {
                    alpha = alpha.min(x[j] / (x[j] - z[p]));
                }
            }
            if !alpha.is_finite() {
                alpha = 0.0;
            }
            for (p, &j) in idx.iter().enumerate() {
                x[j] += alpha * (z[p] - x[j]);
            }
            let x_max = x.iter().copied().fold(0.0f64, f64::max);
            for &j in &idx {
                if x[j] <= 1e-14 * x_max {
                    x[j] = 0.0;
                    passive[j] = false;
                }
            }
            if alpha == 0.0 && !passive[t] {
                // The entering variable cannot be kept positive
                blocked[t] = true;
                break;
            }
            if !passive.iter().any(|&p| p) {
                break;
            }
        }
    }

    if !converged {
        log::debug!("NNLS stopped after {} outer iterations without convergence", max_outer);
    }
    FitResult::from_coefficients(matrix, b, x, converged)
}

/// w = Aᵀb − AᵀA·x
fn gradient(gram: &[f64], atb: &[f64], x: &[f64], k: usize) -> Vec<f64> {
    (0..k)
        .map(|i| {
            let gx: f64 = (0..k).map(|j| gram[i * k + j] * x[j]).sum();
            atb[i] - gx
        })
        .collect()
}

/// Least squares restricted to the columns in `idx`.
fn solve_passive(gram: &[f64], atb: &[f64], k: usize, idx: &[usize]) -> Option<Vec<f64>> {
    let m = idx.len();
    let mut sub = vec![0.0; m * m];
    let mut rhs = vec![0.0; m];
    for (p, &i) in idx.iter().enumerate() {
        rhs[p] = atb[i];
        for (q, &j) in idx.iter().enumerate() {
            sub[p * m + q] = gram[i * k + j];
        }
    }
    solve_symmetric(&sub, m, &rhs)
}
