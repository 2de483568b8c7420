/// Nonlinear refinement of a window's signals
///
/// Frequencies and widths are moved by a bounded Nelder–Mead search. For
/// every trial the amplitudes are solved exactly (NNLS or least squares),
/// so the simplex only spans the nonlinear parameters. The residual is
/// taken over the window rows between the two guard bands.

use std::ops::Range;

use super::design::DesignMatrix;
use super::nnls::{fit_amplitudes, FitResult};
use super::optimize::{nelder_mead, Termination};
use super::signal::SignalInPoints;
use crate::config::{AmplitudeMode, FitConfig};

#[derive(Debug, Clone)]
pub struct RefineOptions {
    /// One shared width for every signal
    pub constrain_width: bool,
    pub left_guard: usize,
    pub right_guard: usize,
    /// Evaluation budget per free parameter
    pub evaluations_per_parameter: usize,
    /// Simplex radius (points) below which the search stops
    pub convergence_radius: f64,
    pub min_width: f64,
    pub max_width: f64,
    pub amplitude_mode: AmplitudeMode,
}

impl RefineOptions {
    pub fn from_config(config: &FitConfig, left_guard: usize, right_guard: usize) -> Self {
        Self {
            constrain_width: config.constrain_width,
            left_guard,
            right_guard,
            evaluations_per_parameter: config.step_multiplier,
            convergence_radius: config.stop_radius,
            min_width: config.min_width,
            max_width: config.max_width(),
            amplitude_mode: config.amplitude_mode,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Refinement {
    /// Refined signals; lines whose amplitude fell to zero are dropped
    pub signals: Vec<SignalInPoints>,
    pub rss: f64,
    pub evaluations: usize,
    pub status: Termination,
}

/// Parameter layout: `[f_0..f_n, w_0..w_n]`, or `[f_0..f_n, w]` with a shared width.
struct Layout {
    n: usize,
    shared_width: bool,
}

impl Layout {
    fn unpack(&self, x: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let freqs = x[..self.n].to_vec();
        let widths = if self.shared_width {
            vec![x[self.n]; self.n]
        } else {
            x[self.n..].to_vec()
        };
        (freqs, widths)
    }
}

fn solve(
    window: &[f64],
    rows: &Range<usize>,
    freqs: &[f64],
    widths: &[f64],
    mode: AmplitudeMode,
) -> Option<FitResult> {
    let matrix = DesignMatrix::build_rows(freqs, widths, rows.clone()).ok()?;
    Some(fit_amplitudes(&matrix, &window[rows.clone()], mode))
}

/// Refine `signals` (window point units) against `window`.
pub fn refine(window: &[f64], signals: &[SignalInPoints], options: &RefineOptions) -> Refinement {
    let size = window.len();
    let rows = options.left_guard.min(size)..size.saturating_sub(options.right_guard);
    let n = signals.len();
    if n == 0 || rows.is_empty() {
        return Refinement {
            signals: signals.to_vec(),
            rss: 0.0,
            evaluations: 0,
            status: Termination::Converged,
        };
    }

    let layout = Layout {
        n,
        shared_width: options.constrain_width,
    };
    let clamp_width = |w: f64| w.clamp(options.min_width, options.max_width);
    let upper_f = (size as f64 - 1e-6).max(0.0);

    let mut start = Vec::new();
    let mut steps = Vec::new();
    let mut lower = Vec::new();
    let mut upper = Vec::new();
    for s in signals {
        let reach = s.decay.max(1.0);
        start.push(s.frequency.clamp(0.0, upper_f));
        steps.push((0.25 * s.decay).max(0.5));
        lower.push((s.frequency - reach).max(0.0));
        upper.push((s.frequency + reach).min(upper_f));
    }
    if layout.shared_width {
        let mean = signals.iter().map(|s| s.decay).sum::<f64>() / n as f64;
        let w0 = clamp_width(mean);
        start.push(w0);
        steps.push((0.2 * w0).max(0.1));
        lower.push(options.min_width);
        upper.push(options.max_width);
    } else {
        for s in signals {
            let w0 = clamp_width(s.decay);
            start.push(w0);
            steps.push((0.2 * w0).max(0.1));
            lower.push(options.min_width);
            upper.push(options.max_width);
        }
    }

    let max_evaluations = options.evaluations_per_parameter * start.len();
    let objective = |x: &[f64]| {
        let (freqs, widths) = layout.unpack(x);
        match solve(window, &rows, &freqs, &widths, options.amplitude_mode) {
            Some(fit) => fit.rss,
            None => f64::INFINITY,
        }
    };
    let best = nelder_mead(
        objective,
        &start,
        &steps,
        &lower,
        &upper,
        max_evaluations,
        options.convergence_radius,
    );
    if !best.converged() {
        log::debug!(
            "Refinement of {} signals hit the limit of {} evaluations",
            n,
            max_evaluations
        );
    }

    let (freqs, widths) = layout.unpack(&best.point);
    let Some(fit) = solve(window, &rows, &freqs, &widths, options.amplitude_mode) else {
        return Refinement {
            signals: signals.to_vec(),
            rss: f64::INFINITY,
            evaluations: best.evaluations,
            status: best.status,
        };
    };
    let refined = fit
        .coefficients
        .iter()
        .zip(freqs.iter().zip(&widths))
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, (&f, &w))| SignalInPoints::new(a, f, w))
        .collect();
    Refinement {
        signals: refined,
        rss: fit.rss,
        evaluations: best.evaluations,
        status: best.status,
    }
}
