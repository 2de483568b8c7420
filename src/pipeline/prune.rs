/// Greedy candidate pruning
///
/// Fits all active candidates, and while the strongest fitted line stays
/// at or below the detection threshold, drops the weakest candidate and
/// refits. Every round's fit replaces the previous snapshot; no
/// information-criterion comparison gates the update.

use std::ops::Range;

use super::candidates::Candidate;
use super::design::DesignMatrix;
use super::lineshape::peak_height;
use super::nnls::{self, FitResult};
use super::signal::SignalInPoints;
use super::width::optimize_width;

#[derive(Debug, Clone)]
pub struct PruneOptions {
    /// Peak height the strongest line must exceed to stop pruning
    pub threshold: f64,
    /// Fit one shared width per round
    pub constrain_width: bool,
    /// Search interval for the shared width
    pub width_interval: (f64, f64),
    pub width_evaluations: usize,
}

/// State accepted when pruning stopped.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub frequencies: Vec<f64>,
    pub decays: Vec<f64>,
    /// Fit of the accepted set; `None` when every candidate was removed
    pub fit: Option<FitResult>,
    /// Number of fit rounds performed
    pub rounds: usize,
}

impl PruneOutcome {
    fn empty(rounds: usize) -> Self {
        Self {
            frequencies: Vec::new(),
            decays: Vec::new(),
            fit: None,
            rounds,
        }
    }

    /// Lines of the accepted set with a strictly positive amplitude.
    pub fn signals(&self) -> Vec<SignalInPoints> {
        let Some(fit) = &self.fit else {
            return Vec::new();
        };
        fit.coefficients
            .iter()
            .zip(self.frequencies.iter().zip(&self.decays))
            .filter(|(&c, _)| c > 0.0)
            .map(|(&c, (&f, &d))| SignalInPoints::new(c, f, d))
            .collect()
    }
}

/// Prune `candidates` against the samples in `rows` of `window`.
pub fn prune(window: &[f64], rows: Range<usize>, candidates: &[Candidate], options: &PruneOptions) -> PruneOutcome {
    let observed = &window[rows.clone()];
    let mut frequencies: Vec<f64> = candidates.iter().map(|c| c.frequency).collect();
    let mut decays: Vec<f64> = candidates.iter().map(|c| c.decay).collect();
    let mut rounds = 0;

    loop {
        if frequencies.is_empty() {
            log::debug!("Pruned every candidate after {} rounds", rounds);
            return PruneOutcome::empty(rounds);
        }
        rounds += 1;

        if options.constrain_width {
            // Width search runs on 0-based rows, so shift the centres
            let shifted: Vec<f64> = frequencies.iter().map(|f| f - rows.start as f64).collect();
            let width = optimize_width(observed, &shifted, options.width_interval, options.width_evaluations);
            decays.iter_mut().for_each(|d| *d = width.point);
        }
        let matrix = match DesignMatrix::build_rows(&frequencies, &decays, rows.clone()) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Pruning stopped: {}", e);
                return PruneOutcome::empty(rounds);
            }
        };
        let fit = nnls::fit(&matrix, observed);

        let strongest = peak_height(fit.max_value, decays[fit.max_index]);
        if strongest > options.threshold {
            return PruneOutcome {
                frequencies,
                decays,
                fit: Some(fit),
                rounds,
            };
        }

        // Weakest line goes; lowest index wins ties
        let (weakest, _) = fit
            .coefficients
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |(bi, bv), (i, v)| if v < bv { (i, v) } else { (bi, bv) });
        frequencies.remove(weakest);
        decays.remove(weakest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(threshold: f64) -> PruneOptions {
        PruneOptions {
            threshold,
            constrain_width: false,
            width_interval: (1.0, 32.0),
            width_evaluations: 40,
        }
    }

    fn candidate(frequency: f64, decay: f64) -> Candidate {
        Candidate {
            frequency,
            decay,
            amplitude: 0.0,
        }
    }

    #[test]
    fn test_strong_line_stops_immediately() {
        let window = DesignMatrix::build(&[30.0], &[6.0], 64).unwrap().apply(&[2.0]);
        let cands = [candidate(30.0, 6.0), candidate(50.0, 4.0)];
        let out = prune(&window, 0..64, &cands, &options(0.05));
        assert_eq!(out.rounds, 1);
        let signals = out.signals();
        assert_eq!(signals.len(), 1);
        assert!((signals[0].amplitude - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_weak_data_prunes_everything() {
        let window = DesignMatrix::build(&[30.0], &[6.0], 64).unwrap().apply(&[0.01]);
        let cands = [candidate(10.0, 4.0), candidate(30.0, 6.0), candidate(50.0, 4.0)];
        let out = prune(&window, 0..64, &cands, &options(1.0));
        assert!(out.fit.is_none());
        assert!(out.signals().is_empty());
        assert!(out.rounds <= cands.len() + 1);
    }

    #[test]
    fn test_termination_bound() {
        let window: Vec<f64> = (0..64).map(|i| ((i as f64) * 0.37).sin().abs() * 0.01).collect();
        for n in 0..6 {
            let cands: Vec<Candidate> = (0..n).map(|i| candidate(5.0 + 10.0 * i as f64, 3.0)).collect();
            let out = prune(&window, 0..64, &cands, &options(10.0));
            assert!(out.rounds <= n + 1, "n = {}, rounds = {}", n, out.rounds);
        }
    }

    #[test]
    fn test_zero_window_yields_no_signals() {
        let cands = [candidate(20.0, 4.0)];
        let out = prune(&[0.0; 64], 0..64, &cands, &options(0.0));
        assert!(out.signals().is_empty());
    }

    #[test]
    fn test_guard_rows_excluded() {
        // Line lives in rows 16..48; the padded rows are zero
        let mut window = vec![0.0; 64];
        let line = DesignMatrix::build_rows(&[32.0], &[5.0], 16..48).unwrap().apply(&[1.5]);
        window[16..48].copy_from_slice(&line);
        let out = prune(&window, 16..48, &[candidate(32.0, 5.0)], &options(0.01));
        let signals = out.signals();
        assert_eq!(signals.len(), 1);
        assert!((signals[0].amplitude - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_width_mode() {
        let window = DesignMatrix::build(&[20.0, 44.0], &[7.0, 7.0], 64).unwrap().apply(&[1.0, 1.0]);
        let opts = PruneOptions {
            constrain_width: true,
            ..options(0.01)
        };
        let out = prune(&window, 0..64, &[candidate(20.0, 3.0), candidate(44.0, 3.0)], &opts);
        assert!(out.decays.iter().all(|&d| (d - 7.0).abs() < 0.1), "{:?}", out.decays);
    }
}
