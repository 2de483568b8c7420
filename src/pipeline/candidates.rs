/// Candidate (frequency, decay) pairs for one scan window.
///
/// The real window is zero-filled to the transform size and Fourier
/// transformed. After modulation by (-1)^t the first half of the transform
/// is a sum of damped complex exponentials, one per Lorentzian line, whose
/// poles are recovered by least-squares linear prediction. A pole `z` maps
/// to
///
/// ```text
///   frequency = N·(π − arg z)/(2π)
///   decay     = −ln|z|·N/π · damping_scale
/// ```
///
/// in points of the window.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use super::lineshape::peak_height;
use super::linalg::{polynomial_roots, solve_complex};
use crate::config::FitConfig;

/// Relative Tikhonov term for the prediction and amplitude solves
const REGULARIZATION: f64 = 1.0e-10;

/// One candidate line, in window points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub frequency: f64,
    pub decay: f64,
    /// Estimated area from the pole fit
    pub amplitude: f64,
}

impl Candidate {
    pub fn height(&self) -> f64 {
        peak_height(self.amplitude, self.decay)
    }
}

/// Reusable candidate generator; the FFT plan is built once per transform size.
pub struct CandidateGenerator {
    transform_size: usize,
    n_coefficients: usize,
    damping_scale: f64,
    min_width: f64,
    max_width: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for CandidateGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateGenerator")
            .field("transform_size", &self.transform_size)
            .field("n_coefficients", &self.n_coefficients)
            .field("damping_scale", &self.damping_scale)
            .field("min_width", &self.min_width)
            .field("max_width", &self.max_width)
            .finish()
    }
}

impl CandidateGenerator {
    pub fn new(
        transform_size: usize,
        n_coefficients: usize,
        damping_scale: f64,
        min_width: f64,
        max_width: f64,
    ) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(transform_size);
        Self {
            transform_size,
            n_coefficients,
            damping_scale,
            min_width,
            max_width,
            fft,
        }
    }

    pub fn from_config(config: &FitConfig) -> Self {
        Self::new(
            config.transform_size(),
            config.n_coefficients,
            config.damping_scale,
            config.min_width,
            config.max_width(),
        )
    }

    pub fn transform_size(&self) -> usize {
        self.transform_size
    }

    /// Candidates for `window` whose estimated height reaches `threshold`.
    ///
    /// Results are sorted by frequency. An all-zero window yields none.
    pub fn generate(&self, window: &[f64], threshold: f64) -> Vec<Candidate> {
        let n = self.transform_size;
        let w = window.len().min(n);
        if w == 0 || window[..w].iter().all(|&v| v == 0.0) {
            return Vec::new();
        }

        let mut buffer: Vec<Complex64> = window[..w]
            .iter()
            .map(|&v| Complex64::new(v, 0.0))
            .chain(std::iter::repeat(Complex64::new(0.0, 0.0)).take(n - w))
            .collect();
        self.fft.process(&mut buffer);

        let m = n / 2;
        let signal: Vec<Complex64> = buffer[..m]
            .iter()
            .enumerate()
            .map(|(t, &v)| if t % 2 == 0 { v } else { -v })
            .collect();

        let order = self.n_coefficients.min(m / 3).max(1);
        let Some(prediction) = linear_prediction(&signal, order) else {
            log::debug!("Linear prediction failed for window of {} points", w);
            return Vec::new();
        };
        let coeffs: Vec<Complex64> = prediction.iter().map(|a| -a).collect();
        let poles: Vec<Complex64> = polynomial_roots(&coeffs)
            .into_iter()
            .filter(|z| z.re.is_finite() && z.im.is_finite() && z.norm() > 0.0 && z.norm() < 1.0)
            .collect();
        if poles.is_empty() {
            return Vec::new();
        }
        let amplitudes = pole_amplitudes(&signal, &poles);

        let mut candidates = Vec::with_capacity(poles.len());
        for (j, z) in poles.iter().enumerate() {
            let frequency = n as f64 * (PI - z.arg()) / (2.0 * PI);
            let raw_decay = -z.norm().ln() * n as f64 / PI * self.damping_scale;
            if !frequency.is_finite() || !raw_decay.is_finite() {
                continue;
            }
            if frequency < 0.0 || frequency >= w as f64 {
                continue;
            }
            if raw_decay > self.max_width {
                continue;
            }
            let decay = raw_decay.max(self.min_width);
            let amplitude = amplitudes.as_ref().map_or(0.0, |a| a[j].norm());
            let candidate = Candidate {
                frequency,
                decay,
                amplitude,
            };
            // Without a pole-amplitude estimate every candidate is kept
            if amplitudes.is_none() || candidate.height() >= threshold {
                candidates.push(candidate);
            }
        }
        candidates.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        candidates
    }
}

/// Candidates for `window` with the default damping scale and width limits.
pub fn generate(window: &[f64], transform_size: usize, coefficient_count: usize, threshold: f64) -> Vec<Candidate> {
    let defaults = FitConfig::default();
    let max_width = transform_size.max(window.len()) as f64 / 2.0;
    CandidateGenerator::new(
        transform_size.max(window.len()),
        coefficient_count,
        defaults.damping_scale,
        defaults.min_width.min(max_width),
        max_width,
    )
    .generate(window, threshold)
}

/// Forward prediction coefficients `a` with `y[t] ≈ Σ a[k]·y[t-1-k]`.
fn linear_prediction(y: &[Complex64], order: usize) -> Option<Vec<Complex64>> {
    let m = y.len();
    if m <= order {
        return None;
    }
    let p = order;
    let mut normal = vec![Complex64::new(0.0, 0.0); p * p];
    let mut rhs = vec![Complex64::new(0.0, 0.0); p];
    for t in p..m {
        for i in 0..p {
            let yi = y[t - 1 - i].conj();
            rhs[i] += yi * y[t];
            for k in 0..p {
                normal[i * p + k] += yi * y[t - 1 - k];
            }
        }
    }
    regularize(&mut normal, p);
    solve_complex(normal, p, rhs)
}

/// Least-squares complex amplitudes `c` with `y[t] ≈ Σ c[j]·z[j]^t`.
fn pole_amplitudes(y: &[Complex64], poles: &[Complex64]) -> Option<Vec<Complex64>> {
    let k = poles.len();
    let mut normal = vec![Complex64::new(0.0, 0.0); k * k];
    let mut rhs = vec![Complex64::new(0.0, 0.0); k];
    let mut powers = vec![Complex64::new(1.0, 0.0); k];
    for &yt in y {
        for i in 0..k {
            let vi = powers[i].conj();
            rhs[i] += vi * yt;
            for j in 0..k {
                normal[i * k + j] += vi * powers[j];
            }
        }
        for (p, z) in powers.iter_mut().zip(poles) {
            *p *= *z;
        }
    }
    regularize(&mut normal, k);
    solve_complex(normal, k, rhs)
}

fn regularize(normal: &mut [Complex64], n: usize) {
    let trace: f64 = (0..n).map(|i| normal[i * n + i].re).sum();
    let ridge = REGULARIZATION * trace / n.max(1) as f64;
    for i in 0..n {
        normal[i * n + i] += ridge;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lineshape::LineShape;

    fn lorentzians(lines: &[(f64, f64, f64)], n: usize) -> Vec<f64> {
        let shapes: Vec<(LineShape, f64)> = lines
            .iter()
            .map(|&(f, d, a)| (LineShape::new(f, d).unwrap(), a))
            .collect();
        (0..n)
            .map(|x| shapes.iter().map(|(s, a)| a * s.value(x as f64)).sum())
            .collect()
    }

    fn nearest(candidates: &[Candidate], f: f64) -> Candidate {
        *candidates
            .iter()
            .min_by(|a, b| (a.frequency - f).abs().total_cmp(&(b.frequency - f).abs()))
            .unwrap()
    }

    #[test]
    fn test_single_line_found() {
        let window = lorentzians(&[(50.0, 20.0, 1.0)], 256);
        let gen = CandidateGenerator::new(256, 20, 1.0, 1.0, 128.0);
        let candidates = gen.generate(&window, 0.0);
        assert!(!candidates.is_empty());
        let c = nearest(&candidates, 50.0);
        assert!((c.frequency - 50.0).abs() < 2.0, "{:?}", candidates);
        assert!(c.decay > 10.0 && c.decay < 30.0, "{:?}", c);
    }

    #[test]
    fn test_damping_scale_applied() {
        let window = lorentzians(&[(80.0, 12.0, 2.0)], 256);
        let plain = CandidateGenerator::new(256, 20, 1.0, 0.5, 128.0).generate(&window, 0.0);
        let damped = CandidateGenerator::new(256, 20, 0.8, 0.5, 128.0).generate(&window, 0.0);
        let a = nearest(&plain, 80.0);
        let b = nearest(&damped, 80.0);
        assert!((b.decay - 0.8 * a.decay).abs() < 1e-6 * a.decay.max(1.0));
    }

    #[test]
    fn test_candidates_are_valid() {
        let window = lorentzians(&[(30.0, 6.0, 1.0), (64.0, 4.0, 0.5), (100.0, 10.0, 2.0)], 128);
        let gen = CandidateGenerator::new(128, 20, 0.8, 2.0, 64.0);
        let candidates = gen.generate(&window, 0.0);
        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(c.frequency.is_finite() && c.frequency >= 0.0 && c.frequency < 128.0);
            assert!(c.decay >= 2.0 && c.decay <= 64.0);
        }
        assert!(candidates.windows(2).all(|p| p[0].frequency <= p[1].frequency));
    }

    #[test]
    fn test_threshold_drops_weak_candidates() {
        let window = lorentzians(&[(40.0, 8.0, 1.0)], 128);
        let gen = CandidateGenerator::new(128, 12, 0.8, 2.0, 64.0);
        let all = gen.generate(&window, 0.0);
        let strong = gen.generate(&window, 0.02);
        assert!(strong.len() <= all.len());
        assert!(strong.iter().all(|c| c.height() >= 0.02));
        // True line height is 2/(π·8) ≈ 0.08
        assert!(strong.iter().any(|c| (c.frequency - 40.0).abs() < 2.0));
    }

    #[test]
    fn test_zero_window_has_no_candidates() {
        let gen = CandidateGenerator::new(64, 8, 0.8, 2.0, 32.0);
        assert!(gen.generate(&[0.0; 64], 0.0).is_empty());
    }

    #[test]
    fn test_zero_filled_transform() {
        let window = lorentzians(&[(20.0, 6.0, 1.0)], 64);
        let candidates = generate(&window, 128, 10, 0.0);
        let c = nearest(&candidates, 20.0);
        assert!((c.frequency - 20.0).abs() < 2.0, "{:?}", candidates);
        assert!(candidates.iter().all(|c| c.frequency < 64.0));
    }
}
