// Windowed Lorentzian line fitting.
//
// Per window: candidates → greedy pruning → refine → merge → refine,
// then the scanner keeps the signals that fall in the window core.

pub mod batch;
pub mod candidates;
pub mod design;
pub mod linalg;
pub mod lineshape;
pub mod merge;
pub mod nnls;
pub mod optimize;
pub mod prune;
pub mod refine;
pub mod scanner;
pub mod signal;
pub mod width;

pub use batch::{find_signals_rows, scan_rows};
pub use candidates::{Candidate, CandidateGenerator};
pub use design::DesignMatrix;
pub use lineshape::{evaluate, peak_height, LineShape};
pub use merge::{filter_by_height, filter_signals};
pub use nnls::FitResult;
pub use optimize::{Minimum, Termination};
pub use prune::{prune, PruneOptions, PruneOutcome};
pub use refine::{refine, RefineOptions, Refinement};
pub use scanner::{plan_windows, ScanOutcome, WindowDescriptor, WindowScanner};
pub use signal::{SignalInPoints, SignalInSpectralUnits};
pub use width::optimize_width;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FitConfig;
    use crate::data::{AxisParams, SampleVector, SpectrumVector};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    /// Sum of Lorentzians `(frequency, decay, area)` plus seeded Gaussian noise.
    fn synthetic(lines: &[(f64, f64, f64)], len: usize, sigma: f64, seed: u64) -> Vec<f64> {
        let shapes: Vec<(LineShape, f64)> = lines
            .iter()
            .map(|&(f, d, a)| (LineShape::new(f, d).unwrap(), a))
            .collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, sigma).unwrap();
        (0..len)
            .map(|x| {
                let clean: f64 = shapes.iter().map(|(s, a)| a * s.value(x as f64)).sum();
                clean + noise.sample(&mut rng)
            })
            .collect()
    }

    fn nearest(signals: &[SignalInPoints], frequency: f64) -> SignalInPoints {
        *signals
            .iter()
            .min_by(|a, b| (a.frequency - frequency).abs().total_cmp(&(b.frequency - frequency).abs()))
            .expect("no signals found")
    }

    #[test]
    fn test_single_line_round_trip() {
        let data = synthetic(&[(50.0, 20.0, 1.0)], 256, 1e-4, 17);
        let scanner = WindowScanner::new(FitConfig {
            window_size: 256,
            threshold: 0.005,
            ..Default::default()
        });
        let outcome = scanner.scan_points(data.as_slice()).unwrap();
        let s = nearest(&outcome.signals, 50.0);
        assert!((s.frequency - 50.0).abs() <= 1.0, "{:?}", outcome.signals);
        assert!((s.decay - 20.0).abs() <= 4.0, "{:?}", s);
        assert!((s.amplitude - 1.0).abs() <= 0.2, "{:?}", s);
    }

    #[test]
    fn test_single_line_with_stronger_noise() {
        // Height ≈ 0.032 against σ = 1e-3. The second refine may leave the
        // line split into two or three neighbours; their total area and
        // centre must still match the true line
        let scanner = WindowScanner::new(FitConfig {
            window_size: 256,
            threshold: 0.005,
            ..Default::default()
        });
        for seed in [3, 11, 29] {
            let data = synthetic(&[(50.0, 20.0, 1.0)], 256, 1e-3, seed);
            let outcome = scanner.scan_points(data.as_slice()).unwrap();
            let near: Vec<SignalInPoints> = outcome
                .signals
                .iter()
                .copied()
                .filter(|s| (s.frequency - 50.0).abs() <= 20.0)
                .collect();
            assert!(!near.is_empty() && near.len() <= 3, "seed {}: {:?}", seed, outcome.signals);
            let area: f64 = near.iter().map(|s| s.amplitude).sum();
            let centre = near.iter().map(|s| s.amplitude * s.frequency).sum::<f64>() / area;
            assert!((area - 1.0).abs() <= 0.2, "seed {}: {:?}", seed, near);
            assert!((centre - 50.0).abs() <= 2.0, "seed {}: {:?}", seed, near);
        }
    }

    #[test]
    fn test_two_line_scenario() {
        let data = synthetic(&[(100.0, 15.0, 30.0), (160.0, 15.0, 10.0)], 512, 0.01, 42);
        let scanner = WindowScanner::new(FitConfig {
            window_size: 256,
            threshold: 0.05,
            min_width: 2.0,
            ..Default::default()
        });
        let outcome = scanner.scan_points(data.as_slice()).unwrap();
        assert_eq!(outcome.signals.len(), 2, "{:?}", outcome.signals);
        let mut found = outcome.signals.clone();
        found.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        for (s, expect) in found.iter().zip([100.0, 160.0]) {
            assert!((s.frequency - expect).abs() <= 2.0, "{:?}", found);
            assert!((s.decay - 15.0).abs() <= 0.25 * 15.0, "{:?}", found);
        }
        assert!(found[0].amplitude > 2.0 * found[1].amplitude);
    }

    #[test]
    fn test_scan_windows_tile_vector() {
        let data = synthetic(&[(60.0, 6.0, 2.0), (200.0, 8.0, 3.0), (330.0, 5.0, 1.0)], 400, 1e-3, 5);
        let scanner = WindowScanner::new(FitConfig {
            window_size: 64,
            threshold: 0.02,
            ..Default::default()
        });
        let outcome = scanner.scan_points(data.as_slice()).unwrap();
        let cores: Vec<_> = outcome.windows.iter().map(|w| w.acceptance.clone()).collect();
        assert_eq!(cores[0].start, 0);
        assert_eq!(cores.last().unwrap().end, 400);
        for pair in cores.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        // Every reported signal lies in exactly one core
        for s in &outcome.signals {
            let hits = cores
                .iter()
                .filter(|c| s.frequency >= c.start as f64 && s.frequency < c.end as f64)
                .count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn test_find_signals_spectral_units() {
        let real = synthetic(&[(300.0, 10.0, 5.0)], 1024, 1e-4, 9);
        let axis = AxisParams {
            spectral_width_hz: 5000.0,
            observe_freq_mhz: 500.0,
            reference_ppm: 10.0,
            label: "1H".to_string(),
        };
        let vector = SpectrumVector::new(real, axis);
        let scanner = WindowScanner::new(FitConfig {
            window_size: 256,
            threshold: 0.05,
            ..Default::default()
        });
        let signals = scanner.find_signals(&vector).unwrap();
        let expected_ppm = vector.point_to_ppm(300.0);
        let s = signals
            .iter()
            .min_by(|a, b| {
                (a.frequency_ppm - expected_ppm)
                    .abs()
                    .total_cmp(&(b.frequency_ppm - expected_ppm).abs())
            })
            .expect("no signals found");
        // One point is 0.01 ppm here
        assert!((s.frequency_ppm - expected_ppm).abs() < 0.01, "{:?}", signals);
        let expected_hz = 10.0 / 1024.0 * 5000.0;
        assert!((s.decay_hz - expected_hz).abs() < 0.2 * expected_hz, "{:?}", s);
    }
}
