/// Window scanner
///
/// Slides a window of W points across each non-baseline region in steps
/// of W/2. Window k starts W/4 before its region (zero-filled where it
/// hangs off the vector) and accepts signals only inside its core
/// `[left_lim, right_lim)`. `right_lim` sits near the 3/4 point of the
/// window, moved to the lowest sample within `limit_range` so that a
/// line is not split between two cores. The next core starts where the
/// previous one ended, and the last core of a region ends at the region
/// end, so the cores tile every region without gaps.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::candidates::CandidateGenerator;
use super::merge::filter_signals;
use super::prune::{prune, PruneOptions};
use super::refine::{refine, RefineOptions};
use super::signal::{SignalInPoints, SignalInSpectralUnits};
use crate::config::FitConfig;
use crate::data::SampleVector;
use crate::error::FitError;

/// Accepted signals closer than this to the previous one are duplicates
const DUPLICATE_DISTANCE: f64 = 1.0;

/// One scan step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    /// First vector index copied into the window
    pub start: usize,
    /// Window size W
    pub size: usize,
    /// Zeros before the copied samples
    pub left_pad: usize,
    /// Zeros after the copied samples
    pub right_pad: usize,
    /// Vector indices whose signals this window may report
    pub acceptance: Range<usize>,
}

impl WindowDescriptor {
    /// Vector position of window row 0 (negative when left-padded)
    pub fn origin(&self) -> isize {
        self.start as isize - self.left_pad as isize
    }

    /// Number of real samples in the window
    pub fn usable(&self) -> usize {
        self.size - self.left_pad - self.right_pad
    }
}

/// Result of scanning one vector in point units.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Accepted signals, in scan order; frequencies are vector points
    pub signals: Vec<SignalInPoints>,
    pub windows: Vec<WindowDescriptor>,
}

/// Sort regions, clip them to `len` points and join overlapping ones.
/// Input pairs are inclusive; output ranges are half-open.
pub fn normalize_regions(regions: &[(usize, usize)], len: usize) -> Vec<Range<usize>> {
    if regions.is_empty() {
        return if len > 0 { vec![0..len] } else { Vec::new() };
    }
    let mut sorted: Vec<(usize, usize)> = regions.to_vec();
    sorted.sort();
    let mut out: Vec<Range<usize>> = Vec::new();
    for (lo, hi) in sorted {
        if lo >= len {
            log::warn!("Region {}:{} lies beyond the vector ({} points), skipped", lo, hi, len);
            continue;
        }
        if hi >= len {
            log::warn!("Region {}:{} clipped to {}:{}", lo, hi, lo, len - 1);
        }
        let range = lo..(hi + 1).min(len);
        match out.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => out.push(range),
        }
    }
    out
}

/// Plan every window of a scan.
///
/// Depends on the samples only through the right-limit nudge.
pub fn plan_windows<V: SampleVector + ?Sized>(vector: &V, config: &FitConfig) -> Vec<WindowDescriptor> {
    let len = vector.len();
    let w = config.window_size;
    let limit_range = config.limit_range();
    let mut windows = Vec::new();

    for region in normalize_regions(&config.regions, len) {
        let mut origin = region.start as isize - (w / 4) as isize;
        let mut left_lim = region.start;
        loop {
            let start = origin.max(0) as usize;
            let left_pad = (start as isize - origin) as usize;
            let end = ((origin + w as isize) as usize).min(len);
            let right_pad = w - left_pad - (end - start);

            let target = origin + (3 * w / 4) as isize;
            let last = target >= region.end as isize;
            let right_lim = if last {
                region.end
            } else {
                nudge_limit(vector, target as usize, limit_range, left_lim + 1, region.end.min(end))
            };

            windows.push(WindowDescriptor {
                start,
                size: w,
                left_pad,
                right_pad,
                acceptance: left_lim..right_lim,
            });
            if last {
                break;
            }
            left_lim = right_lim;
            origin += (w / 2) as isize;
        }
    }
    windows
}

/// Index of the smallest sample within `radius` of `target`, restricted to
/// `[lo, hi)`. Lowest index wins ties.
fn nudge_limit<V: SampleVector + ?Sized>(vector: &V, target: usize, radius: usize, lo: usize, hi: usize) -> usize {
    let from = target.saturating_sub(radius).max(lo);
    let to = (target + radius + 1).min(hi);
    if from >= to {
        return target.clamp(lo, hi.max(lo + 1) - 1);
    }
    let mut best = from;
    for i in from + 1..to {
        if vector.real(i) < vector.real(best) {
            best = i;
        }
    }
    best
}

/// Append the signals of one window that lie in `acceptance` and reach
/// `threshold`. `found` must be sorted by frequency. A signal within
/// [`DUPLICATE_DISTANCE`] points of the last accepted one is dropped.
fn accept_signals(
    found: Vec<SignalInPoints>,
    acceptance: &Range<usize>,
    threshold: f64,
    accepted: &mut Vec<SignalInPoints>,
) {
    for signal in found {
        let inside = signal.frequency >= acceptance.start as f64 && signal.frequency < acceptance.end as f64;
        if !inside || signal.height() < threshold {
            continue;
        }
        if let Some(previous) = accepted.last() {
            if (signal.frequency - previous.frequency).abs() < DUPLICATE_DISTANCE {
                continue;
            }
        }
        accepted.push(signal);
    }
}

/// Runs the per-window pipeline over a whole vector.
#[derive(Debug, Clone)]
pub struct WindowScanner {
    config: FitConfig,
}

impl WindowScanner {
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Scan `vector`, returning signals in vector points and the windows used.
    pub fn scan_points<V: SampleVector + ?Sized>(&self, vector: &V) -> Result<ScanOutcome, FitError> {
        let config = &self.config;
        config.validate(vector.len())?;

        let generator = CandidateGenerator::from_config(config);
        let prune_options = PruneOptions {
            threshold: config.threshold,
            constrain_width: config.constrain_width,
            width_interval: (config.min_width, config.max_width()),
            width_evaluations: config.width_evaluations,
        };

        let windows = plan_windows(vector, config);
        let mut signals: Vec<SignalInPoints> = Vec::new();
        for descriptor in &windows {
            let found = self.fit_window(vector, descriptor, &generator, &prune_options);
            accept_signals(found, &descriptor.acceptance, config.threshold, &mut signals);
        }

        log::info!(
            "Scanned {} points in {} windows of {}: {} signals",
            vector.len(),
            windows.len(),
            config.window_size,
            signals.len()
        );
        Ok(ScanOutcome { signals, windows })
    }

    /// Scan `vector` and report signals in ppm / Hz.
    pub fn find_signals<V: SampleVector + ?Sized>(&self, vector: &V) -> Result<Vec<SignalInSpectralUnits>, FitError> {
        let outcome = self.scan_points(vector)?;
        Ok(outcome.signals.iter().map(|s| s.to_spectral(vector)).collect())
    }

    /// Signals of one window, in vector points, sorted by frequency.
    fn fit_window<V: SampleVector + ?Sized>(
        &self,
        vector: &V,
        descriptor: &WindowDescriptor,
        generator: &CandidateGenerator,
        prune_options: &PruneOptions,
    ) -> Vec<SignalInPoints> {
        let config = &self.config;
        let w = descriptor.size;
        let mut window = vec![0.0; w];
        for (k, slot) in window[descriptor.left_pad..w - descriptor.right_pad].iter_mut().enumerate() {
            *slot = vector.real(descriptor.start + k);
        }
        let rows = descriptor.left_pad..w - descriptor.right_pad;

        let candidates = generator.generate(&window, config.candidate_threshold());
        let pruned = prune(&window, rows, &candidates, prune_options);
        let initial = pruned.signals();

        let refine_options = RefineOptions::from_config(config, descriptor.left_pad, descriptor.right_pad);
        let first = refine(&window, &initial, &refine_options);
        let merged = filter_signals(&first.signals, config.proximity_factor, config.threshold);
        let second = refine(&window, &merged, &refine_options);

        log::debug!(
            "Window at {}: {} candidates, {} pruning rounds, {} -> {} -> {} signals ({:?})",
            descriptor.origin(),
            candidates.len(),
            pruned.rounds,
            initial.len(),
            merged.len(),
            second.signals.len(),
            second.status
        );

        let origin = descriptor.origin() as f64;
        let mut found: Vec<SignalInPoints> = second.signals.iter().map(|s| s.shifted(origin)).collect();
        found.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(window_size: usize) -> FitConfig {
        FitConfig {
            window_size,
            ..Default::default()
        }
    }

    fn assert_tiles(windows: &[WindowDescriptor], region: Range<usize>) {
        let cores: Vec<&Range<usize>> = windows
            .iter()
            .map(|w| &w.acceptance)
            .filter(|a| a.start >= region.start && a.end <= region.end)
            .collect();
        assert!(!cores.is_empty());
        assert_eq!(cores[0].start, region.start);
        for pair in cores.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
        assert_eq!(cores[cores.len() - 1].end, region.end);
    }

    #[test]
    fn test_windows_cover_vector() {
        let data: Vec<f64> = (0..1000).map(|i| ((i as f64) * 0.05).sin()).collect();
        let windows = plan_windows(data.as_slice(), &config(64));
        assert_tiles(&windows, 0..1000);
        for w in &windows {
            assert_eq!(w.left_pad + w.usable() + w.right_pad, w.size);
            // Core lies inside the real samples of its window
            assert!(w.acceptance.start as isize >= w.origin());
            assert!((w.acceptance.end as isize) <= w.origin() + w.size as isize);
            assert!(w.acceptance.start >= w.start && w.acceptance.end <= w.start + w.usable());
        }
        assert!(windows[0].left_pad == 16);
        assert!(windows.last().unwrap().right_pad > 0);
    }

    #[test]
    fn test_half_window_advance() {
        let data = vec![1.0; 512];
        let windows = plan_windows(data.as_slice(), &config(128));
        for pair in windows.windows(2) {
            assert_eq!(pair[1].origin() - pair[0].origin(), 64);
        }
    }

    #[test]
    fn test_right_limit_nudged_to_minimum() {
        let mut data = vec![1.0; 256];
        // Window 0 has origin -16, so the unnudged right limit is 32
        data[35] = 0.2;
        let windows = plan_windows(data.as_slice(), &config(64));
        assert_eq!(windows[0].acceptance, 0..35);
        assert_eq!(windows[1].acceptance.start, 35);
    }

    #[test]
    fn test_regions_tiled_independently() {
        let data = vec![0.5; 600];
        let cfg = FitConfig {
            regions: vec![(300, 450), (40, 120)],
            ..config(64)
        };
        let windows = plan_windows(data.as_slice(), &cfg);
        assert_tiles(&windows, 40..121);
        assert_tiles(&windows, 300..451);
    }

    #[test]
    fn test_normalize_regions() {
        assert_eq!(normalize_regions(&[], 10), vec![0..10]);
        assert_eq!(normalize_regions(&[(5, 8), (0, 2), (7, 12)], 10), vec![0..3, 5..10]);
        assert!(normalize_regions(&[(20, 30)], 10).is_empty());
    }

    #[test]
    fn test_close_signals_accepted_once() {
        let line = |f: f64| SignalInPoints::new(1.0, f, 4.0);
        let mut accepted = Vec::new();
        accept_signals(vec![line(10.0), line(10.6)], &(0..64), 0.0, &mut accepted);
        assert_eq!(accepted, vec![line(10.0)]);

        accept_signals(vec![line(20.0), line(21.2)], &(0..64), 0.0, &mut accepted);
        assert_eq!(accepted, vec![line(10.0), line(20.0), line(21.2)]);
    }

    #[test]
    fn test_boundary_line_not_reported_twice() {
        let line = |f: f64| SignalInPoints::new(1.0, f, 4.0);
        let mut accepted = Vec::new();
        // The first core ends at 32; the next window refits the same line a
        // little to the right of the boundary
        accept_signals(vec![line(12.0), line(31.8)], &(0..32), 0.0, &mut accepted);
        accept_signals(vec![line(31.9), line(32.3), line(50.0)], &(32..64), 0.0, &mut accepted);
        let frequencies: Vec<f64> = accepted.iter().map(|s| s.frequency).collect();
        assert_eq!(frequencies, vec![12.0, 31.8, 50.0]);
    }

    #[test]
    fn test_accept_applies_core_and_threshold() {
        let mut accepted = Vec::new();
        let weak = SignalInPoints::new(0.01, 40.0, 4.0);
        let strong = SignalInPoints::new(2.0, 45.0, 4.0);
        let outside = SignalInPoints::new(2.0, 70.0, 4.0);
        accept_signals(vec![weak, strong, outside], &(32..64), 0.05, &mut accepted);
        assert_eq!(accepted, vec![strong]);
    }

    #[test]
    fn test_invalid_window_size() {
        let data = vec![0.0; 100];
        let scanner = WindowScanner::new(config(256));
        let err = scanner.scan_points(data.as_slice()).unwrap_err();
        assert_eq!(err.to_string(), "hsvd: invalid winSize 256 for vector of 100 points");
    }

    #[test]
    fn test_zero_vector_has_no_signals() {
        let data = vec![0.0; 300];
        let outcome = WindowScanner::new(config(64)).scan_points(data.as_slice()).unwrap();
        assert!(outcome.signals.is_empty());
        assert_tiles(&outcome.windows, 0..300);
    }
}
