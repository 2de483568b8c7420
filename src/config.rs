/// Fitting configuration
///
/// Every tunable of the window scan lives here, including the empirical
/// constants (candidate damping scale, merge proximity) so they can be
/// validated against real spectra without recompiling.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::FitError;

/// Smallest window that can host the candidate transform.
pub const MIN_WINDOW_SIZE: usize = 8;

/// How signal amplitudes are solved during refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmplitudeMode {
    /// Amplitudes constrained to be >= 0 (absorption spectra)
    NonNegative,
    /// Plain least squares, amplitudes may go negative
    Unconstrained,
}

impl std::fmt::Display for AmplitudeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmplitudeMode::NonNegative => write!(f, "non-negative"),
            AmplitudeMode::Unconstrained => write!(f, "unconstrained"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Scan window size in points
    pub window_size: usize,
    /// Candidate transform length (None = window size)
    pub transform_size: Option<usize>,
    /// Minimum peak height for a signal to be reported
    pub threshold: f64,
    /// Minimum linewidth in points
    pub min_width: f64,
    /// Maximum linewidth in points (None = half the window)
    pub max_width: Option<f64>,
    /// Non-baseline regions as inclusive point ranges (empty = whole vector)
    pub regions: Vec<(usize, usize)>,
    /// Merge proximity factor, in units of the pair's average width
    pub proximity_factor: f64,
    /// Fit a single shared width for all signals of a window
    pub constrain_width: bool,
    /// Refiner evaluations per free parameter
    pub step_multiplier: usize,
    /// Refiner convergence radius in points
    pub stop_radius: f64,
    /// Number of transform coefficients (linear-prediction order)
    pub n_coefficients: usize,
    /// Empirical damping factor applied to candidate widths
    pub damping_scale: f64,
    /// Candidate height cutoff as a fraction of `threshold`
    pub candidate_fraction: f64,
    /// Search radius for nudging a window's right limit (None = W/16)
    pub limit_range: Option<usize>,
    pub amplitude_mode: AmplitudeMode,
    /// Evaluation cap for the shared line-width search
    pub width_evaluations: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            window_size: 256,
            transform_size: None,
            threshold: 0.0,
            min_width: 2.0,
            max_width: None,
            regions: Vec::new(),
            proximity_factor: 1.0,
            constrain_width: false,
            step_multiplier: 200,
            stop_radius: 1.0e-3,
            n_coefficients: 20,
            damping_scale: 0.8,
            candidate_fraction: 0.25,
            limit_range: None,
            amplitude_mode: AmplitudeMode::NonNegative,
            width_evaluations: 60,
        }
    }
}

impl FitConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, FitError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    pub fn transform_size(&self) -> usize {
        self.transform_size.unwrap_or(self.window_size)
    }

    pub fn max_width(&self) -> f64 {
        self.max_width
            .unwrap_or(self.window_size as f64 / 2.0)
    }

    pub fn limit_range(&self) -> usize {
        self.limit_range
            .unwrap_or((self.window_size / 16).max(1))
    }

    /// Height cutoff handed to the candidate generator
    pub fn candidate_threshold(&self) -> f64 {
        self.threshold * self.candidate_fraction
    }

    /// Check the configuration against a vector of `len` points.
    pub fn validate(&self, len: usize) -> Result<(), FitError> {
        let w = self.window_size;
        if w < MIN_WINDOW_SIZE || w > len {
            return Err(FitError::InvalidWindowSize { size: w, len });
        }
        if self.transform_size() < w {
            return Err(FitError::InvalidArgument(format!(
                "transform size {} is smaller than window size {}",
                self.transform_size(),
                w
            )));
        }
        if !(self.min_width.is_finite() && self.min_width > 0.0) {
            return Err(FitError::InvalidArgument(format!(
                "min_width must be positive, got {}",
                self.min_width
            )));
        }
        let max_width = self.max_width();
        if !max_width.is_finite() || max_width < self.min_width {
            return Err(FitError::InvalidArgument(format!(
                "max_width {} is below min_width {}",
                max_width, self.min_width
            )));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(FitError::InvalidArgument(format!(
                "threshold must be >= 0, got {}",
                self.threshold
            )));
        }
        if !(self.proximity_factor.is_finite() && self.proximity_factor >= 0.0) {
            return Err(FitError::InvalidArgument(format!(
                "proximity_factor must be >= 0, got {}",
                self.proximity_factor
            )));
        }
        if !(self.damping_scale.is_finite() && self.damping_scale > 0.0) {
            return Err(FitError::InvalidArgument(format!(
                "damping_scale must be positive, got {}",
                self.damping_scale
            )));
        }
        if !(self.stop_radius.is_finite() && self.stop_radius > 0.0) {
            return Err(FitError::InvalidArgument(format!(
                "stop_radius must be positive, got {}",
                self.stop_radius
            )));
        }
        if self.n_coefficients == 0 {
            return Err(FitError::InvalidArgument(
                "n_coefficients must be at least 1".to_string(),
            ));
        }
        if self.limit_range() >= w / 4 {
            return Err(FitError::InvalidArgument(format!(
                "limit_range {} must be below a quarter of the window ({})",
                self.limit_range(),
                w / 4
            )));
        }
        for &(lo, hi) in &self.regions {
            if lo > hi {
                return Err(FitError::InvalidArgument(format!(
                    "region {}:{} has start after end",
                    lo, hi
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = FitConfig::default();
        assert!(cfg.validate(1024).is_ok());
        assert_eq!(cfg.transform_size(), 256);
        assert_eq!(cfg.max_width(), 128.0);
        assert_eq!(cfg.limit_range(), 16);
    }

    #[test]
    fn test_window_larger_than_vector() {
        let cfg = FitConfig::default();
        match cfg.validate(100) {
            Err(FitError::InvalidWindowSize { size, len }) => {
                assert_eq!(size, 256);
                assert_eq!(len, 100);
            }
            other => panic!("expected InvalidWindowSize, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_values_rejected() {
        let cfg = FitConfig {
            min_width: 0.0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(1024), Err(FitError::InvalidArgument(_))));

        let cfg = FitConfig {
            transform_size: Some(128),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(1024), Err(FitError::InvalidArgument(_))));

        let cfg = FitConfig {
            regions: vec![(300, 200)],
            ..Default::default()
        };
        assert!(matches!(cfg.validate(1024), Err(FitError::InvalidArgument(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: FitConfig =
            serde_json::from_str(r#"{"window_size": 128, "threshold": 0.5}"#).unwrap();
        assert_eq!(cfg.window_size, 128);
        assert_eq!(cfg.threshold, 0.5);
        assert_eq!(cfg.min_width, 2.0);
        assert_eq!(cfg.amplitude_mode, AmplitudeMode::NonNegative);
    }
}
