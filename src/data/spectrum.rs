use serde::{Deserialize, Serialize};

/// Read-only view of a 1D sample vector, as consumed by the window scanner.
///
/// Implementors own the data; the scanner only borrows windows of it.
pub trait SampleVector {
    /// Real value at `index` (0 <= index < len)
    fn real(&self, index: usize) -> f64;

    /// Number of points
    fn len(&self) -> usize;

    /// Map a (fractional) point position to ppm
    fn point_to_ppm(&self, point: f64) -> f64;

    /// Spectral width in Hz
    fn spectral_width(&self) -> f64;

    /// Inverse of [`SampleVector::point_to_ppm`] for affine mappings
    fn ppm_to_point(&self, ppm: f64) -> f64 {
        let p0 = self.point_to_ppm(0.0);
        let p1 = self.point_to_ppm(1.0);
        let slope = p1 - p0;
        if slope == 0.0 {
            return 0.0;
        }
        (ppm - p0) / slope
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Axis parameters for a spectral dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisParams {
    pub spectral_width_hz: f64,
    pub observe_freq_mhz: f64,
    pub reference_ppm: f64,
    pub label: String,
}

impl Default for AxisParams {
    fn default() -> Self {
        Self {
            spectral_width_hz: 0.0,
            observe_freq_mhz: 400.0,
            reference_ppm: 0.0,
            label: String::new(),
        }
    }
}

impl AxisParams {
    /// Convert a fractional point position to ppm for an axis of `num_points`.
    pub fn point_to_ppm(&self, point: f64, num_points: usize) -> f64 {
        if num_points == 0 || self.observe_freq_mhz == 0.0 {
            return 0.0;
        }
        let sw_ppm = self.spectral_width_hz / self.observe_freq_mhz;
        let frac = point / num_points as f64;
        // NMRPipe convention: reference_ppm is the ppm of the first point (index 0).
        // Spectrum runs from reference_ppm down to (reference_ppm - sw_ppm).
        self.reference_ppm - frac * sw_ppm
    }
}

/// A frequency-domain spectrum row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpectrumVector {
    pub axis: AxisParams,
    pub real: Vec<f64>,
    /// Imaginary part, if the source provided one (unused by the fit)
    #[serde(default)]
    pub imag: Vec<f64>,
}

impl SpectrumVector {
    pub fn new(real: Vec<f64>, axis: AxisParams) -> Self {
        Self {
            axis,
            real,
            imag: Vec::new(),
        }
    }
}

impl SampleVector for SpectrumVector {
    fn real(&self, index: usize) -> f64 {
        self.real[index]
    }

    fn len(&self) -> usize {
        self.real.len()
    }

    fn point_to_ppm(&self, point: f64) -> f64 {
        self.axis.point_to_ppm(point, self.real.len())
    }

    fn spectral_width(&self) -> f64 {
        self.axis.spectral_width_hz
    }
}

impl SampleVector for [f64] {
    fn real(&self, index: usize) -> f64 {
        self[index]
    }

    fn len(&self) -> usize {
        <[f64]>::len(self)
    }

    /// Bare slices have no axis: ppm is the point position itself
    fn point_to_ppm(&self, point: f64) -> f64 {
        point
    }

    /// Bare slices report one Hz per point
    fn spectral_width(&self) -> f64 {
        <[f64]>::len(self) as f64
    }
}
