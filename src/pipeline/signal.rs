use serde::{Deserialize, Serialize};

use super::lineshape::peak_height;
use crate::data::SampleVector;

/// A fitted line in point units of the scanned vector (or of a window,
/// before the window origin is added).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalInPoints {
    /// Line area
    pub amplitude: f64,
    pub phase: f64,
    /// Centre position in points
    pub frequency: f64,
    /// Full linewidth in points
    pub decay: f64,
}

impl SignalInPoints {
    pub fn new(amplitude: f64, frequency: f64, decay: f64) -> Self {
        Self {
            amplitude,
            phase: 0.0,
            frequency,
            decay,
        }
    }

    /// Peak height, `amplitude/(π·decay)·2`
    pub fn height(&self) -> f64 {
        peak_height(self.amplitude, self.decay)
    }

    /// Same signal shifted by `offset` points.
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            frequency: self.frequency + offset,
            ..*self
        }
    }

    /// Convert to ppm / Hz using the axis of `vector`.
    ///
    /// The frequency must already be relative to the start of `vector`.
    pub fn to_spectral<V: SampleVector + ?Sized>(&self, vector: &V) -> SignalInSpectralUnits {
        let size = vector.len().max(1) as f64;
        SignalInSpectralUnits {
            amplitude: self.amplitude,
            phase: self.phase,
            frequency_ppm: vector.point_to_ppm(self.frequency),
            decay_hz: self.decay / size * vector.spectral_width(),
            height: self.height(),
        }
    }
}

/// A fitted line in spectral units, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalInSpectralUnits {
    pub amplitude: f64,
    pub phase: f64,
    pub frequency_ppm: f64,
    /// Full linewidth in Hz
    pub decay_hz: f64,
    /// Peak height in sample units
    pub height: f64,
}

impl SignalInSpectralUnits {
    pub fn height(&self) -> f64 {
        self.height
    }
}
