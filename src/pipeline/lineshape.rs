/// Lorentzian line shape in point units
///
/// A signal with frequency `f` and decay (full linewidth) `d`, both in
/// points, contributes a unit-area absorption Lorentzian
///
/// ```text
///   L(x; f, d) = (d/2) / (π·((x - f)² + (d/2)²))
/// ```
///
/// to the spectrum. Its peak height is `2/(π·d)`, so a signal of
/// amplitude (area) `A` has height `A·2/(π·d)`.

use std::f64::consts::PI;

use crate::error::FitError;

/// Validated line shape: finite frequency, strictly positive decay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineShape {
    frequency: f64,
    decay: f64,
}

impl LineShape {
    pub fn new(frequency: f64, decay: f64) -> Result<Self, FitError> {
        if !frequency.is_finite() {
            return Err(FitError::InvalidArgument(format!(
                "line shape frequency must be finite, got {}",
                frequency
            )));
        }
        if !(decay.is_finite() && decay > 0.0) {
            return Err(FitError::InvalidArgument(format!(
                "line shape decay must be > 0, got {}",
                decay
            )));
        }
        Ok(Self { frequency, decay })
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Value at a (fractional) point position
    #[inline]
    pub fn value(&self, x: f64) -> f64 {
        lorentzian(x, self.frequency, self.decay)
    }

    /// Peak height of this shape scaled by `amplitude`
    pub fn height(&self, amplitude: f64) -> f64 {
        peak_height(amplitude, self.decay)
    }
}

/// Basis value at `sample_index` for a line of the given decay and frequency.
///
/// Callers must pass `decay > 0`; [`LineShape::new`] is the checked entry point.
#[inline]
pub fn evaluate(sample_index: usize, decay: f64, frequency: f64) -> f64 {
    debug_assert!(decay > 0.0, "decay must be positive");
    lorentzian(sample_index as f64, frequency, decay)
}

#[inline]
fn lorentzian(x: f64, frequency: f64, decay: f64) -> f64 {
    let hw = 0.5 * decay;
    let dx = x - frequency;
    hw / (PI * (dx * dx + hw * hw))
}

/// Peak height of a line with the given amplitude (area) and decay.
#[inline]
pub fn peak_height(amplitude: f64, decay: f64) -> f64 {
    amplitude / (PI * decay) * 2.0
}

/// Amplitude (area) giving a line of the given height and decay.
#[inline]
pub fn amplitude_for_height(height: f64, decay: f64) -> f64 {
    height * PI * decay / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_peak_value_matches_height() {
        let shape = LineShape::new(50.0, 20.0).unwrap();
        assert_relative_eq!(shape.value(50.0), shape.height(1.0), epsilon = 1e-15);
        assert_relative_eq!(shape.height(1.0), 2.0 / (PI * 20.0));
    }

    #[test]
    fn test_half_height_at_half_width() {
        let shape = LineShape::new(10.0, 4.0).unwrap();
        assert_relative_eq!(shape.value(12.0), shape.value(10.0) / 2.0, epsilon = 1e-15);
        assert_relative_eq!(shape.value(8.0), shape.value(10.0) / 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_unit_area() {
        // Broad sampling range so the tails contribute little
        let shape = LineShape::new(0.0, 1.0).unwrap();
        let area: f64 = (-200_000..=200_000).map(|i| shape.value(i as f64 * 0.01) * 0.01).sum();
        // Tails beyond ±2000 hold about 1.6e-4 of the area
        assert_relative_eq!(area, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rejects_bad_decay() {
        assert!(LineShape::new(1.0, 0.0).is_err());
        assert!(LineShape::new(1.0, -3.0).is_err());
        assert!(LineShape::new(1.0, f64::NAN).is_err());
        assert!(LineShape::new(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_evaluate_stable_far_from_center() {
        let v = evaluate(4000, 1.0e4, 10.0);
        assert!(v.is_finite() && v > 0.0);
        let v = evaluate(4000, 1.0, 10.0);
        assert!(v.is_finite() && v > 0.0);
    }

    #[test]
    fn test_amplitude_height_inverse() {
        let a = amplitude_for_height(0.7, 12.0);
        assert_relative_eq!(peak_height(a, 12.0), 0.7, epsilon = 1e-12);
    }
}
