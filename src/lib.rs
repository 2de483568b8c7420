//! Parametric line fitting for 1D NMR spectra.
//!
//! A spectrum row is scanned with half-overlapping windows; each window is
//! decomposed into Lorentzian signals (frequency, linewidth, area) and the
//! signals in the window core are collected.

pub mod config;
pub mod data;
pub mod error;
pub mod log;
pub mod pipeline;

pub use config::{AmplitudeMode, FitConfig};
pub use data::{AxisParams, SampleVector, SpectrumVector};
pub use error::FitError;
pub use pipeline::{ScanOutcome, SignalInPoints, SignalInSpectralUnits, WindowDescriptor, WindowScanner};
