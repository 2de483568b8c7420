pub mod reader;
pub mod spectrum;

pub use spectrum::{AxisParams, SampleVector, SpectrumVector};
