/// Input readers for the command-line front end
///
/// Two layouts are accepted: a JSON spectrum document, or a headerless
/// stream of little-endian f32 samples with axis parameters supplied
/// separately.

use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::spectrum::{AxisParams, SpectrumVector};
use crate::error::FitError;

/// On-disk JSON layout of a 1D spectrum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumDocument {
    pub real: Vec<f64>,
    #[serde(default)]
    pub imag: Vec<f64>,
    pub sw_hz: f64,
    #[serde(default = "default_obs")]
    pub obs_mhz: f64,
    #[serde(default)]
    pub ref_ppm: f64,
    #[serde(default)]
    pub label: String,
}

fn default_obs() -> f64 {
    400.0
}

impl From<SpectrumDocument> for SpectrumVector {
    fn from(doc: SpectrumDocument) -> Self {
        SpectrumVector {
            axis: AxisParams {
                spectral_width_hz: doc.sw_hz,
                observe_freq_mhz: doc.obs_mhz,
                reference_ppm: doc.ref_ppm,
                label: doc.label,
            },
            real: doc.real,
            imag: doc.imag,
        }
    }
}

/// Parse a JSON spectrum document from a string.
pub fn parse_json_spectrum(text: &str) -> Result<SpectrumVector, FitError> {
    let doc: SpectrumDocument = serde_json::from_str(text)?;
    if doc.real.is_empty() {
        return Err(FitError::InvalidArgument(
            "spectrum document has no real samples".to_string(),
        ));
    }
    Ok(doc.into())
}

/// Load a JSON spectrum document from a file.
pub fn load_json_spectrum(path: &Path) -> Result<SpectrumVector, FitError> {
    let text = std::fs::read_to_string(path)?;
    parse_json_spectrum(&text)
}

/// Read little-endian f32 samples until end of stream.
pub fn read_f32_samples<R: Read>(reader: &mut R) -> Result<Vec<f64>, FitError> {
    let mut out = Vec::new();
    loop {
        match reader.read_f32::<LittleEndian>() {
            Ok(v) => out.push(v as f64),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(out)
}

/// Load a headerless little-endian f32 file as a spectrum row.
pub fn load_raw_f32(path: &Path, axis: AxisParams) -> Result<SpectrumVector, FitError> {
    let len = std::fs::metadata(path)?.len();
    if len % 4 != 0 {
        return Err(FitError::InvalidArgument(format!(
            "{}: size {} is not a multiple of 4 bytes",
            path.display(),
            len
        )));
    }
    let mut reader = BufReader::new(File::open(path)?);
    let real = read_f32_samples(&mut reader)?;
    log::debug!("Read {} raw f32 samples from {}", real.len(), path.display());
    Ok(SpectrumVector::new(real, axis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    #[test]
    fn test_parse_json_document() {
        let text = r#"{"real": [0.0, 1.0, 0.5], "sw_hz": 6000.0, "ref_ppm": 10.0}"#;
        let spec = parse_json_spectrum(text).unwrap();
        assert_eq!(spec.real, vec![0.0, 1.0, 0.5]);
        assert_eq!(spec.axis.spectral_width_hz, 6000.0);
        assert_eq!(spec.axis.observe_freq_mhz, 400.0);
        assert_eq!(spec.axis.reference_ppm, 10.0);
    }

    #[test]
    fn test_empty_document_rejected() {
        let text = r#"{"real": [], "sw_hz": 6000.0}"#;
        assert!(matches!(
            parse_json_spectrum(text),
            Err(FitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_read_f32_samples() {
        let mut buf = Vec::new();
        for v in [1.5f32, -2.0, 0.25] {
            buf.write_f32::<LittleEndian>(v).unwrap();
        }
        let samples = read_f32_samples(&mut Cursor::new(buf)).unwrap();
        assert_eq!(samples, vec![1.5, -2.0, 0.25]);
    }
}
