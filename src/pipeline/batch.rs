/// Row-level batch scanning.
///
/// Rows of a 2D/3D dataset are independent, so each row gets its own scan.
/// With the `parallel` feature the rows are spread over the rayon pool.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::scanner::{ScanOutcome, WindowScanner};
use super::signal::SignalInSpectralUnits;
use crate::data::SampleVector;
use crate::error::FitError;

/// Scan every row; one result per row, in row order.
pub fn scan_rows<V>(scanner: &WindowScanner, rows: &[V]) -> Vec<Result<ScanOutcome, FitError>>
where
    V: SampleVector + Sync,
{
    log::debug!("Scanning {} rows", rows.len());
    #[cfg(feature = "parallel")]
    let results: Vec<_> = rows.par_iter().map(|row| scanner.scan_points(row)).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = rows.iter().map(|row| scanner.scan_points(row)).collect();
    results
}

/// Spectral-unit signals for every row.
pub fn find_signals_rows<V>(scanner: &WindowScanner, rows: &[V]) -> Vec<Result<Vec<SignalInSpectralUnits>, FitError>>
where
    V: SampleVector + Sync,
{
    #[cfg(feature = "parallel")]
    let results: Vec<_> = rows.par_iter().map(|row| scanner.find_signals(row)).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = rows.iter().map(|row| scanner.find_signals(row)).collect();
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FitConfig;
    use crate::data::{AxisParams, SpectrumVector};

    #[test]
    fn test_rows_keep_order_and_errors() {
        let scanner = WindowScanner::new(FitConfig {
            window_size: 64,
            ..Default::default()
        });
        let axis = AxisParams {
            spectral_width_hz: 1000.0,
            ..Default::default()
        };
        let rows = vec![
            SpectrumVector::new(vec![0.0; 200], axis.clone()),
            SpectrumVector::new(vec![0.0; 32], axis.clone()),
            SpectrumVector::new(vec![0.0; 128], axis),
        ];
        let results = scan_rows(&scanner, &rows);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(FitError::InvalidWindowSize { .. })));
        let last = results[2].as_ref().unwrap();
        assert_eq!(last.windows.last().unwrap().acceptance.end, 128);

        let spectral = find_signals_rows(&scanner, &rows);
        assert!(spectral[0].as_ref().unwrap().is_empty());
    }
}
