//! nmr-signals: decompose a 1D NMR spectrum into Lorentzian signals.

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use nmr_signals::data::reader::{load_json_spectrum, load_raw_f32};
use nmr_signals::log::FitLog;
use nmr_signals::{AmplitudeMode, AxisParams, FitConfig, SignalInSpectralUnits, WindowScanner};

#[derive(Parser)]
#[command(
    name = "nmr-signals",
    version,
    about = "Find Lorentzian signals in a 1D NMR spectrum by windowed line fitting"
)]
struct Cli {
    /// Input spectrum: JSON document, or raw little-endian f32 with --raw-f32
    #[arg(short, long)]
    input: PathBuf,

    /// Input is headerless little-endian f32 samples
    #[arg(long, default_value_t = false)]
    raw_f32: bool,

    /// Spectral width in Hz (raw input)
    #[arg(long, default_value_t = 0.0)]
    sw: f64,

    /// Observe frequency in MHz (raw input)
    #[arg(long, default_value_t = 400.0)]
    obs: f64,

    /// ppm of the first point (raw input)
    #[arg(long, default_value_t = 0.0)]
    ref_ppm: f64,

    /// JSON fitting configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scan window size in points
    #[arg(long)]
    win_size: Option<usize>,

    /// Transform length for candidate generation
    #[arg(long)]
    transform_size: Option<usize>,

    /// Detection threshold (peak height)
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum linewidth in points
    #[arg(long)]
    min_width: Option<f64>,

    /// Maximum linewidth in points
    #[arg(long)]
    max_width: Option<f64>,

    /// Non-baseline region as start:end points, inclusive (repeatable)
    #[arg(long = "region", value_parser = parse_region)]
    regions: Vec<(usize, usize)>,

    /// Merge proximity factor
    #[arg(long)]
    proximity: Option<f64>,

    /// Fit a single shared linewidth per window
    #[arg(long, default_value_t = false)]
    constrain_width: bool,

    /// Allow negative amplitudes in refinement
    #[arg(long, default_value_t = false)]
    unconstrained: bool,

    /// Refiner evaluations per free parameter
    #[arg(long)]
    step_multiplier: Option<usize>,

    /// Refiner convergence radius in points
    #[arg(long)]
    stop_radius: Option<f64>,

    /// Linear-prediction order for candidate generation
    #[arg(long)]
    n_coefficients: Option<usize>,

    /// Empirical candidate damping scale
    #[arg(long)]
    damping_scale: Option<f64>,

    /// Output JSON file (or - for stdout)
    #[arg(short, long, default_value = "-")]
    out: String,

    /// Write the reproducibility log as text
    #[arg(long)]
    log_text: Option<PathBuf>,

    /// Write the reproducibility log as JSON
    #[arg(long)]
    log_json: Option<PathBuf>,

    /// Write a shell script that re-runs this fit
    #[arg(long)]
    log_script: Option<PathBuf>,
}

fn parse_region(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("region '{}' is not of the form start:end", s))?;
    let start = a.trim().parse::<usize>().map_err(|e| format!("region start '{}': {}", a, e))?;
    let end = b.trim().parse::<usize>().map_err(|e| format!("region end '{}': {}", b, e))?;
    Ok((start, end))
}

impl Cli {
    fn fit_config(&self) -> Result<FitConfig, nmr_signals::FitError> {
        let mut config = match &self.config {
            Some(path) => FitConfig::from_json_file(path)?,
            None => FitConfig::default(),
        };
        if let Some(v) = self.win_size {
            config.window_size = v;
        }
        if let Some(v) = self.transform_size {
            config.transform_size = Some(v);
        }
        if let Some(v) = self.threshold {
            config.threshold = v;
        }
        if let Some(v) = self.min_width {
            config.min_width = v;
        }
        if let Some(v) = self.max_width {
            config.max_width = Some(v);
        }
        if !self.regions.is_empty() {
            config.regions = self.regions.clone();
        }
        if let Some(v) = self.proximity {
            config.proximity_factor = v;
        }
        if self.constrain_width {
            config.constrain_width = true;
        }
        if self.unconstrained {
            config.amplitude_mode = AmplitudeMode::Unconstrained;
        }
        if let Some(v) = self.step_multiplier {
            config.step_multiplier = v;
        }
        if let Some(v) = self.stop_radius {
            config.stop_radius = v;
        }
        if let Some(v) = self.n_coefficients {
            config.n_coefficients = v;
        }
        if let Some(v) = self.damping_scale {
            config.damping_scale = v;
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    ::log::info!("nmr-signals v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.fit_config()?;
    let input = cli.input.display().to_string();
    let raw_axis = cli.raw_f32.then_some((cli.sw, cli.obs, cli.ref_ppm));
    let spectrum = match raw_axis {
        Some((sw, obs, ref_ppm)) => load_raw_f32(
            &cli.input,
            AxisParams {
                spectral_width_hz: sw,
                observe_freq_mhz: obs,
                reference_ppm: ref_ppm,
                label: String::new(),
            },
        )?,
        None => load_json_spectrum(&cli.input)?,
    };
    ::log::info!("Loaded {} points from {}", spectrum.real.len(), input);

    let scanner = WindowScanner::new(config.clone());
    let outcome = scanner.scan_points(&spectrum)?;
    let signals: Vec<SignalInSpectralUnits> = outcome.signals.iter().map(|s| s.to_spectral(&spectrum)).collect();

    write_output(&cli.out, &signals)?;

    let mut fit_log = FitLog::new();
    fit_log.set_source(&input);
    fit_log.record_scan(&input, raw_axis, &config, &cli.out, outcome.windows.len(), signals.len());
    if let Some(path) = &cli.log_text {
        fit_log.save_text(path)?;
    }
    if let Some(path) = &cli.log_json {
        fit_log.save_json(path)?;
    }
    if let Some(path) = &cli.log_script {
        fit_log.save_script(path)?;
    }
    Ok(())
}

fn write_output(out_path: &str, signals: &[SignalInSpectralUnits]) -> Result<(), Box<dyn std::error::Error>> {
    if out_path == "-" {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        serde_json::to_writer_pretty(&mut out, signals)?;
        writeln!(out)?;
        out.flush()?;
    } else {
        let mut out = BufWriter::new(File::create(Path::new(out_path))?);
        serde_json::to_writer_pretty(&mut out, signals)?;
        writeln!(out)?;
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region("10:200"), Ok((10, 200)));
        assert!(parse_region("10-200").is_err());
        assert!(parse_region("a:5").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "nmr-signals",
            "--input",
            "x.json",
            "--win-size",
            "128",
            "--region",
            "5:60",
            "--region",
            "100:120",
            "--constrain-width",
        ]);
        let config = cli.fit_config().unwrap();
        assert_eq!(config.window_size, 128);
        assert_eq!(config.regions, vec![(5, 60), (100, 120)]);
        assert!(config.constrain_width);
        assert_eq!(config.threshold, 0.0);
    }
}
