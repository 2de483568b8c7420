/// Reproducibility log for signal fitting sessions
///
/// Every scan is recorded with:
/// - Timestamp and sequence number
/// - The input it was run on
/// - The full fitting configuration
/// - The equivalent `nmr-signals` command line
/// - A short result summary
///
/// The log can be exported as human-readable text, JSON, or a shell
/// script that re-runs every scan with identical parameters.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::config::FitConfig;

/// Name of the command-line binary the exported script invokes
pub const BINARY_NAME: &str = "nmr-signals";

/// One recorded operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sequential operation number (1-based)
    pub sequence: usize,
    pub timestamp: DateTime<Local>,
    pub operation: String,
    pub description: String,
    /// Equivalent command line; empty for operations with no CLI form
    pub command: String,
    /// Configuration used, as pretty JSON; empty when not applicable
    #[serde(default)]
    pub config_json: String,
}

impl LogEntry {
    /// Format as human-readable text
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "[{:03}] {} | {} | {}\n      Command: {}",
            self.sequence,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.operation,
            self.description,
            if self.command.is_empty() {
                "(n/a)"
            } else {
                self.command.as_str()
            }
        );
        if !self.config_json.is_empty() {
            out.push_str("\n      Config:  ");
            out.push_str(&self.config_json.replace('\n', "\n               "));
        }
        out
    }

    /// Config file name used for this entry in the exported script
    fn config_file(&self) -> String {
        format!("fit-config-{:03}.json", self.sequence)
    }

    /// Format as shell script lines
    pub fn to_shell_lines(&self) -> String {
        let mut out = format!("# Step {}: {} - {}\n", self.sequence, self.operation, self.description);
        if self.command.is_empty() {
            return out;
        }
        if !self.config_json.is_empty() {
            out.push_str(&format!("cat > {} <<'EOF'\n{}\nEOF\n", self.config_file(), self.config_json));
        }
        out.push_str(&self.command);
        out.push('\n');
        out
    }
}

/// Quote a word for a POSIX shell.
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// `nmr-signals` invocation reproducing a scan of `input` with `config_file`.
pub fn scan_command(input: &str, raw_axis: Option<(f64, f64, f64)>, config_file: &str, output: &str) -> String {
    let mut words = vec![
        BINARY_NAME.to_string(),
        "--input".to_string(),
        shell_quote(input),
    ];
    if let Some((sw, obs, ref_ppm)) = raw_axis {
        words.push("--raw-f32".to_string());
        words.push(format!("--sw {}", sw));
        words.push(format!("--obs {}", obs));
        words.push(format!("--ref-ppm {}", ref_ppm));
    }
    words.push("--config".to_string());
    words.push(shell_quote(config_file));
    words.push("--out".to_string());
    words.push(shell_quote(output));
    words.join(" ")
}

/// The reproducibility log: all scans of a session, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitLog {
    pub session_id: String,
    pub session_start: DateTime<Local>,
    pub source_file: String,
    pub software_version: String,
    pub entries: Vec<LogEntry>,
}

impl FitLog {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_start: Local::now(),
            source_file: String::new(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            entries: Vec::new(),
        }
    }

    pub fn set_source(&mut self, source: &str) {
        self.source_file = source.to_string();
    }

    /// Add a free-form operation
    pub fn add_entry(&mut self, operation: &str, description: &str, command: &str) {
        self.push(operation, description, command.to_string(), String::new());
    }

    /// Record one scan of `input` with its configuration and result size.
    pub fn record_scan(
        &mut self,
        input: &str,
        raw_axis: Option<(f64, f64, f64)>,
        config: &FitConfig,
        output: &str,
        n_windows: usize,
        n_signals: usize,
    ) {
        let sequence = self.entries.len() + 1;
        let config_file = format!("fit-config-{:03}.json", sequence);
        let command = scan_command(input, raw_axis, &config_file, output);
        let description = format!(
            "{} windows of {} points, threshold {}, {} signals",
            n_windows, config.window_size, config.threshold, n_signals
        );
        self.push("Find signals", &description, command, config.to_json());
    }

    fn push(&mut self, operation: &str, description: &str, command: String, config_json: String) {
        let sequence = self.entries.len() + 1;
        self.entries.push(LogEntry {
            sequence,
            timestamp: Local::now(),
            operation: operation.to_string(),
            description: description.to_string(),
            command,
            config_json,
        });
        log::info!("[LOG {:03}] {}: {}", sequence, operation, description);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Export as human-readable text
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str("  NMR Signal Fitting Log\n");
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str(&format!("  Session ID:  {}\n", self.session_id));
        out.push_str(&format!(
            "  Started:     {}\n",
            self.session_start.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("  Source:      {}\n", self.source_file));
        out.push_str(&format!("  Software:    {} v{}\n", BINARY_NAME, self.software_version));
        out.push_str(&format!("  Operations:  {}\n", self.entries.len()));
        out.push_str("───────────────────────────────────────────────────────────────\n\n");
        for entry in &self.entries {
            out.push_str(&entry.to_text());
            out.push_str("\n\n");
        }
        out
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    /// Export as executable shell script
    pub fn to_shell_script(&self) -> String {
        let mut out = String::new();
        out.push_str("#!/bin/bash\n");
        out.push_str("#\n");
        out.push_str("# NMR signal fitting reproducibility script\n");
        out.push_str(&format!("# Generated by {} v{}\n", BINARY_NAME, self.software_version));
        out.push_str(&format!(
            "# Session: {} ({})\n",
            self.session_id,
            self.session_start.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("# Source: {}\n", self.source_file));
        out.push_str(&format!("# Requirements: {} must be in PATH.\n", BINARY_NAME));
        out.push_str("#\n");
        out.push_str("set -euo pipefail\n\n");
        for entry in &self.entries {
            out.push_str(&entry.to_shell_lines());
            out.push('\n');
        }
        out.push_str("echo \"Fitting complete.\"\n");
        out
    }

    pub fn save_text(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_text())
    }

    pub fn save_json(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_json())
    }

    pub fn save_script(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_shell_script())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }
}

impl Default for FitLog {
    fn default() -> Self {
        Self::new()
    }
}
