use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AnalysisConfig {
    /// Samples per analysis window. PCM frames shorter than this are ignored.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Number of averaged output bands per spectral frame.
    #[serde(default = "default_output_bands")]
    pub output_bands: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HistoryConfig {
    /// Spectral frames retained for the spectrogram display (FIFO).
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            output_bands: default_output_bands(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_window_size() -> usize { 1024 }
fn default_output_bands() -> usize { 64 }
fn default_capacity() -> usize { 48 }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_tables() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.analysis.window_size, 1024);
        assert_eq!(cfg.analysis.output_bands, 64);
        assert_eq!(cfg.history.capacity, 48);
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let cfg: Config = toml::from_str("[analysis]\noutput_bands = 32\n").unwrap();
        assert_eq!(cfg.analysis.window_size, 1024);
        assert_eq!(cfg.analysis.output_bands, 32);
    }
}
