mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use std::time::{Duration, Instant};

use cli::Cli;
use sonotact::haptics::derive_params;
use sonotact::{Config, HapticEngine, LogDriver, PipelineEvent, SessionState, SourcePipeline};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect sonotact.toml / global config
    let config_path = cli.config.take().or_else(|| {
        let local = std::path::PathBuf::from("sonotact.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("sonotact").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("sonotact").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut config = Config::default();
    if let Some(ref path) = config_path {
        if let Some(loaded) = sonotact::config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            config = loaded;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }
    // CLI values win only when they were set away from their defaults
    if cli.window_size != 1024 {
        config.analysis.window_size = cli.window_size;
    }
    if cli.bands != 64 {
        config.analysis.output_bands = cli.bands;
    }

    let engine = HapticEngine::new(LogDriver);
    let mut pipeline = SourcePipeline::new(&config, engine.clone());
    let events = pipeline.subscribe();

    if cli.mic {
        log::info!("Capturing from the default microphone");
        pipeline.start_mic()?;
    } else {
        let input = cli
            .input
            .as_ref()
            .context("Input audio file is required (or pass --mic)")?;
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        log::info!("Playing {}", input.display());
        if cli.looped {
            pipeline.start_file_looped(input)?;
        } else {
            pipeline.start_file(input)?;
        }
    }

    let deadline = cli
        .duration
        .map(|secs| Instant::now() + Duration::from_secs_f32(secs));
    let mut last_meter = Instant::now();

    loop {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                log::info!("Duration reached, stopping");
                break;
            }
        }

        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(PipelineEvent::Spectral(frame)) => {
                if last_meter.elapsed() >= Duration::from_millis(100) {
                    last_meter = Instant::now();
                    let params = derive_params(&frame.bands);
                    log::info!(
                        "|{}| intensity={:.2} sharpness={:.2}",
                        meter(&frame.bands, 32),
                        params.intensity,
                        params.sharpness
                    );
                }
            }
            Ok(PipelineEvent::StateChanged(state)) => {
                log::info!("State: {state:?}");
                if state == SessionState::Ended {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    pipeline.stop();
    engine.shutdown();
    log::info!("Done");
    Ok(())
}

/// Coarse text meter of the band magnitudes.
fn meter(bands: &[f32], columns: usize) -> String {
    const GLYPHS: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];
    if bands.is_empty() {
        return String::new();
    }
    (0..columns)
        .map(|col| {
            let idx = col * bands.len() / columns;
            let level = bands[idx].clamp(0.0, 1.0);
            GLYPHS[(level * (GLYPHS.len() - 1) as f32).round() as usize]
        })
        .collect()
}
