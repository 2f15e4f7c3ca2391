use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sonotact",
    about = "Real-time spectral analysis and haptic mapping for bioacoustic audio"
)]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Capture from the default microphone instead of playing a file
    #[arg(long)]
    pub mic: bool,

    /// Loop playback seamlessly instead of stopping at the end
    #[arg(long)]
    pub looped: bool,

    /// Stop after this many seconds (useful with --looped or --mic)
    #[arg(long)]
    pub duration: Option<f32>,

    /// Analysis window size in samples
    #[arg(long, default_value_t = 1024)]
    pub window_size: usize,

    /// Number of spectral bands per frame
    #[arg(long, default_value_t = 64)]
    pub bands: usize,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
