use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::Sender;

use super::decode::DecodedAudio;
use super::SourceMessage;
use crate::error::{Error, Result};

/// Decoded-file playback through the default output device.
///
/// The device callback pulls from the decoded buffer, fans the mono sample
/// out to every output channel, and sends a copy of each consumed chunk to
/// the analysis channel. One-shot playback emits `Finished` after the last
/// samples and then plays silence; looped playback wraps seamlessly and
/// never finishes on its own.
pub struct FilePlayer {
    stream: Option<cpal::Stream>,
}

impl FilePlayer {
    /// Build the output stream without starting it.
    pub fn prepare(audio: DecodedAudio, looped: bool, tx: Sender<SourceMessage>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
        let supported = pick_output_config(&device, audio.sample_rate)?;

        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        log::info!(
            "playback: {:.1}s at {} Hz, {} ch, looped={looped}",
            audio.duration_secs(),
            config.sample_rate.0,
            channels
        );

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, channels, audio.samples, looped, tx)
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, channels, audio.samples, looped, tx)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, channels, audio.samples, looped, tx)
            }
            fmt => Err(Error::Stream(format!("unsupported output format {fmt:?}"))),
        }?;

        Ok(Self {
            stream: Some(stream),
        })
    }

    /// Start or continue playback.
    pub fn play(&self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        }
        Ok(())
    }

    /// Suspend without releasing the stream; `play()` continues from the
    /// suspension point.
    pub fn pause(&self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.pause().map_err(|e| Error::Stream(e.to_string()))?;
        }
        Ok(())
    }

    /// Release the stream; callbacks cease immediately.
    pub fn stop(&mut self) {
        self.stream = None;
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    samples: Vec<f32>,
    looped: bool,
    tx: Sender<SourceMessage>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut pos = 0usize;
    let mut finished_sent = false;

    device
        .build_output_stream(
            config,
            move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut tap = Vec::with_capacity(out.len() / channels);
                for frame in out.chunks_mut(channels) {
                    let sample = if pos < samples.len() {
                        let s = samples[pos];
                        pos += 1;
                        if looped && pos == samples.len() {
                            pos = 0;
                        }
                        s
                    } else {
                        0.0
                    };
                    tap.push(sample);
                    let value = T::from_sample(sample);
                    for slot in frame.iter_mut() {
                        *slot = value;
                    }
                }

                if !finished_sent {
                    let _ = tx.send(SourceMessage::Samples(tap));
                    if !looped && pos >= samples.len() {
                        finished_sent = true;
                        let _ = tx.send(SourceMessage::Finished);
                    }
                }
            },
            |err| log::warn!("output stream error: {err}"),
            None,
        )
        .map_err(|e| Error::Stream(e.to_string()))
}

/// Prefer a device config at the asset's sample rate; otherwise fall back
/// to the device default (the analysis path is rate-agnostic).
fn pick_output_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<cpal::SupportedStreamConfig> {
    let default = device
        .default_output_config()
        .map_err(|e| Error::Stream(e.to_string()))?;
    if default.sample_rate().0 == sample_rate {
        return Ok(default);
    }

    if let Ok(ranges) = device.supported_output_configs() {
        let wanted = cpal::SampleRate(sample_rate);
        if let Some(config) = ranges
            .filter(|r| r.sample_format() == default.sample_format())
            .find_map(|r| r.try_with_sample_rate(wanted))
        {
            return Ok(config);
        }
    }

    log::warn!(
        "output device does not support {sample_rate} Hz, playing at {} Hz",
        default.sample_rate().0
    );
    Ok(default)
}
