use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::Sender;

use super::SourceMessage;
use crate::error::{Error, Result};

/// Live microphone input. Installs a tap on the default input device at its
/// native format and delivers mono chunks to the analysis channel from the
/// device callback. No pause/resume; only start and stop.
pub struct MicCapture {
    stream: Option<cpal::Stream>,
}

impl MicCapture {
    /// Build the input stream without starting it. If no input device is
    /// available (hardware absent, permission denied) the capture becomes
    /// inert rather than failing: the spectrogram is an enhancement, not
    /// required functionality.
    pub fn prepare(tx: Sender<SourceMessage>) -> Result<Self> {
        let host = cpal::default_host();
        let Some(device) = host.default_input_device() else {
            log::warn!("no audio input device, capture is inert");
            return Ok(Self { stream: None });
        };

        let supported = device
            .default_input_config()
            .map_err(|e| Error::Stream(e.to_string()))?;
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        log::info!(
            "microphone tap: {} ch @ {} Hz, {sample_format:?}",
            channels,
            config.sample_rate.0
        );

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, tx),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, tx),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, tx),
            fmt => Err(Error::Stream(format!("unsupported input format {fmt:?}"))),
        }?;

        Ok(Self {
            stream: Some(stream),
        })
    }

    /// Begin delivering buffers.
    pub fn play(&self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        }
        Ok(())
    }

    /// Tear down the tap and release the device.
    pub fn stop(&mut self) {
        self.stream = None;
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    tx: Sender<SourceMessage>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Copy out and downmix only; analysis happens off this thread.
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .map(|frame| {
                        frame.iter().map(|&s| f32::from_sample(s)).sum::<f32>()
                            / channels as f32
                    })
                    .collect();
                let _ = tx.send(SourceMessage::Samples(mono));
            },
            |err| log::warn!("input stream error: {err}"),
            None,
        )
        .map_err(|e| Error::Stream(e.to_string()))
}
