//! Live microphone capture (`capture` feature).
//!
//! Records from the default input device for a fixed duration and encodes
//! the result as 16-bit PCM WAV, ready for [`crate::audio::AudioSource::from_capture`].

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use hound::{WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during microphone capture
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Failed to read device configuration: {0}")]
    DeviceConfig(String),

    #[error("Failed to build audio stream: {0}")]
    StreamBuild(String),

    #[error("Failed to start audio stream: {0}")]
    StreamStart(String),

    #[error("Failed to encode WAV: {0}")]
    Encoding(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("No audio captured")]
    Empty,
}

/// Record from the default input device for a fixed duration
///
/// Blocking: the cpal stream is not `Send` and must live on the calling
/// thread, so async callers go through `tokio::task::spawn_blocking`.
pub fn record_for(duration: Duration) -> Result<Vec<u8>, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoInputDevice)?;
    let config = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceConfig(e.to_string()))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels();
    log::info!(
        "Capture: {} Hz, {} channels, {:?}",
        sample_rate,
        channels,
        config.sample_format()
    );

    let samples: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let sample_format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();

    let err_fn = |err| {
        log::error!("Capture: stream error: {}", err);
    };

    let stream = build_stream(&device, &stream_config, sample_format, &samples, err_fn)?;
    stream
        .play()
        .map_err(|e| CaptureError::StreamStart(e.to_string()))?;

    std::thread::sleep(duration);
    drop(stream);

    let samples = samples
        .lock()
        .map_err(|e| CaptureError::Lock(e.to_string()))?;
    if samples.is_empty() {
        return Err(CaptureError::Empty);
    }

    encode_wav(&samples, sample_rate, channels)
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: SampleFormat,
    samples: &Arc<Mutex<Vec<f32>>>,
    err_fn: fn(cpal::StreamError),
) -> Result<cpal::Stream, CaptureError> {
    use cpal::Sample;

    let stream = match sample_format {
        SampleFormat::F32 => {
            let samples = samples.clone();
            device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = samples.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let samples = samples.clone();
            device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = samples.lock() {
                        buf.extend(data.iter().map(|&s| s.to_float_sample()));
                    }
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let samples = samples.clone();
            device.build_input_stream(
                config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = samples.lock() {
                        buf.extend(data.iter().map(|&s| s.to_float_sample()));
                    }
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(CaptureError::DeviceConfig(format!(
                "Unsupported sample format: {:?}",
                other
            )));
        }
    };

    stream.map_err(|e| CaptureError::StreamBuild(e.to_string()))
}

fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>, CaptureError> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).map_err(|e| CaptureError::Encoding(e.to_string()))?;

        for &sample in samples {
            let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_encoding_headers() {
        let samples = vec![0.0f32, 0.5, -0.5, 1.0, -1.0];
        let wav = encode_wav(&samples, 16_000, 1).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 5);
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        let samples = vec![2.0f32, -2.0];
        let wav = encode_wav(&samples, 8_000, 1).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![i16::MAX, -i16::MAX]);
    }
}
