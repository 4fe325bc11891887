use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Sample rate whisper expects.
pub const TARGET_RATE: u32 = 16000;

/// Shared capture buffer plus the flag that closes it.
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    pub samples: Arc<Mutex<Vec<f32>>>,
    /// Once set, the input callback stops appending.
    pub closed: Arc<AtomicBool>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Vec<f32> {
        self.samples
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// RMS of the last ~80ms of audio.
    pub fn recent_level(&self) -> f32 {
        let Ok(buf) = self.samples.lock() else {
            return 0.0;
        };
        let n = buf.len().min(1280);
        if n == 0 {
            return 0.0;
        }
        let start = buf.len() - n;
        let sum_sq: f32 = buf[start..].iter().map(|&s| s * s).sum();
        (sum_sq / n as f32).sqrt()
    }
}

/// Start capturing from the default input device into `buffer` at roughly
/// 16kHz mono. Drop the returned `Stream` to release the device.
pub fn start_capture(
    buffer: CaptureBuffer,
) -> Result<(cpal::Stream, u32), Box<dyn std::error::Error>> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or("No input device found")?;

    log::info!("Input device: {:?}", device.description());

    let supported_configs: Vec<_> = device.supported_input_configs()?.collect();

    let desired = supported_configs.iter().find(|c| {
        c.channels() == 1
            && c.min_sample_rate() <= TARGET_RATE
            && c.max_sample_rate() >= TARGET_RATE
            && c.sample_format() == cpal::SampleFormat::F32
    });

    let (config, native_rate, downsample_factor) = if let Some(cfg) = desired {
        let config = cfg.with_sample_rate(TARGET_RATE).config();
        (config, TARGET_RATE, 1usize)
    } else {
        // Decimate the device's default rate down towards 16kHz.
        let default_config = device.default_input_config()?;
        let rate = default_config.sample_rate();
        let factor = (rate / TARGET_RATE).max(1) as usize;
        let actual_rate = rate / factor as u32;
        log::info!("Using native rate {rate}Hz, downsampling by {factor}x to ~{actual_rate}Hz");
        (default_config.config(), actual_rate, factor)
    };

    let channels = config.channels as usize;

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if buffer.closed.load(Ordering::Relaxed) {
                return;
            }
            let Ok(mut buf) = buffer.samples.lock() else {
                return;
            };
            for (i, chunk) in data.chunks(channels).enumerate() {
                if i % downsample_factor == 0 {
                    let mono = chunk.iter().sum::<f32>() / channels as f32;
                    buf.push(mono);
                }
            }
        },
        |err| log::error!("Input stream error: {err}"),
        None,
    )?;

    stream.play()?;
    Ok((stream, native_rate))
}
