use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use rubato::{FftFixedIn, Resampler};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::pcm::PcmClip;
use super::AudioSink;

// Let the device drain its own buffer before the stream is dropped
const DRAIN_TAIL: Duration = Duration::from_millis(250);
const RESAMPLE_CHUNK: usize = 1024;

/// Default output device via cpal. Each clip gets its own stream on its own
/// thread; `play` returns once the stream is running.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceSink;

impl DeviceSink {
    pub fn new() -> Self {
        Self
    }
}

impl AudioSink for DeviceSink {
    fn play(&self, clip: &PcmClip) -> Result<()> {
        if clip.is_empty() {
            return Ok(());
        }
        let clip = clip.clone();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        std::thread::Builder::new()
            .name("stepsim-playback".to_string())
            .spawn(move || match open_stream(&clip) {
                Ok((stream, duration)) => {
                    let _ = ready_tx.send(Ok(()));
                    std::thread::sleep(duration + DRAIN_TAIL);
                    drop(stream);
                    debug!("Playback finished ({}ms)", duration.as_millis());
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("Playback thread exited before the stream started"))?
    }
}

fn open_stream(clip: &PcmClip) -> Result<(cpal::Stream, Duration)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No output device available"))?;

    info!("Audio Output Device: {}", device.name().unwrap_or_default());

    // Prefer running the device at the clip rate; otherwise resample
    let mut selected = None;
    for range in device.supported_output_configs()? {
        if range.min_sample_rate().0 <= clip.sample_rate
            && range.max_sample_rate().0 >= clip.sample_rate
            && matches!(range.sample_format(), cpal::SampleFormat::F32 | cpal::SampleFormat::I16)
        {
            selected = Some(range.with_sample_rate(cpal::SampleRate(clip.sample_rate)));
            break;
        }
    }
    let config = match selected {
        Some(c) => c,
        None => device.default_output_config()?,
    };

    let device_rate = config.sample_rate().0;
    let channels = config.channels().max(1) as usize;
    info!("Audio Config Selected: Rate={}Hz, Channels={}", device_rate, channels);

    let mono = downmix(clip);
    let samples = if device_rate != clip.sample_rate {
        resample(&mono, clip.sample_rate, device_rate)?
    } else {
        mono
    };
    let duration = Duration::from_nanos(
        samples.len() as u64 * 1_000_000_000 / device_rate.max(1) as u64,
    );

    let rb = HeapRb::<f32>::new(samples.len().max(1));
    let (mut producer, mut consumer) = rb.split();
    producer.push_slice(&samples);

    let err_fn = |err| error!("an error occurred on output stream: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let s = consumer.try_pop().unwrap_or(0.0);
                    frame.iter_mut().for_each(|out| *out = s);
                }
            },
            err_fn,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_output_stream(
            &config.into(),
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let s = consumer.try_pop().unwrap_or(0.0);
                    let s = (s * i16::MAX as f32) as i16;
                    frame.iter_mut().for_each(|out| *out = s);
                }
            },
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("Unsupported sample format {:?}", other)),
    };

    stream.play()?;
    Ok((stream, duration))
}

fn downmix(clip: &PcmClip) -> Vec<f32> {
    let channels = clip.channels.max(1) as usize;
    if channels == 1 {
        return clip.samples.clone();
    }
    clip.samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Mono resampling for devices that cannot run at the clip rate.
pub fn resample(input: &[f32], from: u32, to: u32) -> Result<Vec<f32>> {
    if from == to || input.is_empty() {
        return Ok(input.to_vec());
    }
    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, 1)?;
    let mut out = Vec::with_capacity(input.len() * to as usize / from as usize + RESAMPLE_CHUNK);

    let mut pos = 0;
    while pos < input.len() {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(input.len());
        let mut block = input[pos..end].to_vec();
        block.resize(needed, 0.0);
        let waves_in = vec![block];
        let waves_out = resampler.process(&waves_in, None)?;
        out.extend_from_slice(&waves_out[0]);
        pos = end;
    }
    Ok(out)
}
