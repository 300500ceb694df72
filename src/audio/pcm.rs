use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::time::Duration;

use crate::error::ServiceError;

/// Synthesized speech is s16le, mono, 24 kHz.
pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;

const FULL_SCALE: f32 = 32768.0;

/// Decoded audio, normalized to [-1.0, 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    /// Interleaved when `channels > 1`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmClip {
    pub fn from_s16le(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<Self, ServiceError> {
        if bytes.len() % 2 != 0 {
            return Err(ServiceError::malformed(format!(
                "PCM payload has odd length {}",
                bytes.len()
            )));
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / FULL_SCALE)
            .collect();
        Ok(Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.frames() as u64 * 1_000_000_000 / self.sample_rate as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Back to 16-bit, clamped.
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s * FULL_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect()
    }
}

/// base64 payload of the speech endpoint -> clip.
pub fn decode_base64(data: &str) -> Result<PcmClip, ServiceError> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| ServiceError::malformed(format!("Audio payload is not base64: {}", e)))?;
    PcmClip::from_s16le(&bytes, SAMPLE_RATE, CHANNELS)
}

pub fn encode_base64(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}
