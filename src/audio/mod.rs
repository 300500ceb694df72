pub mod pcm;
pub mod playback;
pub mod wav;

use std::sync::Arc;

use crate::config::AudioOutput;

pub use pcm::{decode_base64, encode_base64, PcmClip};
pub use playback::DeviceSink;
pub use wav::WavSink;

/// Where synthesized speech ends up. Implementations must not block for
/// the length of the clip.
pub trait AudioSink: Send + Sync {
    fn play(&self, clip: &PcmClip) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, _clip: &PcmClip) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn build_sink(output: &AudioOutput) -> Arc<dyn AudioSink> {
    match output {
        AudioOutput::Device => Arc::new(DeviceSink::new()),
        AudioOutput::Wav(dir) => Arc::new(WavSink::new(dir.clone())),
        AudioOutput::Muted => Arc::new(NullSink),
    }
}
