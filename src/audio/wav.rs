use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use super::pcm::PcmClip;
use super::AudioSink;

/// Writes every clip to `<dir>/line-NNNN.wav` (16-bit PCM).
#[derive(Debug)]
pub struct WavSink {
    dir: PathBuf,
    counter: AtomicU64,
}

impl WavSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn write(&self, clip: &PcmClip) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.dir.join(format!("line-{:04}.wav", n));

        let spec = hound::WavSpec {
            channels: clip.channels,
            sample_rate: clip.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("creating {}", path.display()))?;
        for sample in clip.to_i16() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        info!("Wrote {} ({}ms)", path.display(), clip.duration().as_millis());
        Ok(path)
    }
}

impl AudioSink for WavSink {
    fn play(&self, clip: &PcmClip) -> Result<()> {
        self.write(clip).map(|_| ())
    }
}
