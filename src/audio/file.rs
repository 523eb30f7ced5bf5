use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

use super::frame::{AudioFormat, AudioFrame};

/// A WAV file decoded into a single frame
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub frame: AudioFrame,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;
        let frame = read_frame(reader)?;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            frame.seconds(),
            frame.sample_rate,
            frame.channels,
            frame.samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds: frame.seconds(),
            frame,
        })
    }
}

/// Decode an in-memory WAV (16-bit PCM) into a frame, e.g. a synthesis response body.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioFrame> {
    if bytes.is_empty() {
        bail!("Empty WAV payload");
    }
    let reader = WavReader::new(Cursor::new(bytes)).context("Invalid WAV header")?;
    read_frame(reader)
}

/// Encode a frame as an in-memory 16-bit PCM WAV
pub fn encode_wav(frame: &AudioFrame) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, wav_spec(frame)).context("Failed to create WAV writer")?;
        for &sample in &frame.samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV")?;
    }
    Ok(cursor.into_inner())
}

/// Write a frame to disk as a 16-bit PCM WAV file
pub fn write_wav(path: impl AsRef<Path>, frame: &AudioFrame) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WavWriter::create(path, wav_spec(frame))
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;
    for &sample in &frame.samples {
        writer
            .write_sample(sample)
            .context("Failed to write sample to WAV")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    debug!(
        "Wrote {:.3}s of audio to {}",
        frame.seconds(),
        path.display()
    );
    Ok(())
}

fn wav_spec(frame: &AudioFrame) -> WavSpec {
    WavSpec {
        channels: frame.channels,
        sample_rate: frame.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn read_frame<R: Read>(reader: WavReader<R>) -> Result<AudioFrame> {
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!(
            "Only 16-bit PCM WAV is supported, got {}-bit {:?}",
            spec.bits_per_sample,
            spec.sample_format
        );
    }
    if !(1..=2).contains(&spec.channels) {
        bail!("Only mono and stereo WAV is supported, got {} channels", spec.channels);
    }

    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read audio samples")?;

    let format = AudioFormat {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    };
    Ok(AudioFrame::new(samples, format, 0))
}
