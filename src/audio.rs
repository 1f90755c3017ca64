//! In-memory audio and the file decoder that produces it
//!
//! The detectors never touch files. They work on an [`AudioBuffer`]: mono
//! `f64` samples at the file's native rate. Decoding goes through symphonia,
//! so anything it can probe (WAV, FLAC, OGG, MP3) is accepted. Multi-channel
//! input is averaged down to mono and nothing is resampled.

use crate::error::{ForensicError, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Mono sample buffer handed to the pipeline. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(ForensicError::InvalidSampleRate {
                sample_rate,
                cutoff_hz: 0.0,
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Decode a file to mono at its native sample rate
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decode_err = |reason: String| ForensicError::Decode {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| decode_err(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_err(e.to_string()))?;

        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| decode_err("no audio track".to_string()))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| decode_err(e.to_string()))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(_) => break,
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(_) => {
                    skipped_packets += 1;
                    continue;
                }
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);

            if sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < decoded.capacity() * spec.channels.count())
            {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(ref mut buf) = sample_buf {
                let channel_count = spec.channels.count().max(1);
                buf.copy_interleaved_ref(decoded);

                for chunk in buf.samples().chunks(channel_count) {
                    let mono: f64 =
                        chunk.iter().map(|&s| s as f64).sum::<f64>() / channel_count as f64;
                    samples.push(mono);
                }
            }
        }

        if skipped_packets > 0 {
            debug!(path = %path.display(), skipped_packets, "skipped undecodable packets");
        }

        if samples.is_empty() {
            return Err(ForensicError::EmptyAudio);
        }

        let sample_rate =
            sample_rate.ok_or_else(|| decode_err("unknown sample rate".to_string()))?;
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// High-frequency residue of an [`AudioBuffer`], same length and rate.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseSignal {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl NoiseSignal {
    /// Wrap an already-extracted noise track (e.g. from an external filter)
    pub fn from_samples(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
