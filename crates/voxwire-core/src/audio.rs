//! Decoded audio types shared by the demuxer, the writer and the sink.

use crate::error::{VoxwireError, VoxwireResult};
use std::path::Path;
use std::time::Duration;

/// Bytes in one 16-bit sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// PCM format of a decoded clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Interleaved channels (1 = mono, 2 = stereo)
    pub channel_count: u8,
    /// Bits per sample, always 16 for playable audio
    pub bits_per_sample: u8,
}

impl AudioFormat {
    /// Create a 16-bit PCM format
    ///
    /// No validation happens here; call [`AudioFormat::validate`] before use.
    #[must_use]
    pub const fn pcm16(sample_rate_hz: u32, channel_count: u8) -> Self {
        Self {
            sample_rate_hz,
            channel_count,
            bits_per_sample: 16,
        }
    }

    /// Bytes per interleaved frame
    #[must_use]
    pub const fn frame_size(&self) -> usize {
        self.channel_count as usize * BYTES_PER_SAMPLE
    }

    /// Bytes per second of audio
    #[must_use]
    pub const fn byte_rate(&self) -> u64 {
        self.sample_rate_hz as u64 * self.frame_size() as u64
    }

    /// Playback time of `byte_len` bytes in this format
    #[must_use]
    pub fn duration_of(&self, byte_len: usize) -> Duration {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return Duration::ZERO;
        }
        let frames = (byte_len / self.frame_size()) as u64;
        Duration::from_micros(frames * 1_000_000 / u64::from(self.sample_rate_hz))
    }

    /// Validate that the format can be played
    ///
    /// # Errors
    ///
    /// Returns an error for a zero sample rate, a channel count outside
    /// {1, 2} or a bit depth other than 16.
    pub fn validate(&self) -> VoxwireResult<()> {
        if self.sample_rate_hz == 0 {
            return Err(VoxwireError::invalid_input(
                "Sample rate must be greater than 0",
            ));
        }

        if !matches!(self.channel_count, 1 | 2) {
            return Err(VoxwireError::invalid_input(format!(
                "Channels must be 1 or 2, got {}",
                self.channel_count
            )));
        }

        if self.bits_per_sample != 16 {
            return Err(VoxwireError::invalid_input(format!(
                "Bit depth must be 16, got {}",
                self.bits_per_sample
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}-bit PCM",
            self.sample_rate_hz, self.channel_count, self.bits_per_sample
        )
    }
}

/// Interleaved little-endian PCM16 samples with their format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    /// Format read from the container
    pub format: AudioFormat,
    /// Raw sample bytes, exactly as declared by the data chunk
    pub samples: Vec<u8>,
}

impl DecodedAudio {
    /// Wrap sample bytes with their format
    #[must_use]
    pub fn new(format: AudioFormat, samples: Vec<u8>) -> Self {
        Self { format, samples }
    }

    /// Build from interleaved i16 samples
    #[must_use]
    pub fn from_i16_samples(format: AudioFormat, samples: &[i16]) -> Self {
        let bytes = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::new(format, bytes)
    }

    /// Number of whole frames
    #[must_use]
    pub fn frame_count(&self) -> usize {
        match self.format.frame_size() {
            0 => 0,
            size => self.samples.len() / size,
        }
    }

    /// Whether the payload ends in the middle of a frame
    #[must_use]
    pub fn has_partial_frame(&self) -> bool {
        match self.format.frame_size() {
            0 => false,
            size => self.samples.len() % size != 0,
        }
    }

    /// Playback time of the whole frames
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.samples.len())
    }

    /// Samples decoded to i16, ignoring a trailing odd byte
    #[must_use]
    pub fn to_i16_samples(&self) -> Vec<i16> {
        self.samples
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    /// Persist the clip as a RIFF/WAVE file
    ///
    /// # Errors
    ///
    /// Returns an error if the format is unusable or the file cannot be written
    pub fn save_wav<P: AsRef<Path>>(&self, path: P) -> VoxwireResult<()> {
        crate::wav_writer::write_wav_file(path, self)
    }
}
