//! WAV file writer implementation
//!
//! Provides functionality to write PCM16 audio data in WAV/RIFF format,
//! either to a file or to an in-memory buffer.

use crate::audio::{AudioFormat, DecodedAudio};
use crate::error::{VoxwireError, VoxwireResult};
use crate::wav_reader::{DATA_CHUNK, FMT_CHUNK, RIFF_MAGIC, WAVE_MAGIC};
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

/// Size of the canonical header written before the samples
pub const HEADER_LEN: u32 = 44;

/// WAV file format specification for 16-bit PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Sample rate in Hz (e.g., 24000, 44100, 48000)
    pub sample_rate: u32,
}

impl WavSpec {
    /// Create a new WAV specification
    #[must_use]
    pub const fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    /// Bits per sample, always 16
    #[must_use]
    pub const fn bit_depth(&self) -> u16 {
        16
    }

    /// Get byte rate (bytes per second), `None` if it does not fit the header field
    #[must_use]
    pub const fn checked_byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(self.block_align() as u32)
    }

    /// Get byte rate (bytes per second), saturating at `u32::MAX`
    #[must_use]
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(self.block_align() as u32)
    }

    /// Check that the spec can be written to a header
    ///
    /// # Errors
    ///
    /// Returns an error for zero channels or a byte rate above `u32::MAX`
    pub fn validate(&self) -> VoxwireResult<()> {
        if self.channels == 0 {
            return Err(VoxwireError::invalid_input("WAV needs at least one channel"));
        }
        if self.channels > u16::MAX / 2 || self.checked_byte_rate().is_none() {
            return Err(VoxwireError::invalid_input(format!(
                "Sample rate {} Hz with {} channels exceeds the WAV byte rate field",
                self.sample_rate, self.channels
            )));
        }
        Ok(())
    }

    /// Get block align (bytes per sample frame)
    #[must_use]
    pub const fn block_align(&self) -> u16 {
        self.channels.saturating_mul(2)
    }
}

impl TryFrom<AudioFormat> for WavSpec {
    type Error = VoxwireError;

    fn try_from(format: AudioFormat) -> VoxwireResult<Self> {
        format.validate()?;
        let spec = Self::new(u16::from(format.channel_count), format.sample_rate_hz);
        spec.validate()?;
        Ok(spec)
    }
}

/// WAV writer over any seekable sink
pub struct WavWriter<W: Write + Seek> {
    writer: W,
    bytes_written: u32,
}

impl WavWriter<BufWriter<File>> {
    /// Create a new WAV file writer
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or the header cannot be written
    pub fn create<P: AsRef<Path>>(path: P, spec: WavSpec) -> VoxwireResult<Self> {
        let file = File::create(path.as_ref())
            .map_err(|e| VoxwireError::file(format!("Failed to create WAV file: {e}")))?;

        Self::new(BufWriter::new(file), spec)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    /// Start a container on `writer`
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is unusable or the header cannot be written
    pub fn new(mut writer: W, spec: WavSpec) -> VoxwireResult<Self> {
        spec.validate()?;
        // Sizes are patched in finalize
        Self::write_header(&mut writer, &spec, 0)?;

        Ok(Self {
            writer,
            bytes_written: 0,
        })
    }

    /// Write WAV/RIFF header (44 bytes)
    fn write_header(writer: &mut W, spec: &WavSpec, data_size: u32) -> VoxwireResult<()> {
        // RIFF chunk
        writer.write_all(RIFF_MAGIC)?;
        writer.write_all(&(HEADER_LEN - 8 + data_size).to_le_bytes())?;
        writer.write_all(WAVE_MAGIC)?;

        // fmt chunk
        writer.write_all(FMT_CHUNK)?;
        writer.write_all(&16u32.to_le_bytes())?;
        writer.write_all(&1u16.to_le_bytes())?; // PCM
        writer.write_all(&spec.channels.to_le_bytes())?;
        writer.write_all(&spec.sample_rate.to_le_bytes())?;
        writer.write_all(&spec.byte_rate().to_le_bytes())?;
        writer.write_all(&spec.block_align().to_le_bytes())?;
        writer.write_all(&spec.bit_depth().to_le_bytes())?;

        // data chunk
        writer.write_all(DATA_CHUNK)?;
        writer.write_all(&data_size.to_le_bytes())?;

        Ok(())
    }

    /// Write a 16-bit sample
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails or the container would exceed 4 GiB
    pub fn write_sample(&mut self, sample: i16) -> VoxwireResult<()> {
        self.write_pcm_bytes(&sample.to_le_bytes())
    }

    /// Append raw little-endian PCM16 bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails or the container would exceed 4 GiB
    pub fn write_pcm_bytes(&mut self, bytes: &[u8]) -> VoxwireResult<()> {
        let len = u32::try_from(bytes.len())
            .ok()
            .and_then(|len| self.bytes_written.checked_add(len))
            .filter(|total| total.checked_add(HEADER_LEN).is_some())
            .ok_or_else(|| VoxwireError::invalid_input("WAV data exceeds 4 GiB"))?;

        self.writer.write_all(bytes)?;
        self.bytes_written = len;
        Ok(())
    }

    /// Number of sample bytes written so far
    #[must_use]
    pub const fn bytes_written(&self) -> u32 {
        self.bytes_written
    }

    /// Finalize the container by updating the header with actual sizes
    ///
    /// # Errors
    ///
    /// Returns an error if seeking or writing the header fails
    pub fn finalize(mut self) -> VoxwireResult<W> {
        // Update RIFF chunk size (file size - 8)
        self.writer.seek(SeekFrom::Start(4))?;
        self.writer
            .write_all(&(HEADER_LEN - 8 + self.bytes_written).to_le_bytes())?;

        // Update data chunk size
        self.writer.seek(SeekFrom::Start(u64::from(HEADER_LEN) - 4))?;
        self.writer.write_all(&self.bytes_written.to_le_bytes())?;

        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Encode decoded audio as an in-memory RIFF/WAVE container
///
/// # Errors
///
/// Returns an error if the format is unusable or the payload exceeds 4 GiB
pub fn encode_pcm16(audio: &DecodedAudio) -> VoxwireResult<Vec<u8>> {
    let spec = WavSpec::try_from(audio.format)?;
    let buffer = Cursor::new(Vec::with_capacity(HEADER_LEN as usize + audio.samples.len()));
    let mut writer = WavWriter::new(buffer, spec)?;
    writer.write_pcm_bytes(&audio.samples)?;
    Ok(writer.finalize()?.into_inner())
}

/// Write decoded audio to a WAV file
///
/// # Errors
///
/// Returns an error if the format is unusable or the file cannot be written
pub fn write_wav_file<P: AsRef<Path>>(path: P, audio: &DecodedAudio) -> VoxwireResult<()> {
    let spec = WavSpec::try_from(audio.format)?;
    let mut writer = WavWriter::create(path, spec)?;
    writer.write_pcm_bytes(&audio.samples)?;
    writer.finalize()?;
    Ok(())
}
