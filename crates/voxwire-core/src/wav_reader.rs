//! RIFF/WAVE container demuxer.
//!
//! Extracts the PCM16 payload from a container held fully in memory. The
//! input is untrusted network data: every read goes through [`ByteCursor`],
//! which refuses to step past the end of the buffer, and all chunk offset
//! arithmetic is checked.

use crate::audio::{AudioFormat, DecodedAudio};
use crate::error::DemuxError;
use tracing::{debug, trace, warn};

/// RIFF container magic
pub const RIFF_MAGIC: &[u8; 4] = b"RIFF";
/// WAVE form type
pub const WAVE_MAGIC: &[u8; 4] = b"WAVE";
/// Format chunk tag
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
/// Sample data chunk tag
pub const DATA_CHUNK: &[u8; 4] = b"data";

/// Smallest container that can hold the header, a format chunk and a data chunk header
pub const MIN_CONTAINER_LEN: usize = 44;

/// Offset of the first chunk after the RIFF/WAVE header
const FIRST_CHUNK_OFFSET: usize = 12;
/// Minimum payload of a PCM format chunk
const FMT_MIN_LEN: usize = 16;
/// Format code for uncompressed linear PCM
const PCM_FORMAT_CODE: u16 = 1;

/// Bounds-checked little-endian reader over a byte slice
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start reading at offset 0
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current offset
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute offset, which may be at most the buffer length
    pub fn seek(&mut self, pos: usize) -> Option<()> {
        if pos > self.data.len() {
            return None;
        }
        self.pos = pos;
        Some(())
    }

    /// Advance by `n` bytes
    pub fn skip(&mut self, n: usize) -> Option<()> {
        let pos = self.pos.checked_add(n)?;
        self.seek(pos)
    }

    /// Borrow the next `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Read a four-character code
    pub fn read_tag(&mut self) -> Option<[u8; 4]> {
        let mut tag = [0u8; 4];
        tag.copy_from_slice(self.read_bytes(4)?);
        Some(tag)
    }

    /// Read a little-endian u16
    pub fn read_u16_le(&mut self) -> Option<u16> {
        let b = self.read_bytes(2)?;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian u32
    pub fn read_u32_le(&mut self) -> Option<u32> {
        let b = self.read_bytes(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Chunk header (4 byte tag + 4 byte little-endian size)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Four-character chunk tag
    pub id: [u8; 4],
    /// Declared payload size, not yet checked against the buffer
    pub size: u32,
    /// Offset of the first payload byte
    pub payload_offset: usize,
}

impl ChunkHeader {
    /// Tag as text, with non-ASCII bytes replaced
    #[must_use]
    pub fn tag(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }
}

/// Raw fields of the format chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FmtFields {
    format_code: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

impl FmtFields {
    fn is_pcm16(&self) -> bool {
        self.format_code == PCM_FORMAT_CODE && self.bits_per_sample == 16
    }
}

/// Where the interesting chunks sit, last occurrence wins
#[derive(Debug, Default)]
struct Layout {
    fmt: Option<FmtFields>,
    data: Option<(usize, u32)>,
}

/// Structural summary of a container, without the sample payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Format code from the format chunk (1 = PCM)
    pub format_code: u16,
    /// Channel count as declared
    pub channels: u16,
    /// Sample rate as declared
    pub sample_rate: u32,
    /// Bits per sample as declared
    pub bits_per_sample: u16,
    /// Offset of the sample payload
    pub data_offset: usize,
    /// Declared size of the sample payload
    pub data_size: u32,
    /// Whether the data chunk runs past the end of the buffer
    pub data_truncated: bool,
    /// Every chunk seen, in order
    pub chunks: Vec<ChunkHeader>,
}

impl ContainerInfo {
    /// Whether the container is PCM16 with a playable channel count and rate
    #[must_use]
    pub fn is_playable(&self) -> bool {
        let fields = FmtFields {
            format_code: self.format_code,
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
        };
        !self.data_truncated && playable_format(&fields).is_some()
    }
}

/// Check the outer RIFF/WAVE header
fn check_header(bytes: &[u8]) -> Result<(), DemuxError> {
    if bytes.len() < MIN_CONTAINER_LEN {
        return Err(DemuxError::BadHeader);
    }

    let mut cursor = ByteCursor::new(bytes);
    let riff = cursor.read_tag().ok_or(DemuxError::BadHeader)?;
    // The RIFF size field is ignored; servers streaming audio often leave it unset.
    cursor.skip(4).ok_or(DemuxError::BadHeader)?;
    let wave = cursor.read_tag().ok_or(DemuxError::BadHeader)?;

    if &riff != RIFF_MAGIC || &wave != WAVE_MAGIC {
        return Err(DemuxError::BadHeader);
    }
    Ok(())
}

/// Walk the chunk list, recording the format and data chunks
fn walk<F>(bytes: &[u8], mut on_chunk: F) -> Result<Layout, DemuxError>
where
    F: FnMut(&ChunkHeader),
{
    check_header(bytes)?;

    let mut layout = Layout::default();
    let mut cursor = ByteCursor::new(bytes);
    cursor.seek(FIRST_CHUNK_OFFSET).ok_or(DemuxError::BadHeader)?;

    while cursor.remaining() >= 8 {
        let (Some(id), Some(size)) = (cursor.read_tag(), cursor.read_u32_le()) else {
            break;
        };
        let header = ChunkHeader {
            id,
            size,
            payload_offset: cursor.position(),
        };
        trace!(tag = %header.tag(), size, offset = header.payload_offset, "chunk");
        on_chunk(&header);

        if &id == FMT_CHUNK {
            let mut fmt = cursor.clone();
            let payload = fmt.read_bytes(FMT_MIN_LEN).ok_or(DemuxError::Truncated)?;
            let mut fields = ByteCursor::new(payload);
            let format_code = fields.read_u16_le().ok_or(DemuxError::Truncated)?;
            let channels = fields.read_u16_le().ok_or(DemuxError::Truncated)?;
            let sample_rate = fields.read_u32_le().ok_or(DemuxError::Truncated)?;
            fields.skip(6).ok_or(DemuxError::Truncated)?;
            let bits_per_sample = fields.read_u16_le().ok_or(DemuxError::Truncated)?;
            layout.fmt = Some(FmtFields {
                format_code,
                channels,
                sample_rate,
                bits_per_sample,
            });
        } else if &id == DATA_CHUNK {
            layout.data = Some((header.payload_offset, size));
        }

        // A chunk reaching past the end terminates the walk.
        if cursor.skip(size as usize).is_none() {
            break;
        }
    }

    Ok(layout)
}

/// Format as declared; channel and rate checks belong to the sink
fn declared_format(fields: &FmtFields) -> AudioFormat {
    let channels = u8::try_from(fields.channels).unwrap_or(u8::MAX);
    AudioFormat::pcm16(fields.sample_rate, channels)
}

/// Convert raw format fields into a playable format
fn playable_format(fields: &FmtFields) -> Option<AudioFormat> {
    if !fields.is_pcm16() {
        return None;
    }
    let format = AudioFormat::pcm16(fields.sample_rate, u8::try_from(fields.channels).ok()?);
    format.validate().ok()?;
    Some(format)
}

/// Decode a RIFF/WAVE PCM16 container
///
/// Copies exactly the number of bytes the data chunk declares. Duplicate
/// format or data chunks are resolved last-wins; unknown chunks are
/// skipped by their declared size.
///
/// # Errors
///
/// - [`DemuxError::BadHeader`] if the buffer is shorter than
///   [`MIN_CONTAINER_LEN`] or lacks the RIFF/WAVE magic
/// - [`DemuxError::UnsupportedFormat`] if the audio is not 16-bit linear
///   PCM or no data chunk exists. Channel count and rate are passed through
///   unchecked.
/// - [`DemuxError::Truncated`] if the format or data chunk extends past
///   the end of the buffer
pub fn parse(bytes: &[u8]) -> Result<DecodedAudio, DemuxError> {
    let layout = walk(bytes, |_| {})?;

    let (Some(fields), Some((data_offset, data_size))) = (layout.fmt, layout.data) else {
        debug!("container lacks a format or data chunk");
        return Err(DemuxError::UnsupportedFormat);
    };
    if !fields.is_pcm16() {
        debug!(
            format_code = fields.format_code,
            bits = fields.bits_per_sample,
            "container is not PCM16"
        );
        return Err(DemuxError::UnsupportedFormat);
    }

    let mut cursor = ByteCursor::new(bytes);
    cursor.seek(data_offset).ok_or(DemuxError::Truncated)?;
    let payload = cursor
        .read_bytes(data_size as usize)
        .ok_or(DemuxError::Truncated)?;

    let format = declared_format(&fields);
    let audio = DecodedAudio::new(format, payload.to_vec());

    if audio.has_partial_frame() {
        warn!(
            data_size,
            frame_size = format.frame_size(),
            "data chunk ends mid-frame"
        );
    }
    debug!(%format, bytes = audio.samples.len(), "demuxed container");

    Ok(audio)
}

/// Describe a container's structure without copying samples
///
/// # Errors
///
/// - [`DemuxError::BadHeader`] for a missing or short header
/// - [`DemuxError::Truncated`] if the format chunk is cut off
/// - [`DemuxError::UnsupportedFormat`] if there is no format or data chunk
pub fn probe(bytes: &[u8]) -> Result<ContainerInfo, DemuxError> {
    let mut chunks = Vec::new();
    let layout = walk(bytes, |header| chunks.push(*header))?;

    let (Some(fields), Some((data_offset, data_size))) = (layout.fmt, layout.data) else {
        return Err(DemuxError::UnsupportedFormat);
    };
    let data_truncated = data_offset
        .checked_add(data_size as usize)
        .map_or(true, |end| end > bytes.len());

    Ok(ContainerInfo {
        format_code: fields.format_code,
        channels: fields.channels,
        sample_rate: fields.sample_rate,
        bits_per_sample: fields.bits_per_sample,
        data_offset,
        data_size,
        data_truncated,
        chunks,
    })
}
