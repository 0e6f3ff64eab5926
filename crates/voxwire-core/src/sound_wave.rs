//! Procedural playback buffer for decoded speech.
//!
//! A [`SoundWave`] is created preloaded with a whole clip and can keep
//! receiving appends afterwards. Producers and the render callback share
//! one short-lived lock; the render side only ever `try_lock`s, so a
//! producer holding the lock costs the mixer one silent period instead of
//! a stall.

use crate::audio::{AudioFormat, DecodedAudio};
use crate::error::SinkError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared handle to a playback buffer
pub type SinkHandle = Arc<SoundWave>;

/// Mixer group a sound is routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundGroup {
    /// Ungrouped sounds
    Default,
    /// Short sound effects
    Effects,
    /// Background music
    Music,
    /// Dialogue and synthesized speech
    Voice,
}

impl std::fmt::Display for SoundGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Effects => write!(f, "Effects"),
            Self::Music => write!(f, "Music"),
            Self::Voice => write!(f, "Voice"),
        }
    }
}

/// Queued PCM blocks awaiting render
#[derive(Debug, Default)]
struct PcmQueue {
    blocks: VecDeque<Vec<u8>>,
    /// Bytes of the front block already rendered
    front_offset: usize,
    /// Unrendered bytes across all blocks
    available: usize,
}

impl PcmQueue {
    fn push(&mut self, block: Vec<u8>) {
        self.available += block.len();
        self.blocks.push_back(block);
    }

    fn drain_into(&mut self, out: &mut [u8]) {
        let mut written = 0;
        while written < out.len() {
            let Some(front) = self.blocks.front() else {
                break;
            };
            let chunk = &front[self.front_offset..];
            let n = chunk.len().min(out.len() - written);
            out[written..written + n].copy_from_slice(&chunk[..n]);
            written += n;
            self.front_offset += n;

            if self.front_offset == front.len() {
                self.blocks.pop_front();
                self.front_offset = 0;
            }
        }
        self.available -= written;
    }

    fn clear(&mut self) {
        self.blocks.clear();
        self.front_offset = 0;
        self.available = 0;
    }
}

/// Streaming PCM16 buffer handed to the playback subsystem
#[derive(Debug)]
pub struct SoundWave {
    format: AudioFormat,
    looping: bool,
    sound_group: SoundGroup,
    queue: Mutex<PcmQueue>,
    total_queued: AtomicU64,
}

impl SoundWave {
    /// Create a voice buffer preloaded with `samples`
    ///
    /// The whole payload is enqueued as one block, ready to play. A
    /// trailing partial frame is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidParameters`] if the sample rate is 0, the
    /// channel count is not 1 or 2, or `samples` holds no whole frame.
    pub fn create(format: AudioFormat, samples: &[u8]) -> Result<SinkHandle, SinkError> {
        let whole = Self::whole_frame_len(&format, samples.len())?;
        Ok(Self::preloaded(format, samples[..whole].to_vec()))
    }

    /// Create a voice buffer from a decoded clip without copying its samples
    ///
    /// # Errors
    ///
    /// Same conditions as [`SoundWave::create`].
    pub fn from_decoded(audio: DecodedAudio) -> Result<SinkHandle, SinkError> {
        let DecodedAudio { format, mut samples } = audio;
        let whole = Self::whole_frame_len(&format, samples.len())?;
        samples.truncate(whole);
        Ok(Self::preloaded(format, samples))
    }

    fn whole_frame_len(format: &AudioFormat, len: usize) -> Result<usize, SinkError> {
        format
            .validate()
            .map_err(|e| SinkError::invalid_parameters(e.to_string()))?;

        if len == 0 {
            return Err(SinkError::invalid_parameters("Sample payload is empty"));
        }

        let frame_size = format.frame_size();
        let whole = len - len % frame_size;
        if whole == 0 {
            return Err(SinkError::invalid_parameters(format!(
                "Payload of {len} bytes is shorter than one {frame_size}-byte frame"
            )));
        }
        if whole < len {
            warn!(
                dropped = len - whole,
                frame_size, "dropping trailing partial frame"
            );
        }
        Ok(whole)
    }

    fn preloaded(format: AudioFormat, block: Vec<u8>) -> SinkHandle {
        let wave = Self {
            format,
            looping: false,
            sound_group: SoundGroup::Voice,
            queue: Mutex::new(PcmQueue::default()),
            total_queued: AtomicU64::new(0),
        };
        wave.push_block(block);

        debug!(
            %format,
            bytes = wave.available_bytes(),
            "created sound wave"
        );
        Arc::new(wave)
    }

    fn push_block(&self, block: Vec<u8>) {
        if block.is_empty() {
            return;
        }
        let len = block.len() as u64;
        self.queue.lock().push(block);
        self.total_queued.fetch_add(len, Ordering::Relaxed);
    }

    /// Append more PCM16 bytes for playback
    ///
    /// Chunks may split frames; the render side only hands out whole
    /// frames, so a split frame plays once its remainder arrives.
    pub fn queue_audio(&self, bytes: &[u8]) {
        self.push_block(bytes.to_vec());
    }

    /// Copy whole frames of queued audio into `out`
    ///
    /// Never blocks: if a producer holds the queue, nothing is rendered and
    /// 0 is returned. Returns the number of bytes written, always a multiple
    /// of the frame size.
    pub fn render(&self, out: &mut [u8]) -> usize {
        let Some(mut queue) = self.queue.try_lock() else {
            return 0;
        };

        let frame_size = self.format.frame_size();
        let n = out.len().min(queue.available);
        let n = n - n % frame_size;
        queue.drain_into(&mut out[..n]);
        n
    }

    /// Drop all audio that has not been rendered yet
    pub fn reset_audio(&self) {
        self.queue.lock().clear();
    }

    /// Format of the queued samples
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.format.sample_rate_hz
    }

    /// Number of interleaved channels
    #[must_use]
    pub const fn num_channels(&self) -> u8 {
        self.format.channel_count
    }

    /// Whether playback restarts at the end
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Mixer group this wave plays through
    #[must_use]
    pub const fn sound_group(&self) -> SoundGroup {
        self.sound_group
    }

    /// Bytes queued and not yet rendered
    #[must_use]
    pub fn available_bytes(&self) -> usize {
        self.queue.lock().available
    }

    /// Playback time of the queued audio
    #[must_use]
    pub fn queued_duration(&self) -> Duration {
        self.format.duration_of(self.available_bytes())
    }

    /// Bytes ever queued, including rendered ones
    #[must_use]
    pub fn total_queued_bytes(&self) -> u64 {
        self.total_queued.load(Ordering::Relaxed)
    }
}
