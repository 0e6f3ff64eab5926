//! # Voxwire Core
//!
//! Client side of a text-to-speech proxy: send text, get back playable PCM16.
//!
//! ## Features
//!
//! - Asynchronous `text-ask` requests with one classified outcome per request
//! - Bounds-checked RIFF/WAVE demuxing of the proxy's audio responses
//! - Procedural playback buffers that accept appends while rendering
//! - Multi-subscriber completion and error notifications
//! - PCM16 WAV writing for saving received speech
//!
//! ## Example
//!
//! ```rust,no_run
//! use voxwire_core::{Outcome, ProxyClient, ProxyConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProxyConfig::new("http://127.0.0.1:3000").with_generated_session_id();
//!     let client = ProxyClient::new(config)?;
//!
//!     client.on_error().subscribe(|e| eprintln!("proxy error {}: {}", e.status_code, e.message));
//!
//!     if let Outcome::Success { wave, .. } = client.text_ask_fast("Hello, world!").wait().await {
//!         let mut period = vec![0u8; 4096];
//!         let rendered = wave.render(&mut period);
//!         println!("rendered {rendered} bytes at {} Hz", wave.sample_rate());
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod runtime;
pub mod sound_wave;
pub mod wav_reader;
pub mod wav_writer;

// Re-export main types for convenience
pub use audio::{AudioFormat, DecodedAudio};
pub use client::{Outcome, PendingAsk, ProxyClient, ACCURATE_MODE, DEFAULT_MODE};
pub use config::ProxyConfig;
pub use error::{DemuxError, SinkError, VoxwireError, VoxwireResult};
pub use events::{Delegate, ProxyError, SubscriptionId, TextAskDone};
pub use runtime::RuntimeManager;
pub use sound_wave::{SinkHandle, SoundGroup, SoundWave};
pub use wav_reader::ContainerInfo;
pub use wav_writer::{WavSpec, WavWriter};

/// Version information for the voxwire-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
