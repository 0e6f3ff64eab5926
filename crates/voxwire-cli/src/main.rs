//! Send one text-ask request to the speech proxy and report the result.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use voxwire_core::wav_reader;
use voxwire_core::{DecodedAudio, ProxyClient, ProxyConfig, ACCURATE_MODE, DEFAULT_MODE};

/// Voxwire speech proxy client
#[derive(Parser, Debug)]
#[command(name = "voxwire-ask", version)]
#[command(about = "Ask the speech proxy to speak some text", long_about = None)]
struct Args {
    /// Text to synthesize
    #[arg(required_unless_present = "inspect")]
    text: Option<String>,

    /// Synthesis mode ("fast" or "accurate")
    #[arg(short, long, default_value = DEFAULT_MODE)]
    mode: String,

    /// Shorthand for the slower, higher quality mode
    #[arg(long, conflicts_with = "mode")]
    accurate: bool,

    /// Proxy address, overrides the config file
    #[arg(short, long)]
    base_url: Option<String>,

    /// Client token sent as X-Client-Token
    #[arg(long)]
    token: Option<String>,

    /// Session id sent as X-Session-Id
    #[arg(long, conflicts_with = "new_session")]
    session: Option<String>,

    /// Use a freshly generated session id
    #[arg(long)]
    new_session: bool,

    /// TOML file with base_url, client_token and session_id
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the received speech to this WAV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Describe a local WAV file instead of sending a request
    #[arg(long, conflicts_with = "text")]
    inspect: Option<PathBuf>,
}

impl Args {
    fn synthesis_mode(&self) -> &str {
        if self.accurate {
            ACCURATE_MODE
        } else {
            &self.mode
        }
    }

    fn proxy_config(&self) -> anyhow::Result<ProxyConfig> {
        let mut config = match &self.config {
            Some(path) => ProxyConfig::from_file(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(token) = &self.token {
            config = config.with_client_token(token.clone());
        }
        if let Some(session) = &self.session {
            config = config.with_session_id(session.clone());
        }
        if self.new_session {
            config = config.with_generated_session_id();
        }

        config.validate()?;
        Ok(config)
    }
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let info = wav_reader::probe(&bytes).with_context(|| format!("{} is not a usable WAV file", path.display()))?;

    println!("{}", path.display());
    println!("  format code:  {}", info.format_code);
    println!("  channels:     {}", info.channels);
    println!("  sample rate:  {} Hz", info.sample_rate);
    println!("  bits/sample:  {}", info.bits_per_sample);
    println!("  data:         {} bytes at offset {}", info.data_size, info.data_offset);
    for chunk in &info.chunks {
        println!("  chunk '{}':   {} bytes", chunk.tag(), chunk.size);
    }

    if info.data_truncated {
        bail!("data chunk runs past the end of the file");
    }
    if !info.is_playable() {
        bail!("not playable: expecting 16-bit PCM with 1 or 2 channels");
    }
    println!("  playable");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    debug!(?args, "parsed arguments");

    if let Some(path) = &args.inspect {
        return inspect(path);
    }

    let config = args.proxy_config()?;
    info!("Using proxy at {}", config.base_url);
    let client = ProxyClient::new(config)?;

    let text = args.text.as_deref().unwrap_or_default();
    let wave = client
        .text_ask(text, args.synthesis_mode())
        .wait()
        .await
        .into_result()
        .context("text-ask failed")?;

    let format = wave.format();
    let duration = wave.queued_duration();
    println!(
        "Received {} bytes of {} ({:.2}s)",
        wave.available_bytes(),
        format,
        duration.as_secs_f64()
    );

    if let Some(path) = &args.output {
        let mut samples = vec![0u8; wave.available_bytes()];
        let rendered = wave.render(&mut samples);
        samples.truncate(rendered);

        let audio = DecodedAudio::new(format, samples);
        audio
            .save_wav(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} frames to {}", audio.frame_count(), path.display());
    }

    Ok(())
}
