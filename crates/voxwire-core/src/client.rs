//! Text-ask client for the speech proxy.
//!
//! [`ProxyClient::text_ask`] returns immediately. The request runs on a
//! Tokio runtime and finishes with exactly one [`Outcome`], which is both
//! broadcast through the client's delegates and delivered to the returned
//! [`PendingAsk`].

use crate::config::ProxyConfig;
use crate::error::{VoxwireError, VoxwireResult};
use crate::events::{Delegate, ProxyError, TextAskDone};
use crate::runtime::RuntimeManager;
use crate::sound_wave::{SinkHandle, SoundWave};
use crate::wav_reader;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, info_span, warn, Instrument};

/// Synthesis mode used when none is given
pub const DEFAULT_MODE: &str = "fast";

/// Slower, higher quality synthesis mode
pub const ACCURATE_MODE: &str = "accurate";

/// Header carrying the static client token
pub const CLIENT_TOKEN_HEADER: &str = "X-Client-Token";

/// Header carrying the session id
pub const SESSION_ID_HEADER: &str = "X-Session-Id";

/// Reported when `text_ask` is called without text
pub const EMPTY_TEXT_MESSAGE: &str = "TextAsk: empty text";

/// Reported when no usable response arrived
pub const NO_RESPONSE_MESSAGE: &str = "Request failed or no response";

/// Reported when a 200 body is not a PCM16 container
pub const WAV_PARSE_FAILED_MESSAGE: &str = "WAV parse failed (expecting PCM16)";

/// Status code paired with [`WAV_PARSE_FAILED_MESSAGE`]
pub const WAV_PARSE_FAILED_STATUS: u16 = 415;

/// Reported when decoded audio cannot back a playback buffer
pub const SOUND_WAVE_FAILED_MESSAGE: &str = "Failed to create SoundWave";

/// Status code paired with [`SOUND_WAVE_FAILED_MESSAGE`]
pub const SOUND_WAVE_FAILED_STATUS: u16 = 500;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Terminal result of one text-ask request
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Audio decoded and queued for playback
    Success {
        /// Buffer ready for playback
        wave: SinkHandle,
        /// HTTP status (200)
        status_code: u16,
    },
    /// The proxy answered with an error, or with audio that cannot be played
    ProtocolError {
        /// Raw JSON error body or synthesized description
        message: String,
        /// HTTP status or 415/500 for decode and buffer failures
        status_code: u16,
    },
    /// No usable response, or the request was never sent
    TransportError {
        /// Description of the failure
        message: String,
        /// Response status if one arrived, otherwise 0
        status_code: u16,
    },
}

impl Outcome {
    fn protocol<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::ProtocolError {
            message: message.into(),
            status_code,
        }
    }

    fn transport<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::TransportError {
            message: message.into(),
            status_code,
        }
    }

    /// Status code of the outcome; 0 means nothing was sent or received
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Success { status_code, .. }
            | Self::ProtocolError { status_code, .. }
            | Self::TransportError { status_code, .. } => *status_code,
        }
    }

    /// Error message, `None` on success
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::ProtocolError { message, .. } | Self::TransportError { message, .. } => {
                Some(message)
            }
        }
    }

    /// Whether the request produced playable audio
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The playback buffer, if any
    #[must_use]
    pub const fn wave(&self) -> Option<&SinkHandle> {
        match self {
            Self::Success { wave, .. } => Some(wave),
            _ => None,
        }
    }

    /// The error event this outcome broadcasts, if it is a failure
    #[must_use]
    pub fn as_error(&self) -> Option<ProxyError> {
        self.message().map(|message| ProxyError {
            message: message.to_string(),
            status_code: self.status_code(),
        })
    }

    /// Convert into a `Result` for use with `?`
    ///
    /// # Errors
    ///
    /// Returns the matching [`VoxwireError`] for failure outcomes
    pub fn into_result(self) -> VoxwireResult<SinkHandle> {
        match self {
            Self::Success { wave, .. } => Ok(wave),
            Self::ProtocolError {
                message,
                status_code,
            } => Err(VoxwireError::protocol(message, status_code)),
            Self::TransportError {
                message,
                status_code,
            } => Err(VoxwireError::transport(message, status_code)),
        }
    }
}

/// Completion of one in-flight request
#[derive(Debug)]
pub struct PendingAsk {
    rx: oneshot::Receiver<Outcome>,
}

impl PendingAsk {
    fn resolved(outcome: Outcome) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(outcome);
        Self { rx }
    }

    /// Wait for the outcome
    ///
    /// If the request task was torn down before finishing (runtime shut
    /// down), this yields a transport error with status 0.
    pub async fn wait(self) -> Outcome {
        self.rx.await.unwrap_or_else(|_| {
            Outcome::transport("Request task ended without a response", 0)
        })
    }

    /// Take the outcome if it has arrived
    ///
    /// Returns `Some` at most once.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        self.rx.try_recv().ok()
    }
}

/// JSON body of a text-ask request
#[derive(Debug, Serialize)]
struct TextAskBody<'a> {
    text: &'a str,
    mode: &'a str,
}

/// State shared by the client and its in-flight requests
#[derive(Debug)]
struct Shared {
    http: reqwest::Client,
    url: Url,
    client_token: Option<HeaderValue>,
    session_id: Option<HeaderValue>,
    on_text_ask_done: Delegate<TextAskDone>,
    on_error: Delegate<ProxyError>,
    next_request_id: AtomicU64,
}

impl Shared {
    async fn execute(&self, text: &str, mode: &str) -> Outcome {
        let body = match serde_json::to_vec(&TextAskBody { text, mode }) {
            Ok(body) => body,
            Err(e) => {
                let err = VoxwireError::from(e);
                warn!("cannot encode text-ask body: {}", err);
                return Outcome::transport(err.to_string(), 0);
            }
        };

        let mut request = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body);
        if let Some(token) = &self.client_token {
            request = request.header(CLIENT_TOKEN_HEADER, token.clone());
        }
        if let Some(session) = &self.session_id {
            request = request.header(SESSION_ID_HEADER, session.clone());
        }

        debug!(url = %self.url, mode, chars = text.chars().count(), "sending text-ask");

        match request.send().await {
            Ok(response) => classify_response(response).await,
            Err(e) => {
                let status_code = e.status().map_or(0, |s| s.as_u16());
                warn!("text-ask request failed: {}", e);
                Outcome::transport(NO_RESPONSE_MESSAGE, status_code)
            }
        }
    }

    fn notify(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Success { wave, status_code } => {
                self.on_text_ask_done.broadcast(&TextAskDone {
                    wave: Arc::clone(wave),
                    status_code: *status_code,
                });
            }
            _ => {
                if let Some(error) = outcome.as_error() {
                    self.on_error.broadcast(&error);
                }
            }
        }
    }
}

async fn classify_response(response: reqwest::Response) -> Outcome {
    let status_code = response.status().as_u16();

    if status_code != 200 {
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains(JSON_CONTENT_TYPE));

        if !is_json {
            return Outcome::protocol(format!("HTTP {status_code} (non-OK)"), status_code);
        }
        return match response.text().await {
            Ok(body) => Outcome::protocol(body, status_code),
            Err(e) => {
                warn!("failed to read error body: {}", e);
                Outcome::transport(NO_RESPONSE_MESSAGE, status_code)
            }
        };
    }

    match response.bytes().await {
        Ok(body) => decode_body(&body),
        Err(e) => {
            warn!("failed to read audio body: {}", e);
            Outcome::transport(NO_RESPONSE_MESSAGE, status_code)
        }
    }
}

/// Turn a 200 response body into a playable wave
///
/// Demux failures map to a 415 protocol error, buffer creation failures to
/// a 500 protocol error.
#[must_use]
pub fn decode_body(body: &[u8]) -> Outcome {
    let audio = match wav_reader::parse(body) {
        Ok(audio) => audio,
        Err(e) => {
            warn!(bytes = body.len(), "rejecting response body: {}", e);
            return Outcome::protocol(WAV_PARSE_FAILED_MESSAGE, WAV_PARSE_FAILED_STATUS);
        }
    };

    match SoundWave::from_decoded(audio) {
        Ok(wave) => Outcome::Success {
            wave,
            status_code: 200,
        },
        Err(e) => {
            warn!("cannot create sound wave: {}", e);
            Outcome::protocol(SOUND_WAVE_FAILED_MESSAGE, SOUND_WAVE_FAILED_STATUS)
        }
    }
}

/// Client for the speech proxy's text-ask endpoint
///
/// Cloning is cheap; clones share delegates and the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    shared: Arc<Shared>,
    config: ProxyConfig,
    runtime: Handle,
}

impl ProxyClient {
    /// Create a client that runs requests on the current or shared runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no runtime is available
    pub fn new(config: ProxyConfig) -> VoxwireResult<Self> {
        Self::with_runtime(config, RuntimeManager::handle()?)
    }

    /// Create a client that runs requests on `runtime`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client cannot be built
    pub fn with_runtime(config: ProxyConfig, runtime: Handle) -> VoxwireResult<Self> {
        config.validate()?;

        let header = |value: &str| -> VoxwireResult<Option<HeaderValue>> {
            if value.is_empty() {
                return Ok(None);
            }
            HeaderValue::from_str(value)
                .map(Some)
                .map_err(|e| VoxwireError::configuration(e.to_string()))
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| VoxwireError::configuration(format!("Failed to build HTTP client: {e}")))?;

        let shared = Shared {
            http,
            url: config.text_ask_url()?,
            client_token: header(&config.client_token)?,
            session_id: header(&config.session_id)?,
            on_text_ask_done: Delegate::new(),
            on_error: Delegate::new(),
            next_request_id: AtomicU64::new(1),
        };
        info!("Created proxy client for {}", shared.url);

        Ok(Self {
            shared: Arc::new(shared),
            config,
            runtime,
        })
    }

    /// Settings this client was built from
    #[must_use]
    pub const fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Fired with the wave and status code after each successful request
    #[must_use]
    pub fn on_text_ask_done(&self) -> &Delegate<TextAskDone> {
        &self.shared.on_text_ask_done
    }

    /// Fired with message and status code after each failed request
    #[must_use]
    pub fn on_error(&self) -> &Delegate<ProxyError> {
        &self.shared.on_error
    }

    /// Ask the proxy to speak `text`
    ///
    /// Returns at once. Empty `text` fails without touching the network:
    /// the error delegate fires before this returns and the pending ask is
    /// already resolved. An empty `mode` means [`DEFAULT_MODE`].
    pub fn text_ask(&self, text: &str, mode: &str) -> PendingAsk {
        if text.is_empty() {
            warn!("{}", EMPTY_TEXT_MESSAGE);
            let outcome = Outcome::transport(EMPTY_TEXT_MESSAGE, 0);
            self.shared.notify(&outcome);
            return PendingAsk::resolved(outcome);
        }

        let mode = if mode.is_empty() { DEFAULT_MODE } else { mode }.to_owned();
        let text = text.to_owned();
        let request_id = self.shared.next_request_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        let (tx, rx) = oneshot::channel();

        self.runtime.spawn(
            async move {
                let started = Instant::now();
                let outcome = shared.execute(&text, &mode).await;
                info!(
                    status = outcome.status_code(),
                    success = outcome.is_success(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "text-ask finished"
                );
                shared.notify(&outcome);
                // The caller may have dropped its PendingAsk; the delegates already fired.
                let _ = tx.send(outcome);
            }
            .instrument(info_span!("text_ask", request_id)),
        );

        PendingAsk { rx }
    }

    /// [`ProxyClient::text_ask`] with the default mode
    pub fn text_ask_fast(&self, text: &str) -> PendingAsk {
        self.text_ask(text, DEFAULT_MODE)
    }
}
