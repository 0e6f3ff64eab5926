//! Error types for the Voxwire speech-proxy client.

/// Result type alias for Voxwire operations
pub type VoxwireResult<T> = Result<T, VoxwireError>;

/// Failure while demuxing a RIFF/WAVE container
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxError {
    /// Missing RIFF/WAVE magic or buffer too short to hold a minimal container
    #[error("container header is missing or malformed")]
    BadHeader,

    /// Not uncompressed 16-bit PCM, or no data chunk
    #[error("unsupported audio format (expecting PCM16 with a data chunk)")]
    UnsupportedFormat,

    /// A chunk declares more bytes than the buffer holds
    #[error("chunk extends past the end of the container")]
    Truncated,
}

/// Failure while creating or feeding a playback buffer
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Sample rate, channel count or payload unusable for playback
    #[error("invalid sink parameters: {message}")]
    InvalidParameters {
        /// What was wrong with the parameters
        message: String,
    },
}

impl SinkError {
    /// Create a new invalid parameters error
    #[must_use]
    pub fn invalid_parameters<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }
}

/// Main error type for Voxwire operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VoxwireError {
    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// The request never produced a usable response
    #[error("Transport error ({status_code}): {message}")]
    TransportError {
        /// Error message describing the transport failure
        message: String,
        /// Response status, 0 when nothing was received
        status_code: u16,
    },

    /// The proxy answered, but not with playable audio
    #[error("Protocol error ({status_code}): {message}")]
    ProtocolError {
        /// Server-supplied or synthesized message
        message: String,
        /// HTTP status or local classification code
        status_code: u16,
    },

    /// Container demux error
    #[error("Demux error: {0}")]
    Demux(#[from] DemuxError),

    /// Playback buffer error
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// File I/O error
    #[error("File I/O error: {message}")]
    FileError {
        /// Error message describing the file operation failure
        message: String,
    },

    /// Thread or runtime error
    #[error("Concurrency error: {message}")]
    ConcurrencyError {
        /// Error message describing the concurrency issue
        message: String,
    },
}

impl VoxwireError {
    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new transport error
    #[must_use]
    pub fn transport<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::TransportError {
            message: message.into(),
            status_code,
        }
    }

    /// Create a new protocol error
    #[must_use]
    pub fn protocol<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::ProtocolError {
            message: message.into(),
            status_code,
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new file error
    #[must_use]
    pub fn file<S: Into<String>>(message: S) -> Self {
        Self::FileError {
            message: message.into(),
        }
    }

    /// Create a new concurrency error
    #[must_use]
    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        Self::ConcurrencyError {
            message: message.into(),
        }
    }

    /// Status code carried by request errors, 0 for local failures
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::TransportError { status_code, .. } | Self::ProtocolError { status_code, .. } => {
                *status_code
            }
            _ => 0,
        }
    }

    /// Check if this error is retriable
    ///
    /// Nothing is retried automatically; this is a hint for callers.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::TransportError { .. })
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::ConfigurationError { .. }
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "input",
            Self::TransportError { .. } => "transport",
            Self::ProtocolError { .. } => "protocol",
            Self::Demux(_) => "demux",
            Self::Sink(_) => "sink",
            Self::ConfigurationError { .. } => "configuration",
            Self::FileError { .. } => "file",
            Self::ConcurrencyError { .. } => "concurrency",
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for VoxwireError {
    fn from(err: std::io::Error) -> Self {
        Self::file(err.to_string())
    }
}

impl From<toml::de::Error> for VoxwireError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("Invalid TOML: {err}"))
    }
}

impl From<serde_json::Error> for VoxwireError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON serialization error: {err}"))
    }
}
