use thiserror::Error;

/// Coarse category of a [`PhoenixError`], exposed so external surfaces (web
/// dashboard, HTTP API, CLI) can match on a stable discriminator instead of
/// string-matching `Display` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DeviceNotFound,
    Transport,
    Pec,
    Timeout,
    InvalidArgument,
    UnsupportedOperation,
    PartialWrite,
    UnknownHandle,
}

/// Recoverable transport-layer failure categories. `Nak` is never retried by
/// the transport; `BusError` and `FramingError` are treated as transient and
/// retried per [`crate::transport::RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Nak,
    BusError,
    FramingError,
    AdapterNotFound,
    AdapterBusy,
}

impl TransportErrorKind {
    /// Whether the transport layer should retry an operation that failed
    /// with this kind of error.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::BusError | Self::FramingError)
    }
}

/// The single error type for the Phoenix core. Every fallible operation in
/// this crate returns `Result<T, PhoenixError>`. The façade never swallows a
/// lower-layer error; it only enriches `context` with the operation that was
/// in flight.
#[derive(Debug, Error)]
pub enum PhoenixError {
    #[error("no device responded at address {0:#04x}")]
    DeviceNotFound(u8),

    #[error("transport error ({kind:?}): {context}")]
    Transport {
        kind: TransportErrorKind,
        context: String,
    },

    #[error("PEC mismatch: expected {expected:#04x}, computed {computed:#04x}")]
    Pec { expected: u8, computed: u8 },

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error(
        "partial write at register {0:#06x}: read-modify-write was interrupted before the write completed"
    )]
    PartialWrite(u32),

    #[error("unknown device handle {0}")]
    UnknownHandle(u32),
}

impl PhoenixError {
    /// Stable category for programmatic matching, independent of the
    /// human-readable `message`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceNotFound(_) => ErrorKind::DeviceNotFound,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Pec { .. } => ErrorKind::Pec,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::PartialWrite(_) => ErrorKind::PartialWrite,
            Self::UnknownHandle(_) => ErrorKind::UnknownHandle,
        }
    }

    /// Human-readable message, suitable for the `message` field of an
    /// external surface's structured result object.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Builds a `Transport` error. `pub` so external `Transport`
    /// implementations (e.g. `phoenix-mock`) can construct the same error
    /// shape this crate's own transports use.
    pub fn transport(kind: TransportErrorKind, context: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PhoenixError>;
