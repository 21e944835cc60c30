use gamelist_core::form::FormError;
use gamelist_core::queue::QueueError;

/// Errors surfaced by the record store and the views built on it.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The store could not be reached or did not answer in time.
    NetworkFailure(String),
    /// The store answered with a non-success status.
    ServerRejected { status: u16, message: String },
    /// A pending operation was dropped because its local state was replaced.
    StaleState(String),
    NotFound(String),
    /// The response body did not match the expected shape.
    Decode(String),
    Form(FormError),
    Queue(QueueError),
}

impl ClientError {
    /// Whether the error came from the store rather than from local input.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::NetworkFailure(_) | Self::ServerRejected { .. } | Self::NotFound(_) | Self::Decode(_)
        )
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkFailure(msg) => write!(f, "Network failure: {msg}"),
            Self::ServerRejected { status, message } => {
                write!(f, "Server rejected request ({status}): {message}")
            },
            Self::StaleState(msg) => write!(f, "Stale state: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Decode(msg) => write!(f, "Invalid response: {msg}"),
            Self::Form(e) => write!(f, "{e}"),
            Self::Queue(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Form(e) => Some(e),
            Self::Queue(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FormError> for ClientError {
    fn from(e: FormError) -> Self {
        Self::Form(e)
    }
}

impl From<QueueError> for ClientError {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}
