//! Error types for console-core operations.

/// All errors that can occur in the navigation and session core.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    // ─────────────────────────────────────────────────────────────────────
    // View path errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("malformed path segment {segment:?}: {details}")]
    MalformedSegment { segment: String, details: String },

    #[error("identifier segment {segment:?} has no preceding named segment")]
    DanglingIdentifier { segment: String },

    // ─────────────────────────────────────────────────────────────────────
    // Navigation errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("no registered view named {0:?}")]
    UnknownView(String),

    #[error("content load for view {view:?} failed: {details}")]
    ContentLoadFailed { view: String, details: String },

    #[error("view {view:?} did not initialize within {timeout_ms} ms")]
    InitializeTimeout { view: String, timeout_ms: u64 },

    /// A render targeted a view that newer navigation has replaced. Benign;
    /// callers drop it with a debug log rather than surfacing it.
    #[error("view {obsolete_view:?} was superseded before rendering completed")]
    ViewSuperseded { obsolete_view: String },

    // ─────────────────────────────────────────────────────────────────────
    // Session errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("cannot determine login status: {details}")]
    CannotDetermineStatus { details: String },

    #[error("session-status response malformed: {source}")]
    StatusWire {
        #[from]
        source: console_session_protocol::WireError,
    },

    #[error("session service call failed: {context}: {details}")]
    Service { context: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using ConsoleError.
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl ConsoleError {
    pub fn service(context: impl Into<String>, details: impl Into<String>) -> Self {
        ConsoleError::Service {
            context: context.into(),
            details: details.into(),
        }
    }
}
