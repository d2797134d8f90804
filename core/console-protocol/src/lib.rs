//! Wire types for the console session-status endpoint.
//!
//! This crate is shared by the navigation core and any host shell to prevent
//! schema drift. The endpoint speaks plain text: an empty body means no
//! session, the literal `booting` means the server is still initializing,
//! and an active session is a colon-delimited triple
//! `subjectId:sessionId:lastAccessEpochMillis`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Literal body returned while server startup has not finished. Callers must
/// present this as a "server initializing" condition, not a login failure.
pub const BOOTING_BODY: &str = "booting";

/// Header asking the status endpoint to refresh the server-side last-access
/// time without any other side effect.
pub const HEADER_LAST_ACCESS_UPDATE: &str = "console_last_access_update";

/// Header asking the status endpoint to update the linked external-identity
/// record for the given session id.
pub const HEADER_WEB_IDENTITY_UPDATE: &str = "console_webuser_update";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("status body has {found} fields, expected 3")]
    FieldCount { found: usize },

    #[error("malformed subject id {value:?}")]
    BadSubjectId { value: String },

    #[error("malformed last-access timestamp {value:?}")]
    BadLastAccess { value: String },

    #[error("empty session id in status body")]
    EmptySessionId,
}

/// One active-session triple from the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAccess {
    pub subject_id: i64,
    pub session_id: String,
    pub last_access_ms: i64,
}

impl SessionAccess {
    /// Last-access instant as a UTC timestamp, when representable.
    pub fn last_access_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.last_access_ms).single()
    }
}

/// Parsed response body of the session-status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusBody {
    /// No server-side session exists.
    Empty,
    /// Server startup has not completed.
    Booting,
    /// A live session.
    Active(SessionAccess),
}

/// Parses a raw status-endpoint body.
///
/// Leading/trailing whitespace is tolerated; the `booting` sentinel is
/// matched on the prefix because some servlet containers append boot
/// progress after the literal.
pub fn parse_status_body(body: &str) -> Result<StatusBody, WireError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(StatusBody::Empty);
    }
    if body.starts_with(BOOTING_BODY) {
        return Ok(StatusBody::Booting);
    }

    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() != 3 {
        return Err(WireError::FieldCount { found: parts.len() });
    }

    let subject_id = parts[0].parse::<i64>().map_err(|_| WireError::BadSubjectId {
        value: parts[0].to_string(),
    })?;
    if parts[1].is_empty() {
        return Err(WireError::EmptySessionId);
    }
    let last_access_ms = parts[2]
        .parse::<i64>()
        .map_err(|_| WireError::BadLastAccess {
            value: parts[2].to_string(),
        })?;

    Ok(StatusBody::Active(SessionAccess {
        subject_id,
        session_id: parts[1].to_string(),
        last_access_ms,
    }))
}

/// Encodes a status body the way the endpoint would emit it.
pub fn encode_status_body(body: &StatusBody) -> String {
    match body {
        StatusBody::Empty => String::new(),
        StatusBody::Booting => BOOTING_BODY.to_string(),
        StatusBody::Active(access) => format!(
            "{}:{}:{}",
            access.subject_id, access.session_id, access.last_access_ms
        ),
    }
}

/// Side-effect selectors for a status request, mapped to request headers by
/// the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatusOptions {
    /// Refresh the server-side last-access time (keepalive ping).
    pub refresh_last_access: bool,
    /// Update the linked external-identity record for this session id.
    pub update_web_identity: Option<String>,
}

impl CheckStatusOptions {
    pub fn keepalive() -> Self {
        Self {
            refresh_last_access: true,
            update_web_identity: None,
        }
    }

    /// Header name/value pairs the transport should attach.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if self.refresh_last_access {
            headers.push((HEADER_LAST_ACCESS_UPDATE, "1".to_string()));
        }
        if let Some(session_id) = &self.update_web_identity {
            headers.push((HEADER_WEB_IDENTITY_UPDATE, session_id.clone()));
        }
        headers
    }
}
