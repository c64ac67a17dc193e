//! User-facing notices for session outcomes.

use std::fmt;

use crate::client::ClientError;
use crate::selection::SelectionId;
use crate::session::{ErrorKind, SessionError};

/// Notice wording.
#[derive(Debug, Clone)]
pub struct Messages {
    pub extraction_complete: &'static str,
    pub extraction_failed: &'static str,
    pub connection_error: &'static str,
    pub page_timeout: &'static str,
    pub image_decode_failed: &'static str,
    pub busy: &'static str,
    pub scale_set: &'static str,
    pub selection_deleted: &'static str,
    pub history_cleared: &'static str,
}

pub static MESSAGES: Messages = Messages {
    extraction_complete: "Extraction complete!",
    extraction_failed: "Extraction failed",
    connection_error: "Connection error: Could not reach the backend server. Make sure it is running.",
    page_timeout: "Timeout: The drawing is taking too long to display. Try reducing zoom or checking the file size.",
    image_decode_failed: "The server sent the data, but it could not be displayed as an image.",
    busy: "Please wait for the current request to finish.",
    scale_set: "Scale set",
    selection_deleted: "Selection deleted",
    history_cleared: "All selections cleared",
};

/// How prominently a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational or correctable; may disappear on its own
    Transient,
    /// Needs attention before continuing
    Blocking,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Transient,
            message: message.into(),
        }
    }

    pub fn blocking(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Blocking,
            message: message.into(),
        }
    }

    pub fn extraction_complete(id: SelectionId) -> Self {
        Self::transient(format!("{} ({})", MESSAGES.extraction_complete, id))
    }

    pub fn scale_set(description: &str) -> Self {
        Self::transient(format!("{}: {}", MESSAGES.scale_set, description))
    }

    pub fn selection_deleted(id: SelectionId) -> Self {
        Self::transient(format!("{} {}", MESSAGES.selection_deleted, id))
    }

    pub fn history_cleared() -> Self {
        Self::transient(MESSAGES.history_cleared)
    }

    /// Notice for a failed extraction. Backend failures carry the server's
    /// own detail.
    pub fn from_extraction_error(err: &SessionError) -> Self {
        match err {
            SessionError::Backend(ClientError::Network(_)) => {
                Self::blocking(MESSAGES.connection_error)
            }
            SessionError::Backend(e) => {
                Self::blocking(format!("{}: {}", MESSAGES.extraction_failed, e.detail()))
            }
            other => Self::from_error(other),
        }
    }

    /// Notice for a failed page load.
    pub fn from_page_error(err: &SessionError) -> Self {
        match err {
            SessionError::Backend(ClientError::Network(_)) => {
                Self::blocking(MESSAGES.connection_error)
            }
            SessionError::Backend(e) => Self::blocking(e.detail()),
            other => Self::from_error(other),
        }
    }

    /// Generic mapping by error kind.
    pub fn from_error(err: &SessionError) -> Self {
        match err.kind() {
            ErrorKind::Input => Self::transient(err.to_string()),
            ErrorKind::Busy => Self::transient(MESSAGES.busy),
            ErrorKind::Network => Self::blocking(MESSAGES.connection_error),
            ErrorKind::Timeout => Self::blocking(MESSAGES.page_timeout),
            ErrorKind::Processing => match err {
                SessionError::ImageDecode(_) => Self::blocking(MESSAGES.image_decode_failed),
                other => Self::blocking(other.to_string()),
            },
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Transient => write!(f, "{}", self.message),
            Severity::Blocking => write!(f, "[!] {}", self.message),
        }
    }
}
