//! Document status lifecycle.
//!
//! Transitions are caller-driven; nothing moves a document automatically and
//! nothing moves it back to `Draft`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Signed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot move a document from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("archived documents cannot be sent")]
    SendArchived,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Signed => "signed",
            DocumentStatus::Archived => "archived",
        }
    }

    pub fn can_transition(self, to: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, to),
            (Draft, Sent) | (Draft, Signed) | (Sent, Signed) | (_, Archived)
        )
    }

    /// Move to `to`, or explain why that is not a defined transition.
    pub fn transition(self, to: DocumentStatus) -> Result<DocumentStatus, LifecycleError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(LifecycleError::InvalidTransition { from: self, to })
        }
    }

    /// Status after the document was mailed to its counterparty.
    ///
    /// A draft becomes `Sent`; sent and signed documents keep their status.
    pub fn after_dispatch(self) -> Result<DocumentStatus, LifecycleError> {
        match self {
            DocumentStatus::Draft => Ok(DocumentStatus::Sent),
            DocumentStatus::Sent | DocumentStatus::Signed => Ok(self),
            DocumentStatus::Archived => Err(LifecycleError::SendArchived),
        }
    }

    /// Archived documents drop out of default listings and the share channel.
    pub fn is_archived(self) -> bool {
        self == DocumentStatus::Archived
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown document status {0:?} (expected draft, sent, signed or archived)")]
pub struct UnknownStatus(pub String);

impl FromStr for DocumentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(DocumentStatus::Draft),
            "sent" => Ok(DocumentStatus::Sent),
            "signed" => Ok(DocumentStatus::Signed),
            "archived" => Ok(DocumentStatus::Archived),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentStatus::*;
    use super::*;

    const ALL: [DocumentStatus; 4] = [Draft, Sent, Signed, Archived];

    #[test]
    fn defined_transitions() {
        assert_eq!(Draft.transition(Sent), Ok(Sent));
        assert_eq!(Draft.transition(Signed), Ok(Signed));
        assert_eq!(Sent.transition(Signed), Ok(Signed));
        for from in ALL {
            assert_eq!(from.transition(Archived), Ok(Archived));
        }
    }

    #[test]
    fn nothing_returns_to_draft() {
        for from in ALL {
            assert_eq!(
                from.transition(Draft),
                Err(LifecycleError::InvalidTransition { from, to: Draft })
            );
        }
    }

    #[test]
    fn archived_and_signed_are_terminal_apart_from_archiving() {
        assert!(Archived.transition(Sent).is_err());
        assert!(Archived.transition(Signed).is_err());
        assert!(Signed.transition(Sent).is_err());
        assert!(Sent.transition(Sent).is_err());
    }

    #[test]
    fn dispatch_promotes_drafts_only() {
        assert_eq!(Draft.after_dispatch(), Ok(Sent));
        assert_eq!(Sent.after_dispatch(), Ok(Sent));
        assert_eq!(Signed.after_dispatch(), Ok(Signed));
        assert_eq!(Archived.after_dispatch(), Err(LifecycleError::SendArchived));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Signed".parse::<DocumentStatus>().unwrap(), Signed);
        assert!("void".parse::<DocumentStatus>().is_err());
        for status in ALL {
            assert_eq!(status.as_str().parse::<DocumentStatus>().unwrap(), status);
        }
    }
}
