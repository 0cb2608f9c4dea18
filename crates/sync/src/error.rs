//! Save failure taxonomy and classification

use crate::remote::{AuthErrorKind, SaveResponse};
use thiserror::Error;

const AUTH_KEYWORDS: &[&str] = &[
    "unauthorized",
    "unauthenticated",
    "not authenticated",
    "session expired",
    "login required",
];

const PERMISSION_KEYWORDS: &[&str] = &["permission", "forbidden", "access denied", "not found"];

const NETWORK_KEYWORDS: &[&str] = &["timeout", "network", "connection", "offline", "unavailable"];

/// Why a save did not go through
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The session is missing, expired or could not be refreshed
    #[error("Authentication failed ({kind:?}): {message}")]
    Authentication {
        kind: AuthErrorKind,
        message: String,
        /// Set when the transport refreshed the token and asks for a retry
        retryable: bool,
    },

    /// The user may not edit this document
    #[error("{0}")]
    Permission(String),

    /// Timeout, dropped connection or unreachable server
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Cleared when the transport says repeating will not help
        retryable: bool,
    },

    /// The server rejected the diff itself
    #[error("Save rejected: {0}")]
    Validation(String),
}

impl SaveError {
    /// Whether repeating the same request can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SaveError::Authentication { retryable, .. } | SaveError::Network { retryable, .. } => {
                *retryable
            }
            SaveError::Permission(_) | SaveError::Validation(_) => false,
        }
    }

    /// Whether the failure warrants refreshing the local backup
    pub fn endangers_edits(&self) -> bool {
        matches!(
            self,
            SaveError::Authentication { .. } | SaveError::Network { .. }
        )
    }

    fn without_retry(self) -> Self {
        match self {
            SaveError::Network { message, .. } => SaveError::Network {
                message,
                retryable: false,
            },
            SaveError::Authentication { kind, message, .. } => SaveError::Authentication {
                kind,
                message,
                retryable: false,
            },
            other => other,
        }
    }
}

/// Why a fetch did not yield a usable snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Fetch failed: {0}")]
    Remote(SaveError),

    #[error("Malformed fetch response: {0}")]
    Malformed(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Classify a failed save response.
///
/// The auth signal wins, then the transport's retryable hint, then keywords
/// in the message. An explicit "not retryable" keeps the keyword class but
/// never allows a retry.
pub fn classify(response: &SaveResponse) -> SaveError {
    let message = response
        .error
        .clone()
        .unwrap_or_else(|| "Save failed".to_string());

    if let Some(kind) = response.auth_error {
        let retryable = kind == AuthErrorKind::SessionExpired && response.retryable == Some(true);
        return SaveError::Authentication {
            kind,
            message,
            retryable,
        };
    }

    match response.retryable {
        Some(true) => SaveError::Network {
            message,
            retryable: true,
        },
        Some(false) => classify_message(message).without_retry(),
        None => classify_message(message),
    }
}

/// Classify a bare error message by keyword.
///
/// Session problems come first, then access problems, then transport
/// problems; anything else is a rejection of the request itself.
pub fn classify_message(message: impl Into<String>) -> SaveError {
    let message = message.into();
    if matches_any(&message, AUTH_KEYWORDS) {
        let kind = if matches_any(&message, &["expired"]) {
            AuthErrorKind::SessionExpired
        } else {
            AuthErrorKind::SessionMissing
        };
        SaveError::Authentication {
            kind,
            message,
            retryable: false,
        }
    } else if matches_any(&message, PERMISSION_KEYWORDS) {
        SaveError::Permission(message)
    } else if matches_any(&message, NETWORK_KEYWORDS) {
        SaveError::Network {
            message,
            retryable: true,
        }
    } else {
        SaveError::Validation(message)
    }
}

fn matches_any(message: &str, keywords: &[&str]) -> bool {
    let lower = message.to_lowercase();
    keywords.iter().any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_signal_wins() {
        let error = classify(
            &SaveResponse::failed("network timeout").with_auth_error(AuthErrorKind::SessionMissing),
        );
        assert!(matches!(
            error,
            SaveError::Authentication {
                kind: AuthErrorKind::SessionMissing,
                ..
            }
        ));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_expired_session_retries_only_when_flagged() {
        let refreshed = classify(
            &SaveResponse::failed("expired")
                .with_auth_error(AuthErrorKind::SessionExpired)
                .with_retryable(true),
        );
        assert!(refreshed.is_retryable());

        let unflagged =
            classify(&SaveResponse::failed("expired").with_auth_error(AuthErrorKind::SessionExpired));
        assert!(!unflagged.is_retryable());

        let refresh_failed = classify(
            &SaveResponse::failed("expired")
                .with_auth_error(AuthErrorKind::RefreshFailed)
                .with_retryable(true),
        );
        assert!(!refresh_failed.is_retryable());
    }

    #[test]
    fn test_retryable_hint() {
        assert_eq!(
            classify(&SaveResponse::failed("try later").with_retryable(true)),
            SaveError::Network {
                message: "try later".to_string(),
                retryable: true
            }
        );
        let error = classify(&SaveResponse::failed("Forbidden").with_retryable(false));
        assert_eq!(error, SaveError::Permission("Forbidden".to_string()));
    }

    #[test]
    fn test_final_transport_failure_stays_network() {
        let error =
            classify(&SaveResponse::failed("connection reset by peer").with_retryable(false));

        assert_eq!(
            error,
            SaveError::Network {
                message: "connection reset by peer".to_string(),
                retryable: false
            }
        );
        assert!(!error.is_retryable());
        assert!(error.endangers_edits());
        assert_eq!(error.to_string(), "Network error: connection reset by peer");
    }

    #[test]
    fn test_permission_wins_over_network_keywords() {
        let message = "Access denied: request blocked by network policy";

        let error = classify(&SaveResponse::failed(message).with_retryable(false));
        assert_eq!(error, SaveError::Permission(message.to_string()));
        assert_eq!(error.to_string(), message);

        assert_eq!(classify_message(message), SaveError::Permission(message.to_string()));
    }

    #[test]
    fn test_session_keywords_classify_as_authentication() {
        let error = classify_message("401 Unauthorized");
        assert_eq!(
            error,
            SaveError::Authentication {
                kind: AuthErrorKind::SessionMissing,
                message: "401 Unauthorized".to_string(),
                retryable: false
            }
        );
        assert!(error.endangers_edits());

        assert!(matches!(
            classify_message("Session expired, please sign in"),
            SaveError::Authentication {
                kind: AuthErrorKind::SessionExpired,
                retryable: false,
                ..
            }
        ));
    }

    #[test]
    fn test_keywords() {
        assert!(matches!(classify_message("403 Forbidden"), SaveError::Permission(_)));
        assert!(matches!(classify_message("Document not found"), SaveError::Permission(_)));
        assert!(matches!(classify_message("Access denied"), SaveError::Permission(_)));
        assert!(matches!(
            classify_message("Request timeout"),
            SaveError::Network { retryable: true, .. }
        ));
        assert!(matches!(
            classify_message("Service Unavailable"),
            SaveError::Network { retryable: true, .. }
        ));
        assert!(matches!(
            classify_message("option references missing property"),
            SaveError::Validation(_)
        ));
    }

    #[test]
    fn test_missing_message() {
        let error = classify(&SaveResponse::default());
        assert_eq!(error, SaveError::Validation("Save failed".to_string()));
    }

    #[test]
    fn test_permission_message_is_verbatim() {
        let error = classify_message("You do not have permission to edit this document");
        assert_eq!(
            error.to_string(),
            "You do not have permission to edit this document"
        );
    }

    #[test]
    fn test_endangers_edits() {
        assert!(classify_message("offline").endangers_edits());
        assert!(!SaveError::Validation("x".into()).endangers_edits());
        assert!(!SaveError::Permission("x".into()).endangers_edits());
    }
}
