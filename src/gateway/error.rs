//! Error taxonomy for gateway operations.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by gateway operations.
///
/// The four wire-facing variants map one-to-one onto the failure classes the
/// stores react to: `Auth` forces a logout, `Validation` is surfaced inline
/// without touching state, `NotFound` triggers a corrective re-fetch, and
/// `Network` is a transient, user-dismissible notice.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credential missing, invalid, or expired.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The backend rejected the request payload.
    #[error("validation rejected: {0}")]
    Validation(String),

    /// The target resource does not exist (or is not owned by the caller).
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure, timeout, or unexpected backend response.
    #[error("network error: {0}")]
    Network(String),

    /// The client itself is misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Map an unsuccessful HTTP status onto the error taxonomy.
    #[must_use]
    pub fn from_status(status: StatusCode, detail: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth(detail),
            StatusCode::NOT_FOUND => Self::NotFound(detail),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(detail),
            _ => Self::Network(format!("{status}: {detail}")),
        }
    }

    /// Whether the credential should be considered dead.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Whether the target resource vanished server-side.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Convenience result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(GatewayError::from_status(StatusCode::UNAUTHORIZED, String::new()).is_auth());
        assert!(GatewayError::from_status(StatusCode::FORBIDDEN, String::new()).is_auth());
        assert!(GatewayError::from_status(StatusCode::NOT_FOUND, String::new()).is_not_found());
        assert!(matches!(
            GatewayError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "empty content".to_string()),
            GatewayError::Validation(_)
        ));
        assert!(matches!(
            GatewayError::from_status(StatusCode::BAD_REQUEST, String::new()),
            GatewayError::Validation(_)
        ));
        assert!(matches!(
            GatewayError::from_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            GatewayError::Network(_)
        ));
    }

    #[test]
    fn test_detail_is_preserved_in_message() {
        let err = GatewayError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            "duplicate username".to_string(),
        );
        assert!(err.to_string().contains("duplicate username"));
    }
}
