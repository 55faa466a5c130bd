use serde::Deserialize;

/// Message shown for every failure that is not a credentials rejection.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Message shown when the API rejects a username/password pair.
pub const BAD_CREDENTIALS_MESSAGE: &str = "Incorrect username or password.";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("No active session")]
    NoSession,
    #[error("Session store error: {0}")]
    Store(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// User-facing outcome of a failed API call.
///
/// Carries only the message to display. The underlying [`Error`] is logged
/// when the failure is built and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Failure {
    message: &'static str,
}

impl Failure {
    /// The message shown for every failure other than rejected credentials.
    #[must_use]
    pub fn generic() -> Self {
        Self {
            message: GENERIC_MESSAGE,
        }
    }

    /// The message shown when the server rejects a username/password pair.
    #[must_use]
    pub fn bad_credentials() -> Self {
        Self {
            message: BAD_CREDENTIALS_MESSAGE,
        }
    }

    /// The message to show the user.
    #[must_use]
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Whether this failure is a credential rejection.
    #[must_use]
    pub fn is_bad_credentials(&self) -> bool {
        self.message == BAD_CREDENTIALS_MESSAGE
    }
}

impl From<Error> for Failure {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidCredentials => Self::bad_credentials(),
            Error::Http(ref err) => {
                tracing::error!(error = %err, url = ?err.url().map(url::Url::as_str), "Request did not complete");
                Self::generic()
            }
            Error::Status {
                operation,
                status,
                ref body,
            } => {
                tracing::error!(operation, status, body = %body, "API returned an error status");
                Self::generic()
            }
            Error::NoSession => {
                tracing::warn!("User-scoped request attempted without a session");
                Self::generic()
            }
            Error::Store(_) | Error::Config(_) => {
                tracing::error!(error = %e, "Client internal error");
                Self::generic()
            }
        }
    }
}

#[derive(Deserialize)]
struct AuthFailureBody {
    user: Option<serde_json::Value>,
}

/// Whether an error response body carries the authentication-failure marker.
///
/// The login endpoint answers bad credentials with `{"message": ..., "user": false}`.
pub(crate) fn is_auth_failure(body: &str) -> bool {
    serde_json::from_str::<AuthFailureBody>(body)
        .ok()
        .and_then(|b| b.user)
        .is_some_and(|user| user == serde_json::Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_is_generic() {
        let failure = Failure::from(Error::Status {
            operation: "get movies",
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(failure.message(), GENERIC_MESSAGE);
        assert!(!failure.is_bad_credentials());
    }

    #[test]
    fn invalid_credentials_is_specific() {
        let failure = Failure::from(Error::InvalidCredentials);
        assert_eq!(failure.message(), BAD_CREDENTIALS_MESSAGE);
        assert!(failure.is_bad_credentials());
        assert_ne!(failure, Failure::generic());
    }

    #[test]
    fn missing_session_is_generic() {
        assert_eq!(Failure::from(Error::NoSession), Failure::generic());
    }

    #[test]
    fn failure_displays_only_the_message() {
        assert_eq!(Failure::generic().to_string(), GENERIC_MESSAGE);
    }

    #[test]
    fn auth_failure_marker() {
        assert!(is_auth_failure(
            r#"{"message":"Incorrect username or password.","user":false}"#
        ));
        assert!(!is_auth_failure(r#"{"user":{"Username":"alice"}}"#));
        assert!(!is_auth_failure(r#"{"message":"nope"}"#));
        assert!(!is_auth_failure("Unauthorized"));
        assert!(!is_auth_failure("[]"));
    }
}
