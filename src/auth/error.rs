use thiserror::Error;

/// Errors surfaced by the identity client and the callback handler.
///
/// Every variant is recoverable by retrying or by returning the user to the
/// login route; callers turn these into inline messages, never panics.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No code verifier found in this storage scope - restart the sign-in")]
    MissingVerifier,

    #[error("Code exchange rejected by the provider: {0}")]
    ExchangeFailed(String),

    #[error("Authentication request timed out")]
    NetworkTimeout,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Username already taken")]
    UsernameTaken,

    #[error("{0}")]
    InvalidSignup(String),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid response from auth service: {0}")]
    InvalidResponse(String),
}

/// Maximum length of a provider error body carried in an error message.
const MAX_ERROR_BODY_LENGTH: usize = 300;

impl AuthError {
    /// Truncate a response body so provider errors stay log-friendly.
    /// The cut backs up to a character boundary so multi-byte text from the
    /// provider cannot panic the slice.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }

    /// Map a non-success token-endpoint response to an error.
    ///
    /// GoTrue reports bad password logins as 400 with an
    /// `invalid_grant`/"Invalid login credentials" body.
    pub fn from_token_response(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 | 401 if body.contains("invalid_grant") || body.contains("Invalid login") => {
                AuthError::InvalidCredentials
            }
            _ => AuthError::ExchangeFailed(Self::truncate_body(body)),
        }
    }
}
