//! Trait seam between the identity client and the hosted auth service.
//!
//! The client is constructed with an injected backend rather than a global
//! SDK handle, so tests run against an in-memory double and hosts can wrap
//! the transport if they need to.

use async_trait::async_trait;

use super::{AuthError, Session};

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Password grant: email + password for a session.
    async fn password_grant(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Create an account. Returns `None` when the backend defers the session
    /// to email confirmation.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Option<Session>, AuthError>;

    /// Case-insensitive lookup against the profiles table, used to reject
    /// duplicate usernames before attempting signup.
    async fn username_exists(&self, username: &str) -> Result<bool, AuthError>;

    /// PKCE exchange: one-time authorization code + stored verifier for a
    /// session. Codes are single-use server-side.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Session, AuthError>;

    /// Invalidate the session server-side.
    async fn revoke(&self, access_token: &str) -> Result<(), AuthError>;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::auth::pkce;
    use crate::auth::session::test_fixtures::session_for;
    use crate::auth::{AuthError, Provider, Session};

    use super::AuthBackend;

    /// In-memory stand-in for the hosted auth service.
    ///
    /// Implements the behaviors the real service guarantees and the tests
    /// depend on: credential checking, single-use authorization codes, and
    /// S256 verifier validation.
    #[derive(Default)]
    pub struct MockAuthBackend {
        /// email -> (password, username)
        accounts: Mutex<HashMap<String, (String, String)>>,
        /// code -> expected S256 challenge
        codes: Mutex<HashMap<String, String>>,
        pub exchange_calls: AtomicUsize,
        /// Artificial latency for the exchange call, for timeout tests.
        pub exchange_delay: Mutex<Option<Duration>>,
        /// Tokens revoked through `revoke`.
        pub revoked: Mutex<Vec<String>>,
    }

    impl MockAuthBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_account(self, email: &str, password: &str, username: &str) -> Self {
            self.accounts.lock().unwrap().insert(
                email.to_string(),
                (password.to_string(), username.to_string()),
            );
            self
        }

        /// Simulate the provider redirect: bind a fresh one-time code to the
        /// challenge derived from `verifier`.
        pub fn issue_code_for(&self, verifier: &str) -> String {
            let code = format!("code-{}", self.codes.lock().unwrap().len());
            self.codes
                .lock()
                .unwrap()
                .insert(code.clone(), pkce::code_challenge(verifier));
            code
        }

        pub fn exchange_call_count(&self) -> usize {
            self.exchange_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthBackend for MockAuthBackend {
        async fn password_grant(&self, email: &str, password: &str) -> Result<Session, AuthError> {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some((stored, _)) if stored == password => {
                    Ok(session_for(email, Provider::Email))
                }
                _ => Err(AuthError::InvalidCredentials),
            }
        }

        async fn sign_up(
            &self,
            email: &str,
            password: &str,
            username: &str,
        ) -> Result<Option<Session>, AuthError> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(AuthError::EmailTaken);
            }
            accounts.insert(
                email.to_string(),
                (password.to_string(), username.to_string()),
            );
            // Mirror a confirm-email deployment: no session until confirmed.
            Ok(None)
        }

        async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
            let target = username.to_lowercase();
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .values()
                .any(|(_, existing)| existing.to_lowercase() == target))
        }

        async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Session, AuthError> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);

            let delay = *self.exchange_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            // Codes are single-use: consumed on first attempt, valid or not.
            let expected = self.codes.lock().unwrap().remove(code);
            match expected {
                Some(challenge) if challenge == pkce::code_challenge(verifier) => {
                    Ok(session_for("oauth-user@example.com", Provider::Google))
                }
                Some(_) => Err(AuthError::ExchangeFailed(
                    "code_verifier does not match the challenge".to_string(),
                )),
                None => Err(AuthError::ExchangeFailed(
                    "authorization code is invalid or already used".to_string(),
                )),
            }
        }

        async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
            self.revoked.lock().unwrap().push(access_token.to_string());
            Ok(())
        }
    }
}
