//! OAuth callback handling.
//!
//! The provider redirects back to the canonical callback route with a
//! one-time authorization code. The handler exchanges it (plus the stored
//! PKCE verifier) for a session exactly once, then reports where to
//! navigate. Codes are single-use server-side, so a second mount of the
//! same redirect must not re-submit - the handler de-duplicates with a
//! state guard local to the instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::router::Route;
use crate::store::{CODE_VERIFIER_KEY, RETURN_TO_KEY};

use super::{AuthError, IdentityClient};

/// Client-side bound on the exchange call, distinct from a provider
/// rejection (10 seconds).
const EXCHANGE_TIMEOUT_SECS: u64 = 10;

/// Handler lifecycle. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState {
    Idle,
    Exchanging,
    Succeeded,
    Failed,
}

/// Query parameters delivered to the callback route.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse from the redirect URL's query string.
    ///
    /// Only the code+verifier flow is supported; token fragments from the
    /// legacy implicit flow are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "error_description" => params.error_description = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// Where the host should send the user once the callback resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Exchange succeeded; navigate to the post-login destination.
    Success { destination: Route },
    /// Exchange failed; navigate to login with a human-readable reason.
    Failure { reason: String },
    /// A previous run already consumed this redirect; do nothing.
    AlreadyHandled,
    /// The user navigated away mid-exchange; the late result was discarded.
    Abandoned,
}

pub struct CallbackHandler {
    client: Arc<IdentityClient>,
    state: Mutex<CallbackState>,
    abandoned: AtomicBool,
}

impl CallbackHandler {
    pub fn new(client: Arc<IdentityClient>) -> Self {
        Self {
            client,
            state: Mutex::new(CallbackState::Idle),
            abandoned: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CallbackState {
        *self.state.lock().expect("callback state poisoned")
    }

    /// Abandon the in-flight exchange: a completion arriving after this is
    /// discarded instead of producing stale navigation.
    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }

    /// Run the callback once.
    ///
    /// Safe to call again from a re-mounted route: any run after the first
    /// observes a non-idle state and returns [`CallbackOutcome::AlreadyHandled`]
    /// without touching the exchange endpoint.
    pub async fn handle(&self, params: &CallbackParams) -> CallbackOutcome {
        {
            let mut state = self.state.lock().expect("callback state poisoned");
            if *state != CallbackState::Idle {
                debug!(state = ?*state, "Callback re-entered, ignoring");
                return CallbackOutcome::AlreadyHandled;
            }
            *state = CallbackState::Exchanging;
        }

        if let Some(reason) = &params.error_description {
            return self.fail(format!("Provider returned an error: {}", reason));
        }
        let code = match &params.code {
            Some(code) => code.clone(),
            None => return self.fail("Redirect did not include an authorization code".to_string()),
        };

        let exchange = self.client.complete_oauth_exchange(&code);
        let result =
            tokio::time::timeout(Duration::from_secs(EXCHANGE_TIMEOUT_SECS), exchange).await;

        if self.abandoned.load(Ordering::SeqCst) {
            debug!("Callback abandoned before completion, discarding result");
            self.set_state(CallbackState::Failed);
            self.client.store().remove(CODE_VERIFIER_KEY);
            return CallbackOutcome::Abandoned;
        }

        match result {
            Err(_elapsed) => self.fail(AuthError::NetworkTimeout.to_string()),
            Ok(Err(e)) => self.fail(e.to_string()),
            Ok(Ok(_session)) => {
                self.set_state(CallbackState::Succeeded);
                let destination = self
                    .client
                    .store()
                    .get(RETURN_TO_KEY)
                    .and_then(|path| Route::from_path(&path))
                    .unwrap_or(Route::Home);
                self.client.store().remove(RETURN_TO_KEY);
                CallbackOutcome::Success { destination }
            }
        }
    }

    fn fail(&self, reason: String) -> CallbackOutcome {
        warn!(reason = %reason, "OAuth callback failed");
        self.set_state(CallbackState::Failed);
        // A lingering verifier is useless after a failed redirect and must
        // not leak into the next attempt.
        self.client.store().remove(CODE_VERIFIER_KEY);
        CallbackOutcome::Failure { reason }
    }

    fn set_state(&self, state: CallbackState) {
        *self.state.lock().expect("callback state poisoned") = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::backend::mock::MockAuthBackend;
    use crate::auth::{AuthBackend, OAuthOptions, Provider};
    use crate::config::Config;
    use crate::store::MemoryStore;

    fn setup() -> (Arc<IdentityClient>, Arc<MockAuthBackend>) {
        let backend = Arc::new(MockAuthBackend::new());
        let client = Arc::new(IdentityClient::with_backend(
            Config::new("https://backend.test", "anon-key"),
            Arc::clone(&backend) as Arc<dyn AuthBackend>,
            Arc::new(MemoryStore::new()),
        ));
        (client, backend)
    }

    fn begin_flow(client: &IdentityClient, backend: &MockAuthBackend) -> String {
        client
            .begin_oauth_sign_in(
                Provider::Google,
                "https://site.test/auth/callback",
                &OAuthOptions::default(),
            )
            .expect("authorize url");
        let verifier = client.store().get(CODE_VERIFIER_KEY).expect("verifier stored");
        backend.issue_code_for(&verifier)
    }

    #[test]
    fn test_params_parse_code_from_query() {
        let params = CallbackParams::from_query("code=abc123&state=xyz");
        assert_eq!(params.code.as_deref(), Some("abc123"));
        assert!(params.error_description.is_none());

        let params = CallbackParams::from_query("error=access_denied&error_description=denied");
        assert!(params.code.is_none());
        assert_eq!(params.error_description.as_deref(), Some("denied"));
    }

    #[tokio::test]
    async fn test_successful_callback_navigates_home() {
        let (client, backend) = setup();
        let code = begin_flow(&client, &backend);
        let handler = CallbackHandler::new(Arc::clone(&client));

        let outcome = handler
            .handle(&CallbackParams {
                code: Some(code),
                error_description: None,
            })
            .await;

        assert_eq!(
            outcome,
            CallbackOutcome::Success {
                destination: Route::Home
            }
        );
        assert_eq!(handler.state(), CallbackState::Succeeded);
        assert!(client.current_session().is_some());
    }

    #[tokio::test]
    async fn test_successful_callback_honors_return_to() {
        let (client, backend) = setup();
        client
            .begin_oauth_sign_in(
                Provider::Google,
                "https://site.test/auth/callback",
                &OAuthOptions {
                    return_to: Some("/vacancy".to_string()),
                    extra_params: Vec::new(),
                },
            )
            .expect("authorize url");
        let verifier = client.store().get(CODE_VERIFIER_KEY).expect("verifier stored");
        let code = backend.issue_code_for(&verifier);

        let handler = CallbackHandler::new(Arc::clone(&client));
        let outcome = handler
            .handle(&CallbackParams {
                code: Some(code),
                error_description: None,
            })
            .await;

        assert_eq!(
            outcome,
            CallbackOutcome::Success {
                destination: Route::Vacancy
            }
        );
        // Consumed on use, so the next login doesn't replay it.
        assert!(client.store().get(RETURN_TO_KEY).is_none());
    }

    #[tokio::test]
    async fn test_missing_verifier_fails_with_verifier_reason() {
        let (client, backend) = setup();
        // A code exists but this storage scope never saw the verifier write.
        let code = backend.issue_code_for("verifier-from-elsewhere");

        let handler = CallbackHandler::new(Arc::clone(&client));
        let outcome = handler
            .handle(&CallbackParams {
                code: Some(code),
                error_description: None,
            })
            .await;

        match outcome {
            CallbackOutcome::Failure { reason } => assert!(reason.contains("verifier")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(handler.state(), CallbackState::Failed);
        assert!(client.current_session().is_none());
    }

    #[tokio::test]
    async fn test_missing_code_fails_and_clears_lingering_verifier() {
        let (client, backend) = setup();
        begin_flow(&client, &backend);
        assert!(client.store().get(CODE_VERIFIER_KEY).is_some());

        let handler = CallbackHandler::new(Arc::clone(&client));
        let outcome = handler.handle(&CallbackParams::default()).await;

        assert!(matches!(outcome, CallbackOutcome::Failure { .. }));
        assert!(client.store().get(CODE_VERIFIER_KEY).is_none());
    }

    #[tokio::test]
    async fn test_double_mount_issues_exactly_one_exchange() {
        let (client, backend) = setup();
        let code = begin_flow(&client, &backend);
        let handler = CallbackHandler::new(Arc::clone(&client));
        let params = CallbackParams {
            code: Some(code),
            error_description: None,
        };

        let (first, second) = tokio::join!(handler.handle(&params), handler.handle(&params));

        let outcomes = [first, second];
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, CallbackOutcome::Success { .. })));
        assert!(outcomes
            .iter()
            .any(|o| *o == CallbackOutcome::AlreadyHandled));
        assert_eq!(backend.exchange_call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_exchange_surfaces_timeout() {
        let (client, backend) = setup();
        let code = begin_flow(&client, &backend);
        *backend.exchange_delay.lock().unwrap() = Some(Duration::from_secs(60));

        let handler = CallbackHandler::new(Arc::clone(&client));
        let outcome = handler
            .handle(&CallbackParams {
                code: Some(code),
                error_description: None,
            })
            .await;

        match outcome {
            CallbackOutcome::Failure { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_abandoned_exchange_discards_late_result() {
        let (client, backend) = setup();
        let code = begin_flow(&client, &backend);

        let handler = CallbackHandler::new(Arc::clone(&client));
        handler.abandon();

        let outcome = handler
            .handle(&CallbackParams {
                code: Some(code),
                error_description: None,
            })
            .await;
        assert_eq!(outcome, CallbackOutcome::Abandoned);
    }
}
