//! The identity client: single configured entry point to the hosted auth
//! service. Every other component interacts with auth only through it.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::store::{self, SessionStore, CODE_VERIFIER_KEY, RETURN_TO_KEY, SESSION_KEY};

use super::events::{AuthEvent, AuthEventKind, Subscribers, Subscription};
use super::rest::RestAuthBackend;
use super::{pkce, AuthBackend, AuthError, Provider, Session};

/// Username rules from the signup form: 3-20 characters, letters, digits,
/// underscores.
fn valid_username(username: &str) -> bool {
    (3..=20).contains(&username.len())
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Minimum password length accepted by the signup form.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Options for starting an OAuth sign-in.
#[derive(Debug, Clone, Default)]
pub struct OAuthOptions {
    /// Path to return to after the callback completes. Defaults to home.
    pub return_to: Option<String>,
    /// Extra query parameters forwarded to the provider, e.g.
    /// `prompt=select_account`.
    pub extra_params: Vec<(String, String)>,
}

/// Client for the hosted identity service.
///
/// Explicitly constructed and passed to the components that need it; there
/// is no global instance. The session store scope is fixed at construction
/// and shared by every flow, so a verifier written before a redirect is
/// always read back from the same place after it.
pub struct IdentityClient {
    config: Config,
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    session: Mutex<Option<Session>>,
    subscribers: Arc<Subscribers>,
}

impl IdentityClient {
    /// Build a client against the real REST backend.
    pub fn new(config: Config) -> Result<Self, AuthError> {
        let backend = Arc::new(RestAuthBackend::new(&config)?);
        let store = store::for_scope(config.session_scope, config.store_dir.clone());
        Ok(Self::with_backend(config, backend, store))
    }

    /// Constructor injection for custom transports and test doubles.
    pub fn with_backend(
        config: Config,
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let session = Session::restore(store.as_ref());
        if session.is_some() {
            debug!("Restored persisted session");
        }
        Self {
            config,
            backend,
            store,
            session: Mutex::new(session),
            subscribers: Subscribers::new(),
        }
    }

    /// The locally cached session, if any.
    ///
    /// Does not guarantee freshness against the server: absence means
    /// unauthenticated, presence means probably authenticated.
    pub fn current_session(&self) -> Option<Session> {
        self.session.lock().expect("session cache poisoned").clone()
    }

    /// Register a listener for session transitions.
    ///
    /// Fires a synthetic initial event to the new listener reflecting
    /// current state, then delivers every transition in registration order.
    /// Delivery is at least once; listeners must tolerate duplicates.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let listener: Arc<dyn Fn(&AuthEvent) + Send + Sync> = Arc::new(listener);
        let subscription = self.subscribers.add(Arc::clone(&listener));
        listener(&AuthEvent {
            kind: AuthEventKind::InitialSession,
            session: self.current_session(),
        });
        subscription
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = self.backend.password_grant(email, password).await?;
        info!(provider = "email", "Sign-in succeeded");
        self.install_session(session.clone(), AuthEventKind::SignedIn);
        Ok(session)
    }

    /// Create an account.
    ///
    /// Returns `None` when the backend sent a confirmation email instead of
    /// a session. Rejects malformed usernames and duplicates up front, the
    /// same checks the signup page ran.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Option<Session>, AuthError> {
        if !valid_username(username) {
            return Err(AuthError::InvalidSignup(
                "Username must be 3-20 characters: letters, digits, underscores".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::InvalidSignup(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if self.backend.username_exists(username).await? {
            return Err(AuthError::UsernameTaken);
        }

        let session = self.backend.sign_up(email, password, username).await?;
        if let Some(session) = &session {
            self.install_session(session.clone(), AuthEventKind::SignedIn);
        }
        Ok(session)
    }

    /// Start an OAuth sign-in: generate and store a PKCE verifier, then
    /// return the URL the browser must navigate to.
    ///
    /// The verifier write completes before this returns - it has to survive
    /// the full-page redirect that follows.
    pub fn begin_oauth_sign_in(
        &self,
        provider: Provider,
        redirect_to: &str,
        options: &OAuthOptions,
    ) -> Result<Url, AuthError> {
        let verifier = pkce::generate_code_verifier();
        let challenge = pkce::code_challenge(&verifier);
        self.store.set(CODE_VERIFIER_KEY, &verifier);
        match &options.return_to {
            Some(path) => self.store.set(RETURN_TO_KEY, path),
            None => self.store.remove(RETURN_TO_KEY),
        }

        let mut url = Url::parse(&format!("{}/auth/v1/authorize", self.config.backend_url))
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("provider", provider.as_str())
                .append_pair("redirect_to", redirect_to)
                .append_pair("code_challenge", &challenge)
                .append_pair("code_challenge_method", "s256");
            for (key, value) in &options.extra_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Complete an OAuth sign-in with the one-time code from the redirect.
    ///
    /// The stored verifier is consumed exactly once: it is cleared whether
    /// the exchange succeeds or fails.
    pub async fn complete_oauth_exchange(&self, code: &str) -> Result<Session, AuthError> {
        let verifier = match self.store.get(CODE_VERIFIER_KEY) {
            Some(verifier) => verifier,
            None => {
                warn!("No code verifier in the session store; was it written to another scope?");
                return Err(AuthError::MissingVerifier);
            }
        };

        let result = self.backend.exchange_code(code, &verifier).await;
        self.store.remove(CODE_VERIFIER_KEY);

        let session = result?;
        info!("OAuth code exchange succeeded");
        self.install_session(session.clone(), AuthEventKind::SignedIn);
        Ok(session)
    }

    /// Sign out: revoke server-side, then clear local state.
    ///
    /// Local state is cleared even if the revoke call fails - a session the
    /// server may already have dropped must not linger locally.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.session.lock().expect("session cache poisoned").take();
        self.store.remove(SESSION_KEY);

        let result = match &session {
            Some(session) => self.backend.revoke(&session.access_token).await,
            None => Ok(()),
        };

        if session.is_some() {
            self.subscribers.emit(&AuthEvent {
                kind: AuthEventKind::SignedOut,
                session: None,
            });
        }
        if let Err(e) = &result {
            warn!(error = %e, "Server-side revoke failed; local session cleared anyway");
        }
        result
    }

    /// Re-resolve session state from the store.
    ///
    /// Best-effort cross-tab consistency: another tab signing in or out
    /// writes the store, and a storage-change notification should land
    /// here. Latest stored state wins.
    pub fn refresh_from_store(&self) {
        let stored = Session::restore(self.store.as_ref());
        let mut cached = self.session.lock().expect("session cache poisoned");
        if *cached == stored {
            return;
        }

        let kind = match (&*cached, &stored) {
            (Some(old), Some(new)) if old.user.id == new.user.id => AuthEventKind::TokenRefreshed,
            (_, Some(_)) => AuthEventKind::SignedIn,
            (_, None) => AuthEventKind::SignedOut,
        };
        *cached = stored.clone();
        drop(cached);

        self.subscribers.emit(&AuthEvent {
            kind,
            session: stored,
        });
    }

    /// Handle to the session store, for flows that share its scope.
    pub(crate) fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    fn install_session(&self, session: Session, kind: AuthEventKind) {
        session.persist(self.store.as_ref());
        *self.session.lock().expect("session cache poisoned") = Some(session.clone());
        self.subscribers.emit(&AuthEvent {
            kind,
            session: Some(session),
        });
    }
}
