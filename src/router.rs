//! Route table and auth guard.
//!
//! Paths map one-to-one to pages; the OAuth redirect target is a single
//! canonical path that must match what is registered with the identity
//! provider. The guard never flashes protected content: while session
//! status is unresolved it asks the host to render a neutral loading state.

use crate::auth::IdentityClient;

/// The one OAuth redirect target registered with the provider.
pub const AUTH_CALLBACK_PATH: &str = "/auth/callback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    Company,
    Services,
    Vacancy,
    Promotion,
    AuthCallback,
}

impl Route {
    pub fn as_path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Company => "/company",
            Route::Services => "/services",
            Route::Vacancy => "/vacancy",
            Route::Promotion => "/promotion",
            Route::AuthCallback => AUTH_CALLBACK_PATH,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        match path.trim_end_matches('/') {
            "" => Some(Route::Home),
            "/login" => Some(Route::Login),
            "/signup" => Some(Route::Signup),
            "/company" => Some(Route::Company),
            "/services" => Some(Route::Services),
            "/vacancy" => Some(Route::Vacancy),
            "/promotion" => Some(Route::Promotion),
            "/auth/callback" => Some(Route::AuthCallback),
            _ => None,
        }
    }

    /// Pages that require a signed-in user. The promotion page writes
    /// records on the user's behalf; everything else reads publicly.
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Promotion)
    }
}

/// Session knowledge at the moment of routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// First paint, before the stored session has been resolved.
    Unknown,
    Authenticated,
    Unauthenticated,
}

impl SessionStatus {
    /// Resolve from the identity client's cache. The cache is populated at
    /// construction, so this is `Unknown` only for hosts that route before
    /// building the client.
    pub fn of(identity: &IdentityClient) -> Self {
        if identity.current_session().is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }
}

/// What the host should render for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    /// Session status unresolved; render a neutral loading state, neither
    /// the protected page nor a premature redirect.
    Loading,
    RedirectToLogin,
}

/// Decide whether `route` may render for the given session status.
pub fn resolve(route: Route, status: SessionStatus) -> RouteDecision {
    if !route.requires_auth() {
        return RouteDecision::Render;
    }
    match status {
        SessionStatus::Unknown => RouteDecision::Loading,
        SessionStatus::Authenticated => RouteDecision::Render,
        SessionStatus::Unauthenticated => RouteDecision::RedirectToLogin,
    }
}
